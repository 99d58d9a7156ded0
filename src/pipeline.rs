//! Sheet Pipeline Module
//!
//! シート単位の変換を順序付けるオーケストレーター。
//! メタデータ抽出、ヘッダー行の特定、行の分類、ロング形式への展開、
//! メタデータの付与を順に行い、スキップ条件を判定します。
//!
//! シートの状態遷移:
//!
//! ```text
//! Start → MetadataRead → HeaderLocated → BodyClassified → Melted → MetadataAttached → Done
//!   └──────────────┴──────────────┴──────────────┴───────────┴──→ Skipped
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::builder::PipelineConfig;
use crate::grid::SheetGrid;
use crate::source::WorkbookSource;
use crate::transform::classify::{
    apply_bold_policy, assign_sub_headers, build_raw_rows, duplicate_names, is_blank_header,
    value_columns,
};
use crate::transform::melt::{drop_blank_amounts, melt, period_columns};
use crate::transform::{detect_bold_rows, extract_metadata};
use crate::types::LongRecord;

/// 識別列（A列）のインデックス
const IDENTIFYING_COLUMN: u32 = 0;

/// シート処理の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetState {
    Start,
    MetadataRead,
    HeaderLocated,
    BodyClassified,
    Melted,
    MetadataAttached,
    Done,
    /// 終端状態（どの状態からも遷移可能）
    Skipped,
}

impl fmt::Display for SheetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SheetState::Start => "start",
            SheetState::MetadataRead => "metadata_read",
            SheetState::HeaderLocated => "header_located",
            SheetState::BodyClassified => "body_classified",
            SheetState::Melted => "melted",
            SheetState::MetadataAttached => "metadata_attached",
            SheetState::Done => "done",
            SheetState::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// シートをスキップした理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// ヘッダー行に届くだけの行数がない
    NotEnoughRows { rows: usize, required: usize },
    /// ヘッダー行がすべて空白
    BlankHeader,
    /// ヘッダー行より下に値を持つ行がない
    EmptyBody,
    /// 展開対象の列がない
    NoPeriodColumns,
    /// 展開後、金額を持つレコードが残らなかった
    EmptyMelt,
    /// シートの読み取りに失敗した
    ReadFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotEnoughRows { rows, required } => write!(
                f,
                "not enough rows to reach a header ({} rows, {} required)",
                rows, required
            ),
            SkipReason::BlankHeader => f.write_str("header row is blank"),
            SkipReason::EmptyBody => f.write_str("no data rows below the header"),
            SkipReason::NoPeriodColumns => f.write_str("no period columns to melt"),
            SkipReason::EmptyMelt => f.write_str("no non-blank amounts after melting"),
            SkipReason::ReadFailed(message) => write!(f, "failed to read sheet: {}", message),
        }
    }
}

/// シート1枚分の処理結果
#[derive(Debug, Clone)]
pub enum SheetOutcome {
    /// 正常に処理され、レコードを出力した
    Done {
        sheet: String,
        records: Vec<LongRecord>,
    },
    /// スキップされた（`reached`はスキップ直前に到達していた状態）
    Skipped {
        sheet: String,
        reached: SheetState,
        reason: SkipReason,
    },
}

impl SheetOutcome {
    pub fn sheet(&self) -> &str {
        match self {
            SheetOutcome::Done { sheet, .. } | SheetOutcome::Skipped { sheet, .. } => sheet,
        }
    }

    /// 到達した状態（スキップの場合はスキップ直前の状態）
    pub fn state(&self) -> SheetState {
        match self {
            SheetOutcome::Done { .. } => SheetState::Done,
            SheetOutcome::Skipped { reached, .. } => *reached,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SheetOutcome::Skipped { .. })
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            SheetOutcome::Skipped { reason, .. } => Some(reason),
            SheetOutcome::Done { .. } => None,
        }
    }

    pub fn records(&self) -> &[LongRecord] {
        match self {
            SheetOutcome::Done { records, .. } => records,
            SheetOutcome::Skipped { .. } => &[],
        }
    }
}

/// ワークブック1冊分の処理結果
#[derive(Debug, Clone)]
pub struct WorkbookReport {
    pub workbook: String,
    /// 選択されたシートの処理結果（ワークブック内の順序）
    pub sheets: Vec<SheetOutcome>,
}

impl WorkbookReport {
    /// 正常に処理されたシート数
    pub fn sheets_done(&self) -> usize {
        self.sheets.iter().filter(|s| !s.is_skipped()).count()
    }

    /// スキップされたシート数
    pub fn sheets_skipped(&self) -> usize {
        self.sheets.iter().filter(|s| s.is_skipped()).count()
    }

    /// 全シートのレコード数
    pub fn record_count(&self) -> usize {
        self.sheets.iter().map(|s| s.records().len()).sum()
    }

    /// 全シートのレコード（シート順）
    pub fn records(&self) -> impl Iterator<Item = &LongRecord> {
        self.sheets.iter().flat_map(|s| s.records())
    }
}

/// 読み取り済みのシート
///
/// ワークブックから逐次読み取った後は、シート同士は独立して処理できます。
#[derive(Debug, Clone)]
pub(crate) struct SheetInput {
    pub name: String,
    pub grid: SheetGrid,
    pub bold_rows: BTreeSet<u32>,
}

/// 状態遷移を追跡するシート処理
struct SheetRun<'a> {
    sheet: &'a str,
    state: SheetState,
}

impl<'a> SheetRun<'a> {
    fn new(sheet: &'a str) -> Self {
        Self {
            sheet,
            state: SheetState::Start,
        }
    }

    fn advance(&mut self, next: SheetState) {
        trace!(sheet = self.sheet, from = %self.state, to = %next, "sheet state transition");
        self.state = next;
    }

    fn skip(self, reason: SkipReason) -> SheetOutcome {
        warn!(sheet = self.sheet, state = %self.state, reason = %reason, "skipping sheet");
        SheetOutcome::Skipped {
            sheet: self.sheet.to_string(),
            reached: self.state,
            reason,
        }
    }
}

/// シート1枚をロング形式レコードに変換
pub(crate) fn process_sheet(
    input: &SheetInput,
    workbook_name: &str,
    config: &PipelineConfig,
) -> SheetOutcome {
    let mut run = SheetRun::new(&input.name);
    let grid = &input.grid;

    let metadata = extract_metadata(grid, &input.name, workbook_name, &config.metadata);
    run.advance(SheetState::MetadataRead);

    let header_index = config.header_skip;
    let Some(header) = grid.row(header_index) else {
        return run.skip(SkipReason::NotEnoughRows {
            rows: grid.row_count(),
            required: header_index + 1,
        });
    };
    if is_blank_header(header) {
        return run.skip(SkipReason::BlankHeader);
    }
    run.advance(SheetState::HeaderLocated);

    let body = grid.rows_from(header_index + 1);
    if body.iter().all(|row| row.iter().all(|cell| cell.is_blank())) {
        return run.skip(SkipReason::EmptyBody);
    }

    let columns = value_columns(header, body);
    for name in duplicate_names(&columns) {
        warn!(sheet = %input.name, column = name, "duplicate column header; melting each occurrence under the same label");
    }

    // ヘッダー行は header_skip + 1 行目、本体は header_skip + 2 行目から
    let first_row_number = header_index as u32 + 2;
    let raw_rows = build_raw_rows(body, &columns, first_row_number, &input.bold_rows);
    let classified = apply_bold_policy(
        assign_sub_headers(raw_rows, config.sub_header_direction),
        config.bold_rows,
    );
    run.advance(SheetState::BodyClassified);

    let periods = period_columns(&columns, config.period_columns);
    if periods.is_empty() {
        return run.skip(SkipReason::NoPeriodColumns);
    }
    let melted = drop_blank_amounts(melt(&classified, &periods));
    if melted.is_empty() {
        return run.skip(SkipReason::EmptyMelt);
    }
    run.advance(SheetState::Melted);

    let metadata = Arc::new(metadata);
    let records: Vec<LongRecord> = melted
        .into_iter()
        .map(|record| record.with_metadata(&metadata))
        .collect();
    run.advance(SheetState::MetadataAttached);

    debug!(sheet = %input.name, records = records.len(), "sheet processed");
    run.advance(SheetState::Done);
    SheetOutcome::Done {
        sheet: input.name.clone(),
        records,
    }
}

/// シートのグリッドと識別列の太字行を読み取る
fn read_sheet<S: WorkbookSource + ?Sized>(
    source: &mut S,
    sheet: &str,
) -> Result<SheetInput, crate::error::XlsxMeltError> {
    let grid = source.read_grid(sheet)?;
    let fonts = source.column_fonts(sheet, IDENTIFYING_COLUMN)?;
    let bold_rows = detect_bold_rows(&fonts);
    debug!(sheet, bold_rows = ?bold_rows, "detected bold rows");
    Ok(SheetInput {
        name: sheet.to_string(),
        grid,
        bold_rows,
    })
}

/// ワークブックの選択されたシートをすべて処理
///
/// シートは逐次読み取り、変換は設定に応じて並列に行います。
/// 結果は常にワークブック内のシート順に並びます。
pub(crate) fn process_workbook<S: WorkbookSource + ?Sized>(
    source: &mut S,
    config: &PipelineConfig,
) -> WorkbookReport {
    let workbook = source.workbook_name().to_string();
    let selected: Vec<String> = source
        .sheet_names()
        .into_iter()
        .enumerate()
        .filter(|(index, name)| config.sheet_selector.matches(*index, name))
        .map(|(_, name)| name)
        .collect();
    info!(workbook = %workbook, sheets = selected.len(), "processing workbook");

    let inputs: Vec<Result<SheetInput, (String, String)>> = selected
        .into_iter()
        .map(|sheet| read_sheet(source, &sheet).map_err(|e| (sheet, e.to_string())))
        .collect();

    let process = |input: &Result<SheetInput, (String, String)>| match input {
        Ok(input) => process_sheet(input, &workbook, config),
        Err((sheet, message)) => {
            SheetRun::new(sheet).skip(SkipReason::ReadFailed(message.clone()))
        }
    };

    let sheets: Vec<SheetOutcome> = if config.parallel {
        inputs.par_iter().map(process).collect()
    } else {
        inputs.iter().map(process).collect()
    };

    let report = WorkbookReport { workbook, sheets };
    info!(
        workbook = %report.workbook,
        done = report.sheets_done(),
        skipped = report.sheets_skipped(),
        records = report.record_count(),
        "workbook processed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BoldRowPolicy, PeriodColumnPolicy, SheetSelector, SubHeaderDirection};
    use crate::source::MemoryWorkbook;
    use crate::types::CellValue;

    fn config() -> PipelineConfig {
        PipelineConfig {
            header_skip: 2,
            ..PipelineConfig::default()
        }
    }

    fn input(rows: Vec<Vec<CellValue>>, bold_rows: &[u32]) -> SheetInput {
        SheetInput {
            name: "P&L".to_string(),
            grid: SheetGrid::from_rows(rows),
            bold_rows: bold_rows.iter().copied().collect(),
        }
    }

    fn statement() -> Vec<Vec<CellValue>> {
        vec![
            vec!["Contoso".into()],
            vec!["Retail".into()],
            vec!["Metric".into(), "Q1 FY23".into(), "FY23".into(), "Notes".into()],
            vec!["Product A".into(), 100.0.into(), 400.0.into(), CellValue::Empty],
            vec!["Product B".into(), 50.0.into(), CellValue::Empty, "est.".into()],
            vec!["Revenue".into(), 150.0.into(), 400.0.into(), CellValue::Empty],
        ]
    }

    #[test]
    fn test_process_sheet_done() {
        let outcome = process_sheet(&input(statement(), &[6]), "fy23.xlsx", &config());

        assert_eq!(outcome.state(), SheetState::Done);
        let records = outcome.records();
        assert_eq!(records.len(), 6);

        let first = &records[0];
        assert_eq!(first.financial_metric, "Product A");
        assert_eq!(first.sub_header.as_deref(), Some("Revenue"));
        assert_eq!(first.quarter.as_deref(), Some("Q1"));
        assert_eq!(first.fiscal_year.as_deref(), Some("2023"));
        assert_eq!(first.metadata.workbook_name().as_deref(), Some("fy23.xlsx"));
        assert_eq!(first.metadata.get("Meta 1"), Some(&CellValue::from("Contoso")));

        // 期間として解釈できない列は四半期・年度なしで展開される
        let note = records
            .iter()
            .find(|r| r.period_label == "Notes")
            .unwrap();
        assert_eq!(note.financial_amount, CellValue::from("est."));
        assert_eq!(note.quarter, None);
        assert_eq!(note.fiscal_year, None);
    }

    #[test]
    fn test_period_drop_and_bold_drop_policies() {
        let config = PipelineConfig {
            bold_rows: BoldRowPolicy::Drop,
            period_columns: PeriodColumnPolicy::Drop,
            ..config()
        };
        let outcome = process_sheet(&input(statement(), &[6]), "fy23.xlsx", &config);
        let metrics: Vec<(&str, &str)> = outcome
            .records()
            .iter()
            .map(|r| (r.financial_metric.as_str(), r.period_label.as_str()))
            .collect();
        assert_eq!(
            metrics,
            vec![("Product A", "Q1 FY23"), ("Product A", "FY23"), ("Product B", "Q1 FY23")]
        );
    }

    #[test]
    fn test_not_enough_rows_is_skipped() {
        let rows: Vec<Vec<CellValue>> = vec![vec!["a".into()], vec!["b".into()]];
        let outcome = process_sheet(&input(rows, &[]), "x.xlsx", &config());
        assert_eq!(
            outcome.skip_reason(),
            Some(&SkipReason::NotEnoughRows { rows: 2, required: 3 })
        );
        assert_eq!(outcome.state(), SheetState::MetadataRead);
        assert!(outcome.records().is_empty());
    }

    #[test]
    fn test_blank_header_is_skipped() {
        let rows: Vec<Vec<CellValue>> = vec![
            vec!["a".into()],
            vec!["b".into()],
            vec![CellValue::Empty, "  ".into()],
            vec!["Revenue".into(), 1.0.into()],
        ];
        let outcome = process_sheet(&input(rows, &[]), "x.xlsx", &config());
        assert_eq!(outcome.skip_reason(), Some(&SkipReason::BlankHeader));
    }

    #[test]
    fn test_empty_body_is_skipped() {
        let rows: Vec<Vec<CellValue>> = vec![
            vec!["a".into()],
            vec!["b".into()],
            vec!["Metric".into(), "Q1 FY23".into()],
        ];
        let outcome = process_sheet(&input(rows, &[]), "x.xlsx", &config());
        assert_eq!(outcome.skip_reason(), Some(&SkipReason::EmptyBody));
        assert_eq!(outcome.state(), SheetState::HeaderLocated);
    }

    #[test]
    fn test_label_only_body_has_no_period_columns() {
        let rows: Vec<Vec<CellValue>> = vec![
            vec!["a".into()],
            vec!["b".into()],
            vec!["Metric".into(), "Q1 FY23".into()],
            vec!["Revenue".into()],
        ];
        let outcome = process_sheet(&input(rows, &[]), "x.xlsx", &config());
        assert_eq!(outcome.skip_reason(), Some(&SkipReason::NoPeriodColumns));
        assert_eq!(outcome.state(), SheetState::BodyClassified);
    }

    #[test]
    fn test_blank_amounts_only_is_empty_melt() {
        let rows: Vec<Vec<CellValue>> = vec![
            vec!["a".into()],
            vec!["b".into()],
            vec!["Metric".into(), "Q1 FY23".into()],
            vec!["Revenue".into(), "   ".into()],
        ];
        let outcome = process_sheet(&input(rows, &[]), "x.xlsx", &config());
        assert_eq!(outcome.skip_reason(), Some(&SkipReason::EmptyMelt));
    }

    #[test]
    fn test_process_workbook_selects_and_orders_sheets() {
        let mut workbook = MemoryWorkbook::new("fy23.xlsx")
            .with_sheet("P&L", statement(), [6])
            .with_sheet("Cover", vec![vec!["Title".into()]], [])
            .with_sheet("P&L 2", statement(), []);

        let config = PipelineConfig {
            sheet_selector: SheetSelector::Contains("P&L".into()),
            sub_header_direction: SubHeaderDirection::Above,
            parallel: true,
            ..config()
        };
        let report = process_workbook(&mut workbook, &config);

        let sheets: Vec<&str> = report.sheets.iter().map(SheetOutcome::sheet).collect();
        assert_eq!(sheets, vec!["P&L", "P&L 2"]);
        assert_eq!(report.sheets_done(), 2);
        assert_eq!(report.sheets_skipped(), 0);
        assert_eq!(report.record_count(), 12);
        assert!(report
            .records()
            .all(|r| r.metadata.workbook_name().as_deref() == Some("fy23.xlsx")));
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::NotEnoughRows { rows: 3, required: 9 };
        assert_eq!(
            reason.to_string(),
            "not enough rows to reach a header (3 rows, 9 required)"
        );
        assert_eq!(SheetState::HeaderLocated.to_string(), "header_located");
    }
}
