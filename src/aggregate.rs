//! Workbook Aggregator
//!
//! シート単位のレコードを1つの結合テーブルにまとめ、完全に一致する行を除去します。
//! 比較は出力と同じフラットな文字列表現に金額セルの型を加えて行います。
//! 数値`7`と文字列`"7"`は出力上は同じでも別の行として残ります。

use std::collections::HashSet;

use tracing::debug;

use crate::pipeline::WorkbookReport;
use crate::types::{CellValue, LongRecord, SHEET_NAME_KEY, WORKBOOK_NAME_KEY};

pub const FINANCIAL_METRIC: &str = "Financial Metric";
pub const FINANCIAL_AMOUNT: &str = "Financial Amount";
pub const SUB_HEADER: &str = "Sub-Header";
pub const QUARTER: &str = "Quarter";
pub const FISCAL_YEAR: &str = "Fiscal Year";
/// 元の期間ラベル（例: `Q1 FY23`）
pub const QUARTER_YEAR: &str = "Quarter/Year";

/// メタデータフィールド名として使用できない列名
pub const RESERVED_COLUMNS: [&str; 8] = [
    FINANCIAL_METRIC,
    FINANCIAL_AMOUNT,
    SUB_HEADER,
    QUARTER,
    FISCAL_YEAR,
    WORKBOOK_NAME_KEY,
    SHEET_NAME_KEY,
    QUARTER_YEAR,
];

/// 出力行（列スキーマと位置で対応、欠損値は`None`）
pub type Row = Vec<Option<String>>;

/// 出力列スキーマ
///
/// `Financial Metric, Financial Amount, Sub-Header, Quarter, Fiscal Year,
/// Workbook Name, Sheet Name, <fields>..., Quarter/Year`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    fields: Vec<String>,
}

impl OutputSchema {
    /// メタデータフィールド名（宣言順）からスキーマを生成
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// 列名の一覧
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![
            FINANCIAL_METRIC,
            FINANCIAL_AMOUNT,
            SUB_HEADER,
            QUARTER,
            FISCAL_YEAR,
            WORKBOOK_NAME_KEY,
            SHEET_NAME_KEY,
        ];
        columns.extend(self.fields.iter().map(String::as_str));
        columns.push(QUARTER_YEAR);
        columns
    }

    /// レコードを出力行に変換
    pub fn render(&self, record: &LongRecord) -> Row {
        let metadata = |key: &str| record.metadata.get(key).map(|v| v.as_raw_string());

        let mut row = Vec::with_capacity(self.fields.len() + 8);
        row.push(Some(record.financial_metric.clone()));
        row.push(Some(record.financial_amount.as_raw_string()));
        row.push(record.sub_header.clone());
        row.push(record.quarter.clone());
        row.push(record.fiscal_year.clone());
        row.push(metadata(WORKBOOK_NAME_KEY));
        row.push(metadata(SHEET_NAME_KEY));
        row.extend(self.fields.iter().map(|field| metadata(field.as_str())));
        row.push(Some(record.period_label.clone()));
        row
    }
}

/// 結合テーブル
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedTable {
    pub schema: OutputSchema,
    pub rows: Vec<Row>,
    /// 重複除去前の行数
    pub rows_received: usize,
}

impl CombinedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 除去された重複行の数
    pub fn duplicates_removed(&self) -> usize {
        self.rows_received - self.rows.len()
    }
}

/// 金額セルの型（重複判定キーの一部）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AmountKind {
    Number,
    Text,
    Bool,
    Error,
    DateTime,
    Empty,
}

impl From<&CellValue> for AmountKind {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Number(_) => AmountKind::Number,
            CellValue::String(_) => AmountKind::Text,
            CellValue::Bool(_) => AmountKind::Bool,
            CellValue::Error(_) => AmountKind::Error,
            CellValue::DateTime(_) => AmountKind::DateTime,
            CellValue::Empty => AmountKind::Empty,
        }
    }
}

/// 結合テーブルを構築するアグリゲーター
///
/// シートの処理が終わるたびにレコードを受け取り、最初の出現だけを残します。
///
/// 重複判定のキーは描画済みの行と金額セルの型の組です。
/// [`push_rows`](Self::push_rows)で直接渡された行は型を持たず、文字列表現だけで比較されます。
#[derive(Debug)]
pub struct Aggregator {
    schema: OutputSchema,
    seen: HashSet<(Row, Option<AmountKind>)>,
    rows: Vec<Row>,
    rows_received: usize,
}

impl Aggregator {
    pub fn new(schema: OutputSchema) -> Self {
        Self {
            schema,
            seen: HashSet::new(),
            rows: Vec::new(),
            rows_received: 0,
        }
    }

    /// シート1枚分のレコードを追加
    ///
    /// # 戻り値
    ///
    /// 新たに追加された（重複でなかった）行数
    pub fn push_sheet<'a, I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = &'a LongRecord>,
    {
        let rows: Vec<_> = records
            .into_iter()
            .map(|record| {
                let kind = AmountKind::from(&record.financial_amount);
                (self.schema.render(record), Some(kind))
            })
            .collect();
        self.push_keyed(rows)
    }

    /// ワークブックの全シートのレコードをシート順に追加
    pub fn push_report(&mut self, report: &WorkbookReport) -> usize {
        report
            .sheets
            .iter()
            .map(|sheet| self.push_sheet(sheet.records()))
            .sum()
    }

    /// 出力行を直接追加
    pub fn push_rows<I>(&mut self, rows: I) -> usize
    where
        I: IntoIterator<Item = Row>,
    {
        self.push_keyed(rows.into_iter().map(|row| (row, None)))
    }

    fn push_keyed<I>(&mut self, rows: I) -> usize
    where
        I: IntoIterator<Item = (Row, Option<AmountKind>)>,
    {
        let before = self.rows.len();
        for (row, kind) in rows {
            self.rows_received += 1;
            if self.seen.insert((row.clone(), kind)) {
                self.rows.push(row);
            }
        }
        let added = self.rows.len() - before;
        debug!(added, total = self.rows.len(), "aggregated rows");
        added
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finish(self) -> CombinedTable {
        CombinedTable {
            schema: self.schema,
            rows: self.rows,
            rows_received: self.rows_received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, SheetMetadata};
    use std::sync::Arc;

    fn metadata(sheet: &str) -> Arc<SheetMetadata> {
        let mut metadata = SheetMetadata::new();
        metadata.push(WORKBOOK_NAME_KEY, Some("fy23.xlsx".into()));
        metadata.push(SHEET_NAME_KEY, Some(sheet.into()));
        metadata.push("Company", Some("Contoso".into()));
        metadata.push("Segment", None);
        Arc::new(metadata)
    }

    fn record(metric: &str, amount: f64, sheet: &str) -> LongRecord {
        LongRecord {
            sub_header: Some("Revenue".into()),
            financial_metric: metric.into(),
            period_label: "Q1 FY23".into(),
            quarter: Some("Q1".into()),
            fiscal_year: Some("2023".into()),
            financial_amount: CellValue::Number(amount),
            metadata: metadata(sheet),
        }
    }

    fn schema() -> OutputSchema {
        OutputSchema::new(["Company", "Segment"])
    }

    #[test]
    fn test_schema_columns() {
        assert_eq!(
            schema().columns(),
            vec![
                "Financial Metric",
                "Financial Amount",
                "Sub-Header",
                "Quarter",
                "Fiscal Year",
                "Workbook Name",
                "Sheet Name",
                "Company",
                "Segment",
                "Quarter/Year",
            ]
        );
    }

    #[test]
    fn test_render_flattens_values() {
        let row = schema().render(&record("Product A", 100.0, "P&L"));
        let expected: Row = vec![
            Some("Product A".into()),
            Some("100".into()),
            Some("Revenue".into()),
            Some("Q1".into()),
            Some("2023".into()),
            Some("fy23.xlsx".into()),
            Some("P&L".into()),
            Some("Contoso".into()),
            None,
            Some("Q1 FY23".into()),
        ];
        assert_eq!(row, expected);
    }

    #[test]
    fn test_duplicates_removed_first_kept() {
        let mut aggregator = Aggregator::new(schema());
        let sheet_a = vec![record("Product A", 100.0, "P&L"), record("Product A", 100.0, "P&L")];
        let sheet_b = vec![record("Product A", 100.0, "P&L 2"), record("Product B", 5.0, "P&L")];

        assert_eq!(aggregator.push_sheet(&sheet_a), 1);
        assert_eq!(aggregator.push_sheet(&sheet_b), 2);

        let table = aggregator.finish();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows_received, 4);
        assert_eq!(table.duplicates_removed(), 1);
        assert_eq!(table.rows[1][6].as_deref(), Some("P&L 2"));
    }

    #[test]
    fn test_number_and_numeric_text_are_distinct_rows() {
        let mut aggregator = Aggregator::new(schema());
        let number = record("Capex", 7.0, "P&L");
        let mut text = record("Capex", 7.0, "P&L");
        text.financial_amount = CellValue::from("7");

        assert_eq!(aggregator.push_sheet([&number, &text]), 2);
        // 同じ型・同じ値の行は引き続き重複として除去される
        assert_eq!(aggregator.push_sheet([&number, &text]), 0);

        let table = aggregator.finish();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], table.rows[1][1]);
        assert_eq!(table.duplicates_removed(), 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // 重複除去は冪等
            #[test]
            fn test_dedup_idempotent(
                rows in proptest::collection::vec(
                    proptest::collection::vec(proptest::option::of("[ab]{0,2}"), 3),
                    0..40,
                )
            ) {
                let mut once = Aggregator::new(OutputSchema::new(Vec::<String>::new()));
                once.push_rows(rows);
                let once = once.finish();

                let mut twice = Aggregator::new(OutputSchema::new(Vec::<String>::new()));
                twice.push_rows(once.rows.clone());
                let twice = twice.finish();

                prop_assert_eq!(&once.rows, &twice.rows);
                prop_assert_eq!(twice.duplicates_removed(), 0);
            }
        }
    }
}
