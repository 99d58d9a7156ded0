//! Builder Module
//!
//! Fluent Builder APIを提供し、`Pipeline`インスタンスを段階的に構築する。

use std::collections::HashSet;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{Aggregator, CombinedTable, OutputSchema, RESERVED_COLUMNS};
use crate::api::{
    BoldRowPolicy, MetadataStrategy, OutputFormat, PeriodColumnPolicy, SheetSelector,
    SubHeaderDirection,
};
use crate::discovery::discover_workbooks;
use crate::error::XlsxMeltError;
use crate::output::OutputFormatter;
use crate::parser::XlsxWorkbook;
use crate::pipeline::{process_workbook, WorkbookReport};
use crate::source::WorkbookSource;

/// 変換処理の設定
///
/// JSONファイルから読み込めます。省略した項目はデフォルト値になります。
///
/// ```json
/// {
///   "header_skip": 8,
///   "metadata": { "leading_rows": { "fields": ["Company", "Segment"] } },
///   "sheet_selector": { "contains": "P&L" },
///   "bold_rows": "drop",
///   "output_format": "json_lines"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// ヘッダー行より上の行数（ヘッダー行は`header_skip + 1`行目）
    pub header_skip: usize,

    /// シートメタデータの読み取り方式
    pub metadata: MetadataStrategy,

    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 太字行の扱い
    pub bold_rows: BoldRowPolicy,

    /// 期間として解釈できない列の扱い
    pub period_columns: PeriodColumnPolicy,

    /// サブヘッダーを継承する方向
    pub sub_header_direction: SubHeaderDirection,

    /// シートを並列に変換するか
    pub parallel: bool,

    /// 出力フォーマット
    pub output_format: OutputFormat,

    /// CSV出力の先頭にUTF-8 BOMを付けるか
    pub bom: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            header_skip: MetadataStrategy::DEFAULT_FIELD_COUNT,
            metadata: MetadataStrategy::default(),
            sheet_selector: SheetSelector::All,
            bold_rows: BoldRowPolicy::Keep,
            period_columns: PeriodColumnPolicy::MeltThrough,
            sub_header_direction: SubHeaderDirection::Below,
            parallel: false,
            output_format: OutputFormat::Csv,
            bom: false,
        }
    }
}

impl PipelineConfig {
    /// JSONから設定を読み込む
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, XlsxMeltError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// 出力列スキーマ
    pub fn schema(&self) -> OutputSchema {
        OutputSchema::new(self.metadata.field_names())
    }

    fn validate(&self) -> Result<(), XlsxMeltError> {
        // 1. メタデータフィールド名
        let mut seen = HashSet::new();
        for name in self.metadata.field_names() {
            if name.trim().is_empty() {
                return Err(XlsxMeltError::Config(
                    "Metadata field name must not be empty".to_string(),
                ));
            }
            if RESERVED_COLUMNS.contains(&name) {
                return Err(XlsxMeltError::Config(format!(
                    "Metadata field name '{}' collides with an output column",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(XlsxMeltError::Config(format!(
                    "Duplicate metadata field name: '{}'",
                    name
                )));
            }
        }

        // 2. 固定セル座標（1始まり）
        if let MetadataStrategy::FixedCells { cells } = &self.metadata {
            if let Some(cell) = cells.iter().find(|c| c.row == 0 || c.col == 0) {
                return Err(XlsxMeltError::Config(format!(
                    "Metadata cell '{}' must use 1-based coordinates (got row {}, col {})",
                    cell.name, cell.row, cell.col
                )));
            }
        }

        // 3. シート選択
        match &self.sheet_selector {
            SheetSelector::Contains(needle) if needle.is_empty() => {
                return Err(XlsxMeltError::Config(
                    "Sheet name substring must not be empty".to_string(),
                ));
            }
            SheetSelector::Names(names) if names.is_empty() => {
                return Err(XlsxMeltError::Config(
                    "Sheet name list must not be empty".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxmelt::{PipelineBuilder, BoldRowPolicy, SheetSelector};
///
/// # fn main() -> Result<(), xlsxmelt::XlsxMeltError> {
/// let pipeline = PipelineBuilder::new()
///     .with_header_skip(8)
///     .with_sheet_selector(SheetSelector::Contains("P&L".to_string()))
///     .with_bold_rows(BoldRowPolicy::Drop)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - ヘッダー行: 9行目（先頭8行をメタデータとして読み飛ばす）
    /// - メタデータ: A1〜A8を`Meta 1`〜`Meta 8`として読む
    /// - シート選択: すべてのシート
    /// - 太字行: 残す
    /// - 期間として解釈できない列: 四半期・年度を空にして展開
    /// - サブヘッダー: 下方向（各行以下で最も近い太字行）
    /// - 逐次処理、CSV出力、BOMなし
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の設定から始める（以降の`with_*`で上書き可能）
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// ヘッダー行より上の行数を指定する
    pub fn with_header_skip(mut self, rows: usize) -> Self {
        self.config.header_skip = rows;
        self
    }

    /// シートメタデータの読み取り方式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxmelt::{PipelineBuilder, MetadataStrategy};
    ///
    /// let builder = PipelineBuilder::new()
    ///     .with_metadata_strategy(MetadataStrategy::leading_rows(["Company", "Segment"]));
    /// ```
    pub fn with_metadata_strategy(mut self, strategy: MetadataStrategy) -> Self {
        self.config.metadata = strategy;
        self
    }

    /// 変換対象のシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 太字行の扱いを指定する
    pub fn with_bold_rows(mut self, policy: BoldRowPolicy) -> Self {
        self.config.bold_rows = policy;
        self
    }

    /// 期間として解釈できない列の扱いを指定する
    pub fn with_period_columns(mut self, policy: PeriodColumnPolicy) -> Self {
        self.config.period_columns = policy;
        self
    }

    /// サブヘッダーを継承する方向を指定する
    pub fn with_sub_header_direction(mut self, direction: SubHeaderDirection) -> Self {
        self.config.sub_header_direction = direction;
        self
    }

    /// シートを並列に変換するかを指定する
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// 出力フォーマットを指定する
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// CSV出力の先頭にUTF-8 BOMを付けるかを指定する
    pub fn with_bom(mut self, bom: bool) -> Self {
        self.config.bom = bom;
        self
    }

    /// 設定を検証し、`Pipeline`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxMeltError::Config(String)`: 設定の検証に失敗した場合
    ///   * メタデータフィールド名が空、重複、または出力列名と衝突する
    ///   * 固定セル座標が0を含む
    ///   * シート選択の部分文字列・名前リストが空
    pub fn build(self) -> Result<Pipeline, XlsxMeltError> {
        self.config.validate()?;
        Ok(Pipeline {
            config: self.config,
        })
    }
}

/// 実行全体の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub workbooks: usize,
    pub sheets_processed: usize,
    pub sheets_skipped: usize,
    /// 重複除去前のレコード数
    pub records_before_dedup: usize,
    /// 出力したレコード数
    pub records_written: usize,
}

impl RunSummary {
    fn record(&mut self, report: &WorkbookReport) {
        self.workbooks += 1;
        self.sheets_processed += report.sheets_done();
        self.sheets_skipped += report.sheets_skipped();
    }
}

/// 変換処理のファサード
///
/// `PipelineBuilder`で構築された設定に基づいて、ワークブックを
/// ロング形式のテーブルに変換します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxmelt::PipelineBuilder;
///
/// # fn main() -> Result<(), xlsxmelt::XlsxMeltError> {
/// let pipeline = PipelineBuilder::new().build()?;
/// let output = std::fs::File::create("combined.csv")?;
/// let summary = pipeline.run(["statements/"], output)?;
/// println!("{} records", summary.records_written);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 空のアグリゲーター（出力列スキーマは設定から決まる）
    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.config.schema())
    }

    /// 任意の`WorkbookSource`を処理
    ///
    /// シート単位の失敗はスキップとして報告され、エラーにはなりません。
    pub fn process_source<S: WorkbookSource + ?Sized>(&self, source: &mut S) -> WorkbookReport {
        process_workbook(source, &self.config)
    }

    /// リーダーからXLSXワークブックを開いて処理
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルのリーダー
    /// * `workbook_name` - 出力の`Workbook Name`列に使用する名前
    pub fn process_reader<R: Read>(
        &self,
        reader: R,
        workbook_name: &str,
    ) -> Result<WorkbookReport, XlsxMeltError> {
        let mut workbook = XlsxWorkbook::open(reader, workbook_name)?;
        Ok(self.process_source(&mut workbook))
    }

    /// ファイルパスからXLSXワークブックを開いて処理（ワークブック名はファイル名）
    pub fn process_path<P: AsRef<Path>>(&self, path: P) -> Result<WorkbookReport, XlsxMeltError> {
        let mut workbook = XlsxWorkbook::open_path(path)?;
        Ok(self.process_source(&mut workbook))
    }

    /// 結合テーブルを設定された形式で書き込む
    pub fn write_table<W: Write>(&self, table: &CombinedTable, output: W) -> Result<(), XlsxMeltError> {
        let mut writer = BufWriter::new(output);
        OutputFormatter::from_format(self.config.output_format, self.config.bom)
            .render(table, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// ワークブック1冊を変換して書き込む
    pub fn convert<R: Read, W: Write>(
        &self,
        input: R,
        workbook_name: &str,
        output: W,
    ) -> Result<RunSummary, XlsxMeltError> {
        let report = self.process_reader(input, workbook_name);
        self.aggregate([report], output)
    }

    /// 入力（ファイル、ディレクトリ、globパターン）を解決し、すべてのワークブックを
    /// 1つのテーブルに結合して書き込む
    ///
    /// # エラー
    ///
    /// * `XlsxMeltError::NoInput` - ワークブックが1つも見つからない場合
    /// * ワークブックを開けない場合（破損、XLSX以外）はその時点で中断します
    pub fn run<I, S, W>(&self, inputs: I, output: W) -> Result<RunSummary, XlsxMeltError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: Write,
    {
        let paths = discover_workbooks(inputs)?;
        self.run_paths(&paths, output)
    }

    /// 解決済みのワークブックパスを順に処理し、1つのテーブルに結合して書き込む
    ///
    /// 入力の解決と出力先の準備を分けたい場合（出力ファイルを作成する前に
    /// [`discover_workbooks`]でエラーを検出するなど）に使用します。
    /// 出力には処理がすべて成功した後にだけ書き込みます。
    pub fn run_paths<P, W>(&self, paths: &[P], output: W) -> Result<RunSummary, XlsxMeltError>
    where
        P: AsRef<Path>,
        W: Write,
    {
        info!(workbooks = paths.len(), "processing workbooks");
        self.aggregate(paths.iter().map(|path| self.process_path(path)), output)
    }

    /// ワークブックの処理結果を1冊ずつ集約して書き込む
    ///
    /// レポートは集約後すぐに破棄されるため、保持されるのは結合テーブルだけです。
    /// 最初のエラーで中断し、残りのワークブックは処理しません。
    fn aggregate<I, W>(&self, reports: I, output: W) -> Result<RunSummary, XlsxMeltError>
    where
        I: IntoIterator<Item = Result<WorkbookReport, XlsxMeltError>>,
        W: Write,
    {
        let mut summary = RunSummary::default();
        let mut aggregator = self.aggregator();
        for report in reports {
            let report = report?;
            summary.record(&report);
            aggregator.push_report(&report);
        }

        let table = aggregator.finish();
        summary.records_before_dedup = table.rows_received;
        summary.records_written = table.len();
        self.write_table(&table, output)?;

        info!(
            workbooks = summary.workbooks,
            sheets = summary.sheets_processed,
            skipped = summary.sheets_skipped,
            records = summary.records_written,
            duplicates = table.duplicates_removed(),
            "run complete"
        );
        Ok(summary)
    }
}
