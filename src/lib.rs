//! xlsxmelt - Pure-Rust converter from bold-structured Excel financial statements to long-format tables
//!
//! 財務諸表のワークシート（先頭にメタデータ行、太字のサブヘッダー行、期間ごとの値列）を
//! 1行1値のロング形式テーブルに変換し、複数のワークブック・シートを1つの表に結合します。
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxmelt::PipelineBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // デフォルト設定（ヘッダー行は9行目、先頭8行がメタデータ）
//!     let pipeline = PipelineBuilder::new().build()?;
//!
//!     // ディレクトリ内のすべてのワークブックを1つのCSVに結合
//!     let output = File::create("combined.csv")?;
//!     let summary = pipeline.run(["statements/"], output)?;
//!     println!("{} records", summary.records_written);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxmelt::{
//!     BoldRowPolicy, MetadataStrategy, OutputFormat, PipelineBuilder, SheetSelector,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = PipelineBuilder::new()
//!         .with_header_skip(3)
//!         .with_metadata_strategy(MetadataStrategy::leading_rows(["Company", "Segment", "Unit"]))
//!         .with_sheet_selector(SheetSelector::Contains("P&L".to_string()))
//!         .with_bold_rows(BoldRowPolicy::Drop)
//!         .with_output_format(OutputFormat::JsonLines)
//!         .build()?;
//!
//!     let input = File::open("fy23.xlsx")?;
//!     let output = File::create("fy23.jsonl")?;
//!     pipeline.convert(input, "fy23.xlsx", output)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # In-Memory Sources
//!
//! ファイルを介さずに`MemoryWorkbook`で変換処理を実行できます。
//!
//! ```rust
//! use xlsxmelt::{CellValue, MemoryWorkbook, MetadataStrategy, PipelineBuilder};
//!
//! # fn main() -> Result<(), xlsxmelt::XlsxMeltError> {
//! let pipeline = PipelineBuilder::new()
//!     .with_header_skip(1)
//!     .with_metadata_strategy(MetadataStrategy::leading_rows(["Company"]))
//!     .build()?;
//!
//! let text = |s: &str| CellValue::String(s.to_string());
//! let mut workbook = MemoryWorkbook::new("fy23.xlsx").with_sheet(
//!     "P&L",
//!     vec![
//!         vec![text("Acme")],
//!         vec![text("Metric"), text("Q1 FY23"), text("Q2 FY23")],
//!         vec![text("Revenue"), CellValue::Empty, CellValue::Empty],
//!         vec![text("Product A"), CellValue::Number(100.0), CellValue::Number(110.0)],
//!     ],
//!     [3],
//! );
//!
//! let report = pipeline.process_source(&mut workbook);
//! assert_eq!(report.sheets_done(), 1);
//! assert_eq!(report.record_count(), 2);
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod api;
mod builder;
mod discovery;
mod error;
mod grid;
mod output;
mod parser;
mod pipeline;
mod security;
mod source;
mod transform;
mod types;

// 公開API
pub use aggregate::{
    Aggregator, CombinedTable, OutputSchema, Row, FINANCIAL_AMOUNT, FINANCIAL_METRIC,
    FISCAL_YEAR, QUARTER, QUARTER_YEAR, RESERVED_COLUMNS, SUB_HEADER,
};
pub use api::{
    BoldRowPolicy, MetadataCell, MetadataStrategy, OutputFormat, PeriodColumnPolicy,
    SheetSelector, SubHeaderDirection,
};
pub use builder::{Pipeline, PipelineBuilder, PipelineConfig, RunSummary};
pub use discovery::discover_workbooks;
pub use error::XlsxMeltError;
pub use grid::SheetGrid;
pub use output::{CsvFormatter, JsonLinesFormatter, OutputFormatter};
pub use parser::XlsxWorkbook;
pub use pipeline::{SheetOutcome, SheetState, SkipReason, WorkbookReport};
pub use source::{MemoryWorkbook, WorkbookSource};
pub use transform::{
    assign_sub_headers, detect_bold_rows, extract_metadata, PeriodLabel, ValueColumn,
    ALL_PERIODS, UNNAMED_COLUMN,
};
pub use types::{
    CellFont, CellValue, ClassifiedRow, LongRecord, RawRow, SheetMetadata, SHEET_NAME_KEY,
    WORKBOOK_NAME_KEY,
};
