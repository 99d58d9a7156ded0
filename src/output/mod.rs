//! Output Format Module
//!
//! Strategy Patternによる出力フォーマットの抽象化を提供するモジュール。

mod formatters;

use std::io::Write;

use crate::aggregate::CombinedTable;
use crate::api::OutputFormat;
use crate::error::XlsxMeltError;

pub use formatters::*;

/// 出力フォーマッター（Strategy Pattern）
///
/// 各出力フォーマット（CSV, JSON Lines）をenumとして表現します。
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Csv(CsvFormatter),
    JsonLines(JsonLinesFormatter),
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    ///
    /// `bom`はCSV形式でのみ使用します。
    pub fn from_format(format: OutputFormat, bom: bool) -> Self {
        match format {
            OutputFormat::Csv => OutputFormatter::Csv(CsvFormatter { bom }),
            OutputFormat::JsonLines => OutputFormatter::JsonLines(JsonLinesFormatter),
        }
    }

    /// 結合テーブルを指定されたフォーマットで出力する
    pub fn render<W: Write>(&self, table: &CombinedTable, writer: W) -> Result<(), XlsxMeltError> {
        match self {
            OutputFormatter::Csv(formatter) => formatter.render(table, writer),
            OutputFormatter::JsonLines(formatter) => formatter.render(table, writer),
        }
    }
}
