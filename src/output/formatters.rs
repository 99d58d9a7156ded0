//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use std::io::Write;

use serde_json::{Map, Value};

use crate::aggregate::CombinedTable;
use crate::error::XlsxMeltError;

/// UTF-8のバイトオーダーマーク
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV形式のフォーマッター
///
/// 先頭行は列名。欠損値は空フィールドになります。
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter {
    /// 先頭にUTF-8 BOMを書き込むか（Excelで開く場合に使用）
    pub bom: bool,
}

impl CsvFormatter {
    pub fn render<W: Write>(&self, table: &CombinedTable, mut writer: W) -> Result<(), XlsxMeltError> {
        if self.bom {
            writer.write_all(UTF8_BOM)?;
        }

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(table.schema.columns())?;
        for row in &table.rows {
            csv_writer.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// JSON Lines形式のフォーマッター
///
/// 1行1オブジェクト。キーは列名で、順序は列スキーマに従います。欠損値は`null`です。
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesFormatter;

impl JsonLinesFormatter {
    pub fn render<W: Write>(&self, table: &CombinedTable, mut writer: W) -> Result<(), XlsxMeltError> {
        let columns = table.schema.columns();
        for row in &table.rows {
            let object: Map<String, Value> = columns
                .iter()
                .zip(row)
                .map(|(column, value)| {
                    let value = value.clone().map(Value::String).unwrap_or(Value::Null);
                    (column.to_string(), value)
                })
                .collect();
            serde_json::to_writer(&mut writer, &Value::Object(object))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
