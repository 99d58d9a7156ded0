//! Parser Module
//!
//! XLSXファイルの読み取り。セルの値はcalamine、
//! フォント情報はZIP内のXMLを直接解析して取得します。

mod formatting;
mod workbook;

pub(crate) use formatting::XlsxFormattingParser;
pub use workbook::XlsxWorkbook;
