//! Workbook Source Module
//!
//! パイプラインが消費するワークブック読み取り機能の抽象化です。
//! XLSXファイル用の実装は`parser`モジュール、メモリ上の実装はこのモジュールにあります。

use std::collections::BTreeSet;

use crate::error::XlsxMeltError;
use crate::grid::SheetGrid;
use crate::types::{CellFont, CellValue};

/// ワークブックの読み取り機能
///
/// シート名の列挙、シートのセル値グリッド、識別列のフォント情報を提供します。
pub trait WorkbookSource {
    /// ワークブック名（通常はファイル名）
    fn workbook_name(&self) -> &str;

    /// シート名（ワークブック内の順序）
    fn sheet_names(&self) -> Vec<String>;

    /// シートのセル値グリッドを読み取る
    fn read_grid(&mut self, sheet: &str) -> Result<SheetGrid, XlsxMeltError>;

    /// 指定した列（0始まり）の各セルのフォント情報を読み取る
    fn column_fonts(&mut self, sheet: &str, column: u32) -> Result<Vec<CellFont>, XlsxMeltError>;
}

/// メモリ上のシート
#[derive(Debug, Clone)]
struct MemorySheet {
    name: String,
    grid: SheetGrid,
    bold_rows: BTreeSet<u32>,
}

/// メモリ上のワークブック
///
/// 他のリーダーで読み込んだデータや、テストデータをパイプラインに渡すために使います。
/// 太字情報は識別列（A列）の行番号（1始まり）で指定します。
///
/// # 使用例
///
/// ```rust
/// use xlsxmelt::{CellValue, MemoryWorkbook};
///
/// let workbook = MemoryWorkbook::new("fy23.xlsx").with_sheet(
///     "P&L",
///     vec![vec![CellValue::from("Revenue"), CellValue::from(100.0)]],
///     [1],
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    name: String,
    sheets: Vec<MemorySheet>,
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    /// シートを追加
    pub fn with_sheet<I>(mut self, name: impl Into<String>, rows: Vec<Vec<CellValue>>, bold_rows: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.sheets.push(MemorySheet {
            name: name.into(),
            grid: SheetGrid::from_rows(rows),
            bold_rows: bold_rows.into_iter().collect(),
        });
        self
    }

    fn sheet(&self, name: &str) -> Result<&MemorySheet, XlsxMeltError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| XlsxMeltError::Config(format!("Sheet '{}' not found", name)))
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn workbook_name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_grid(&mut self, sheet: &str) -> Result<SheetGrid, XlsxMeltError> {
        Ok(self.sheet(sheet)?.grid.clone())
    }

    fn column_fonts(&mut self, sheet: &str, column: u32) -> Result<Vec<CellFont>, XlsxMeltError> {
        let sheet = self.sheet(sheet)?;
        if column != 0 {
            return Ok(Vec::new());
        }
        Ok((1..=sheet.grid.row_count() as u32)
            .map(|row| CellFont::new(row, Some(sheet.bold_rows.contains(&row))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> MemoryWorkbook {
        MemoryWorkbook::new("book.xlsx")
            .with_sheet("A", vec![vec!["x".into()], vec!["y".into()]], [2])
            .with_sheet("B", vec![], [])
    }

    #[test]
    fn test_sheet_names_in_order() {
        let wb = workbook();
        assert_eq!(wb.workbook_name(), "book.xlsx");
        assert_eq!(wb.sheet_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_column_fonts_report_bold_rows() {
        let mut wb = workbook();
        let fonts = wb.column_fonts("A", 0).unwrap();
        assert_eq!(
            fonts,
            vec![CellFont::new(1, Some(false)), CellFont::new(2, Some(true))]
        );
        assert!(wb.column_fonts("A", 1).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_sheet_is_error() {
        let mut wb = workbook();
        assert!(matches!(wb.read_grid("Z"), Err(XlsxMeltError::Config(_))));
    }
}
