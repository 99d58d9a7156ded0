//! Grid Module
//!
//! シートのセル値を稠密な行 × 列のグリッドとして保持するモジュール。
//! グリッドは常にA1セルを原点とし、内部インデックス（0始まり）と
//! スプレッドシートの行番号（1始まり）が1ずれるだけで対応します。

use crate::types::CellValue;

static EMPTY: CellValue = CellValue::Empty;

/// シートのセル値グリッド（読み取り専用スナップショット）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetGrid {
    /// グリッドデータ（行 × 列）
    cells: Vec<Vec<CellValue>>,

    /// 列数（全行で共通）
    cols: usize,
}

impl SheetGrid {
    /// 行データからグリッドを構築
    ///
    /// 行ごとに長さが異なる場合は、最長の行に合わせて空セルで埋めます。
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let cells = rows
            .into_iter()
            .map(|mut row| {
                row.resize(cols, CellValue::Empty);
                row
            })
            .collect();
        Self { cells, cols }
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    /// 列数
    pub fn col_count(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 0始まりの座標でセル値を取得（範囲外は空セル）
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// 1始まりの座標（スプレッドシートの行番号・列番号）でセル値を取得
    pub fn cell_at(&self, row_number: u32, col_number: u32) -> &CellValue {
        if row_number == 0 || col_number == 0 {
            return &EMPTY;
        }
        self.cell(row_number as usize - 1, col_number as usize - 1)
    }

    /// 0始まりのインデックスで行を取得
    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    /// 指定した行以降の行を取得
    pub fn rows_from(&self, row: usize) -> &[Vec<CellValue>] {
        self.cells.get(row..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SheetGrid {
        SheetGrid::from_rows(vec![
            vec!["Co".into()],
            vec!["Metric".into(), "Q1 FY23".into(), "Q2 FY23".into()],
            vec!["Revenue".into(), 10.0.into()],
        ])
    }

    #[test]
    fn test_from_rows_pads_to_rectangle() {
        let grid = sample();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.col_count(), 3);
        assert_eq!(grid.row(0).unwrap().len(), 3);
        assert_eq!(grid.cell(0, 2), &CellValue::Empty);
        assert_eq!(grid.cell(2, 1), &CellValue::Number(10.0));
    }

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let grid = sample();
        assert!(grid.cell(10, 0).is_empty());
        assert!(grid.cell(0, 10).is_empty());
    }

    #[test]
    fn test_cell_at_uses_spreadsheet_numbering() {
        let grid = sample();
        assert_eq!(grid.cell_at(1, 1), &CellValue::from("Co"));
        assert_eq!(grid.cell_at(2, 2), &CellValue::from("Q1 FY23"));
        assert!(grid.cell_at(0, 1).is_empty());
        assert!(grid.cell_at(1, 0).is_empty());
    }

    #[test]
    fn test_rows_from() {
        let grid = sample();
        assert_eq!(grid.rows_from(1).len(), 2);
        assert!(grid.rows_from(3).is_empty());
        assert!(grid.rows_from(99).is_empty());
    }

    #[test]
    fn test_empty_grid() {
        let grid = SheetGrid::from_rows(vec![]);
        assert!(grid.is_empty());
        assert_eq!(grid.col_count(), 0);
    }
}
