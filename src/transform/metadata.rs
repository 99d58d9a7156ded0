//! Metadata Extractor
//!
//! シート先頭の固定行（または固定セル）をシート単位のメタデータとして読み取ります。
//! 行数が足りない場合も失敗せず、欠けたフィールドは値なしになります。

use crate::api::MetadataStrategy;
use crate::grid::SheetGrid;
use crate::types::{CellValue, SheetMetadata, SHEET_NAME_KEY, WORKBOOK_NAME_KEY};

/// シートのメタデータを抽出
///
/// # 引数
///
/// * `grid` - シートのグリッド
/// * `sheet_name` - シート名
/// * `workbook_name` - ワークブックのファイル名
/// * `strategy` - 読み取り方式
///
/// # 戻り値
///
/// `Workbook Name`、`Sheet Name`、宣言順のフィールドの順に並んだメタデータ
pub fn extract_metadata(
    grid: &SheetGrid,
    sheet_name: &str,
    workbook_name: &str,
    strategy: &MetadataStrategy,
) -> SheetMetadata {
    let mut metadata = SheetMetadata::new();
    metadata.push(WORKBOOK_NAME_KEY, Some(CellValue::from(workbook_name)));
    metadata.push(SHEET_NAME_KEY, Some(CellValue::from(sheet_name)));

    match strategy {
        MetadataStrategy::LeadingRows { fields } => {
            for (row, field) in fields.iter().enumerate() {
                metadata.push(field.as_str(), present(grid.cell(row, 0)));
            }
        }
        MetadataStrategy::FixedCells { cells } => {
            for cell in cells {
                metadata.push(cell.name.as_str(), present(grid.cell_at(cell.row, cell.col)));
            }
        }
    }

    metadata
}

fn present(value: &CellValue) -> Option<CellValue> {
    if value.is_empty() {
        None
    } else {
        Some(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MetadataCell;

    fn statement_grid() -> SheetGrid {
        SheetGrid::from_rows(vec![
            vec!["Co".into(), "Contoso".into()],
            vec!["Seg".into(), "Retail".into()],
            vec!["M3".into()],
            vec![2024i64.into()],
        ])
    }

    #[test]
    fn test_leading_rows_default_fields() {
        let grid = statement_grid();
        let metadata =
            extract_metadata(&grid, "P&L", "fy24.xlsx", &MetadataStrategy::default());

        assert_eq!(metadata.len(), 10);
        assert_eq!(metadata.workbook_name().as_deref(), Some("fy24.xlsx"));
        assert_eq!(metadata.sheet_name().as_deref(), Some("P&L"));
        assert_eq!(metadata.get("Meta 1"), Some(&CellValue::from("Co")));
        assert_eq!(metadata.get("Meta 4"), Some(&CellValue::Number(2024.0)));
    }

    #[test]
    fn test_short_sheet_maps_missing_rows_to_none() {
        let grid = statement_grid();
        let metadata =
            extract_metadata(&grid, "P&L", "fy24.xlsx", &MetadataStrategy::default());

        for key in ["Meta 5", "Meta 6", "Meta 7", "Meta 8"] {
            assert!(metadata.contains_key(key));
            assert_eq!(metadata.get(key), None);
        }
    }

    #[test]
    fn test_empty_grid_never_fails() {
        let grid = SheetGrid::default();
        let metadata = extract_metadata(&grid, "Empty", "x.xlsx", &MetadataStrategy::numbered(3));
        assert_eq!(metadata.len(), 5);
        assert_eq!(metadata.get("Meta 1"), None);
    }

    #[test]
    fn test_fixed_cells() {
        let grid = statement_grid();
        let strategy = MetadataStrategy::FixedCells {
            cells: vec![
                MetadataCell::new("Model", 1, 2),
                MetadataCell::new("Scenario", 2, 2),
                MetadataCell::new("Missing", 40, 9),
            ],
        };
        let metadata = extract_metadata(&grid, "P&L", "fy24.xlsx", &strategy);

        let keys: Vec<&str> = metadata.entries().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![WORKBOOK_NAME_KEY, SHEET_NAME_KEY, "Model", "Scenario", "Missing"]
        );
        assert_eq!(metadata.get("Model"), Some(&CellValue::from("Contoso")));
        assert_eq!(metadata.get("Scenario"), Some(&CellValue::from("Retail")));
        assert_eq!(metadata.get("Missing"), None);
    }
}
