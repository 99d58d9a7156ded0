//! Row Classifier & Hierarchy Builder
//!
//! ヘッダー行から値列を決定し、本体行を生レコードに変換したうえで、
//! 太字行のテキストをサブヘッダーとして各行に伝播させます。

use std::collections::{BTreeSet, HashSet};

use crate::api::{BoldRowPolicy, SubHeaderDirection};
use crate::types::{CellValue, ClassifiedRow, RawRow};

/// 名前のないヘッダーセルに付ける列名
pub const UNNAMED_COLUMN: &str = "Unnamed Column";

/// 値列（識別列以外の列）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueColumn {
    /// グリッド上の列インデックス（0始まり）
    pub index: usize,
    /// 前後の空白を除去したヘッダー名
    pub name: String,
}

/// ヘッダーセルを列名に変換
fn header_name(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => UNNAMED_COLUMN.to_string(),
        other => {
            let name = other.as_raw_string();
            let trimmed = name.trim();
            if trimmed.is_empty() {
                UNNAMED_COLUMN.to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// ヘッダー行がすべて空白かどうか
pub fn is_blank_header(header: &[CellValue]) -> bool {
    header.iter().all(CellValue::is_blank)
}

/// 値列を決定
///
/// 識別列（0列目）を除くすべての列のうち、本体に1つでも値を持つ列だけを残します。
pub fn value_columns(header: &[CellValue], body: &[Vec<CellValue>]) -> Vec<ValueColumn> {
    let width = header
        .len()
        .max(body.iter().map(Vec::len).max().unwrap_or(0));

    (1..width)
        .filter(|&col| {
            body.iter()
                .any(|row| row.get(col).is_some_and(|cell| !cell.is_empty()))
        })
        .map(|col| ValueColumn {
            index: col,
            name: header_name(header.get(col).unwrap_or(&CellValue::Empty)),
        })
        .collect()
}

/// 同じ名前を持つ列名を返す（出現順、重複なし）
pub fn duplicate_names(columns: &[ValueColumn]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    columns
        .iter()
        .filter(|c| !seen.insert(c.name.as_str()) && reported.insert(c.name.as_str()))
        .map(|c| c.name.as_str())
        .collect()
}

/// 本体行から生レコードを構築
///
/// # 引数
///
/// * `body` - ヘッダー行の次の行からの本体行
/// * `columns` - 値列
/// * `first_row_number` - 本体1行目のスプレッドシート行番号（1始まり）
/// * `bold_rows` - 太字の行番号の集合
pub fn build_raw_rows(
    body: &[Vec<CellValue>],
    columns: &[ValueColumn],
    first_row_number: u32,
    bold_rows: &BTreeSet<u32>,
) -> Vec<RawRow> {
    body.iter()
        .enumerate()
        .map(|(offset, cells)| {
            let row_number = first_row_number + offset as u32;
            let label = cells
                .first()
                .and_then(CellValue::as_trimmed_str)
                .unwrap_or_default()
                .to_string();
            let values = columns
                .iter()
                .map(|c| cells.get(c.index).cloned().unwrap_or(CellValue::Empty))
                .collect();

            RawRow {
                row_number,
                is_bold: bold_rows.contains(&row_number),
                label,
                values,
            }
        })
        .collect()
}

/// サブヘッダーを伝播
///
/// `Below`の場合は右から左への畳み込み（下から上への走査）です。
/// 太字行に出会うとその識別列テキストが現在のサブヘッダーになり、
/// 太字かどうかに関係なく各行に現在のサブヘッダーが割り当てられます。
/// 太字行自身のサブヘッダーはそれ自身のテキストです。
pub fn assign_sub_headers(rows: Vec<RawRow>, direction: SubHeaderDirection) -> Vec<ClassifiedRow> {
    fn step(current: &mut Option<String>, row: RawRow) -> Option<ClassifiedRow> {
        if row.is_bold {
            *current = Some(row.label.clone());
        }
        Some(ClassifiedRow {
            sub_header: current.clone(),
            row,
        })
    }

    match direction {
        SubHeaderDirection::Below => {
            let mut classified: Vec<ClassifiedRow> =
                rows.into_iter().rev().scan(None, step).collect();
            classified.reverse();
            classified
        }
        SubHeaderDirection::Above => rows.into_iter().scan(None, step).collect(),
    }
}

/// 太字行の保持ポリシーを適用
pub fn apply_bold_policy(rows: Vec<ClassifiedRow>, policy: BoldRowPolicy) -> Vec<ClassifiedRow> {
    match policy {
        BoldRowPolicy::Keep => rows,
        BoldRowPolicy::Drop => rows.into_iter().filter(|r| !r.row.is_bold).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row_number: u32, label: &str, is_bold: bool) -> RawRow {
        RawRow {
            row_number,
            is_bold,
            label: label.to_string(),
            values: vec![],
        }
    }

    fn sub_headers(rows: &[ClassifiedRow]) -> Vec<Option<&str>> {
        rows.iter().map(|r| r.sub_header.as_deref()).collect()
    }

    #[test]
    fn test_header_names() {
        let header: Vec<CellValue> = vec![
            "Metric".into(),
            "  Q1 FY23 ".into(),
            CellValue::Empty,
            2023i64.into(),
            "   ".into(),
        ];
        let body: Vec<Vec<CellValue>> = vec![vec![
            "Revenue".into(),
            1.0.into(),
            2.0.into(),
            3.0.into(),
            4.0.into(),
        ]];
        let names: Vec<String> = value_columns(&header, &body)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["Q1 FY23", UNNAMED_COLUMN, "2023", UNNAMED_COLUMN]
        );
    }

    #[test]
    fn test_value_columns_prune_all_empty() {
        let header: Vec<CellValue> =
            vec!["Metric".into(), "Q1 FY23".into(), "Notes".into(), "Q2 FY23".into()];
        let body: Vec<Vec<CellValue>> = vec![
            vec!["Revenue".into(), 1.0.into(), CellValue::Empty, CellValue::Empty],
            vec!["Cost".into(), CellValue::Empty, CellValue::Empty, 5.0.into()],
        ];
        let columns = value_columns(&header, &body);
        assert_eq!(
            columns,
            vec![
                ValueColumn { index: 1, name: "Q1 FY23".into() },
                ValueColumn { index: 3, name: "Q2 FY23".into() },
            ]
        );
    }

    #[test]
    fn test_value_columns_with_empty_body() {
        let header: Vec<CellValue> = vec!["Metric".into(), "Q1 FY23".into()];
        assert!(value_columns(&header, &[]).is_empty());
    }

    #[test]
    fn test_blank_header() {
        assert!(is_blank_header(&[CellValue::Empty, " ".into()]));
        assert!(is_blank_header(&[]));
        assert!(!is_blank_header(&[CellValue::Empty, "FY23".into()]));
    }

    #[test]
    fn test_duplicate_names() {
        let columns = vec![
            ValueColumn { index: 1, name: "FY23".into() },
            ValueColumn { index: 2, name: "FY24".into() },
            ValueColumn { index: 3, name: "FY23".into() },
            ValueColumn { index: 4, name: "FY23".into() },
        ];
        assert_eq!(duplicate_names(&columns), vec!["FY23"]);
    }

    #[test]
    fn test_build_raw_rows() {
        let columns = vec![
            ValueColumn { index: 1, name: "Q1 FY23".into() },
            ValueColumn { index: 3, name: "Q2 FY23".into() },
        ];
        let body: Vec<Vec<CellValue>> = vec![
            vec![" Revenue ".into(), CellValue::Empty],
            vec!["Product A".into(), 100.0.into(), "x".into(), 200.0.into()],
            vec![42.0.into(), 1.0.into()],
        ];
        let bold: BTreeSet<u32> = [10].into_iter().collect();
        let rows = build_raw_rows(&body, &columns, 10, &bold);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].row_number, 10);
        assert!(rows[0].is_bold);
        assert_eq!(rows[0].label, "Revenue");
        assert_eq!(rows[0].values, vec![CellValue::Empty, CellValue::Empty]);
        assert_eq!(rows[1].row_number, 11);
        assert!(!rows[1].is_bold);
        assert_eq!(
            rows[1].values,
            vec![CellValue::Number(100.0), CellValue::Number(200.0)]
        );
        // 数値の識別列は空文字列
        assert_eq!(rows[2].label, "");
    }

    #[test]
    fn test_reverse_scan_assigns_nearest_bold_below() {
        let rows = vec![
            row(10, "Product A", false),
            row(11, "Product B", false),
            row(12, "Total Revenue", true),
            row(13, "COGS A", false),
            row(14, "Total COGS", true),
            row(15, "Footnote", false),
        ];
        let classified = assign_sub_headers(rows, SubHeaderDirection::Below);
        assert_eq!(
            sub_headers(&classified),
            vec![
                Some("Total Revenue"),
                Some("Total Revenue"),
                Some("Total Revenue"),
                Some("Total COGS"),
                Some("Total COGS"),
                None,
            ]
        );
        // 順序は保持される
        let numbers: Vec<u32> = classified.iter().map(|r| r.row.row_number).collect();
        assert_eq!(numbers, vec![10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_forward_scan_assigns_nearest_bold_above() {
        let rows = vec![
            row(10, "Preamble", false),
            row(11, "Revenue", true),
            row(12, "Product A", false),
            row(13, "Costs", true),
            row(14, "COGS", false),
        ];
        let classified = assign_sub_headers(rows, SubHeaderDirection::Above);
        assert_eq!(
            sub_headers(&classified),
            vec![None, Some("Revenue"), Some("Revenue"), Some("Costs"), Some("Costs")]
        );
    }

    #[test]
    fn test_no_bold_rows() {
        let rows = vec![row(10, "A", false), row(11, "B", false)];
        let classified = assign_sub_headers(rows, SubHeaderDirection::Below);
        assert_eq!(sub_headers(&classified), vec![None, None]);
    }

    #[test]
    fn test_bold_policy() {
        let rows = vec![row(10, "A", false), row(11, "Total", true)];
        let classified = assign_sub_headers(rows, SubHeaderDirection::Below);

        let kept = apply_bold_policy(classified.clone(), BoldRowPolicy::Keep);
        assert_eq!(kept.len(), 2);

        let dropped = apply_bold_policy(classified, BoldRowPolicy::Drop);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].row.label, "A");
        assert_eq!(dropped[0].sub_header.as_deref(), Some("Total"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // 非太字行のサブヘッダーは、その行以下で最も近い太字行のテキスト
            #[test]
            fn test_reverse_scan_matches_nearest_bold_below(
                flags in proptest::collection::vec(any::<bool>(), 0..40)
            ) {
                let rows: Vec<RawRow> = flags
                    .iter()
                    .enumerate()
                    .map(|(i, &bold)| row(i as u32 + 10, &format!("row{}", i), bold))
                    .collect();
                let classified = assign_sub_headers(rows.clone(), SubHeaderDirection::Below);
                prop_assert_eq!(classified.len(), rows.len());

                for (i, c) in classified.iter().enumerate() {
                    let expected = rows[i..]
                        .iter()
                        .find(|r| r.is_bold)
                        .map(|r| r.label.clone());
                    prop_assert_eq!(&c.sub_header, &expected);
                    prop_assert_eq!(&c.row, &rows[i]);
                }
            }
        }
    }
}
