//! Wide-to-Long Transformer
//!
//! N個の期間列を持つメトリック行を、N個のロング形式レコードに展開します。

use std::sync::Arc;

use crate::api::PeriodColumnPolicy;
use crate::transform::classify::ValueColumn;
use crate::transform::period::PeriodLabel;
use crate::types::{CellValue, ClassifiedRow, LongRecord, SheetMetadata};

/// 展開対象の期間列
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodColumn {
    /// 行レコードの`values`内での位置
    pub position: usize,
    /// 元の列名
    pub name: String,
    /// 列名の解析結果
    pub period: PeriodLabel,
}

/// メタデータ付与前のロング形式レコード
#[derive(Debug, Clone, PartialEq)]
pub struct MeltedRecord {
    pub sub_header: Option<String>,
    pub financial_metric: String,
    pub period_label: String,
    pub period: PeriodLabel,
    pub financial_amount: CellValue,
}

impl MeltedRecord {
    /// シートのメタデータを付与して`LongRecord`に変換
    pub fn with_metadata(self, metadata: &Arc<SheetMetadata>) -> LongRecord {
        LongRecord {
            quarter: self.period.quarter(),
            fiscal_year: self.period.fiscal_year().map(str::to_string),
            sub_header: self.sub_header,
            financial_metric: self.financial_metric,
            period_label: self.period_label,
            financial_amount: self.financial_amount,
            metadata: Arc::clone(metadata),
        }
    }
}

/// 値列から期間列を決定
///
/// 期間として解釈できない列は、ポリシーに応じて残す（四半期・年度は空）か除外します。
pub fn period_columns(columns: &[ValueColumn], policy: PeriodColumnPolicy) -> Vec<PeriodColumn> {
    columns
        .iter()
        .enumerate()
        .map(|(position, column)| PeriodColumn {
            position,
            name: column.name.clone(),
            period: PeriodLabel::parse(&column.name),
        })
        .filter(|column| match policy {
            PeriodColumnPolicy::MeltThrough => true,
            PeriodColumnPolicy::Drop => column.period.is_period(),
        })
        .collect()
}

/// 行 × 期間列の全組み合わせを展開（空の金額も含む）
///
/// 結果の件数は常に `rows.len() * columns.len()` です。
pub fn melt(rows: &[ClassifiedRow], columns: &[PeriodColumn]) -> Vec<MeltedRecord> {
    rows.iter()
        .flat_map(|row| {
            columns.iter().map(move |column| MeltedRecord {
                sub_header: row.sub_header.clone(),
                financial_metric: row.row.label.clone(),
                period_label: column.name.clone(),
                period: column.period.clone(),
                financial_amount: row
                    .row
                    .values
                    .get(column.position)
                    .cloned()
                    .unwrap_or(CellValue::Empty),
            })
        })
        .collect()
}

/// 金額が空（空白文字だけの文字列を含む）のレコードを除外
pub fn drop_blank_amounts(records: Vec<MeltedRecord>) -> Vec<MeltedRecord> {
    records
        .into_iter()
        .filter(|r| !r.financial_amount.is_blank())
        .collect()
}
