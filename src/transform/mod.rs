//! Transform Module
//!
//! シートのグリッドをロング形式レコードに変換する中核処理です。
//! 各段階は純粋関数として実装し、順序付けは`pipeline`モジュールが担います。

pub(crate) mod bold;
pub(crate) mod classify;
pub(crate) mod melt;
pub(crate) mod metadata;
pub(crate) mod period;

pub use bold::detect_bold_rows;
pub use classify::{assign_sub_headers, ValueColumn, UNNAMED_COLUMN};
pub use metadata::extract_metadata;
pub use period::{PeriodLabel, ALL_PERIODS};
