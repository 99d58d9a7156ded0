//! Bold-Row Detector
//!
//! 識別列のフォント情報から、太字の行番号（1始まり）の集合を求めます。
//! 文書構造を推定する唯一の手がかりで、インデントや値のパターンは使いません。

use std::collections::BTreeSet;

use crate::types::CellFont;

/// 明示的に太字が指定されたセルの行番号を返す
///
/// フォント情報がないセル、または太字でないフォントのセルは含みません。
pub fn detect_bold_rows<'a, I>(fonts: I) -> BTreeSet<u32>
where
    I: IntoIterator<Item = &'a CellFont>,
{
    fonts
        .into_iter()
        .filter(|font| font.bold == Some(true))
        .map(|font| font.row)
        .collect()
}
