//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。
//! すべての設定値は`serde`で（デ）シリアライズでき、JSON設定ファイルから読み込めます。

use serde::{Deserialize, Serialize};

/// 太字行（サブヘッダー行）自身の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum BoldRowPolicy {
    /// 太字行もメトリック行として残す（デフォルト）
    ///
    /// 期間列に値を持つ太字行（例: 合計行）はレコードを出力します。
    /// 値を持たない見出し行は、空の金額が除外されるため結果に現れません。
    Keep,

    /// 太字行をメトリックのストリームから除外
    Drop,
}

/// 期間ラベルとして解釈できない列の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PeriodColumnPolicy {
    /// 四半期・年度を空にしてロング形式に展開する（デフォルト）
    ///
    /// 命名がわずかに異なる末尾の列を黙って失わないための既定値です。
    MeltThrough,

    /// 展開前に列を除外
    Drop,
}

/// サブヘッダーを継承する方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SubHeaderDirection {
    /// 下から上へ走査し、各行にその行以下で最も近い太字行を割り当てる（デフォルト）
    ///
    /// 太字の合計行がセクションの末尾にある財務諸表向けです。
    Below,

    /// 上から下へ走査し、各行にその行以上で最も近い太字行を割り当てる
    ///
    /// 太字の見出しが明細の前に置かれる財務諸表向けです。
    Above,
}

/// シート選択方式
///
/// 一致しないシートはエラーにせず、処理対象から外します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SheetSelector {
    /// すべてのシートを処理（デフォルト）
    All,

    /// インデックス指定（0始まり）
    Index(usize),

    /// シート名指定（完全一致）
    Name(String),

    /// 複数のシート名指定
    Names(Vec<String>),

    /// シート名に部分文字列を含むシート
    ///
    /// 例: `SheetSelector::Contains("P&L".to_string())`
    Contains(String),
}

impl SheetSelector {
    /// シートが選択対象かを判定
    ///
    /// # 引数
    ///
    /// * `index` - シートインデックス（0始まり）
    /// * `name` - シート名
    pub fn matches(&self, index: usize, name: &str) -> bool {
        match self {
            SheetSelector::All => true,
            SheetSelector::Index(i) => *i == index,
            SheetSelector::Name(n) => n == name,
            SheetSelector::Names(names) => names.iter().any(|n| n == name),
            SheetSelector::Contains(needle) => name.contains(needle.as_str()),
        }
    }
}

/// 固定座標から読み取るメタデータフィールド
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCell {
    /// 出力列名
    pub name: String,
    /// 行番号（1始まり）
    pub row: u32,
    /// 列番号（1始まり、A列 = 1）
    pub col: u32,
}

impl MetadataCell {
    pub fn new(name: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            name: name.into(),
            row,
            col,
        }
    }
}

/// シートメタデータの読み取り方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MetadataStrategy {
    /// 先頭N行のA列をN個のフィールドとして読む（デフォルト: `Meta 1`〜`Meta 8`）
    ///
    /// `fields[i]`は`i + 1`行目のA列の値になります。
    LeadingRows { fields: Vec<String> },

    /// フィールドごとに固定のセル座標から読む
    FixedCells { cells: Vec<MetadataCell> },
}

impl MetadataStrategy {
    /// 既定のフィールド数
    pub const DEFAULT_FIELD_COUNT: usize = 8;

    /// 指定したフィールド名で`LeadingRows`を生成
    pub fn leading_rows<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetadataStrategy::LeadingRows {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// `Meta 1`〜`Meta {count}`の名前で`LeadingRows`を生成
    pub fn numbered(count: usize) -> Self {
        Self::leading_rows((1..=count).map(|i| format!("Meta {}", i)))
    }

    /// 宣言順のフィールド名
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            MetadataStrategy::LeadingRows { fields } => fields.iter().map(String::as_str).collect(),
            MetadataStrategy::FixedCells { cells } => {
                cells.iter().map(|c| c.name.as_str()).collect()
            }
        }
    }
}

impl Default for MetadataStrategy {
    fn default() -> Self {
        Self::numbered(Self::DEFAULT_FIELD_COUNT)
    }
}

/// 出力フォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OutputFormat {
    /// CSV形式（デフォルト）
    ///
    /// # 出力例
    ///
    /// ```csv
    /// Financial Metric,Financial Amount,Sub-Header,Quarter,Fiscal Year,Workbook Name,...
    /// Product A,100,Revenue,Q1,2023,fy23.xlsx,...
    /// ```
    Csv,

    /// JSON Lines形式
    ///
    /// 1レコード1行のJSONオブジェクトで出力します。キーの順序はCSVの列順と同じです。
    JsonLines,
}
