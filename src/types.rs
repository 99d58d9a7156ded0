//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! セル値、シートメタデータ、行レコード、ロング形式レコードを提供します。

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

/// メタデータのキー: ワークブック名（ファイル名）
pub const WORKBOOK_NAME_KEY: &str = "Workbook Name";

/// メタデータのキー: シート名
pub const SHEET_NAME_KEY: &str = "Sheet Name";

/// セルの値を表す列挙型
///
/// 数式は評価されず、キャッシュされた計算結果だけを保持します。
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 日時
    DateTime(NaiveDateTime),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 値が空、または空白文字だけの文字列かどうかを判定
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 文字列セルの場合のみ、前後の空白を除いた文字列を返す
    pub fn as_trimmed_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.trim()),
            _ => None,
        }
    }

    /// 値をフラットな文字列表現に変換（重複判定・出力で共通）
    ///
    /// 整数値の数値は小数点なしで出力します（例: `100.0` → `"100"`）。
    pub fn as_raw_string(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_raw_string())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// 識別列のセル1つ分のフォント情報
///
/// `bold`が`None`の場合はフォント情報を取得できなかったことを表します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFont {
    /// スプレッドシートの行番号（1始まり）
    pub row: u32,
    /// 太字フラグ
    pub bold: Option<bool>,
}

impl CellFont {
    pub fn new(row: u32, bold: Option<bool>) -> Self {
        Self { row, bold }
    }
}

/// シートのメタデータ
///
/// 宣言順を保持するキーと値のペアのリストです。作成後に変更されることはありません。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetMetadata {
    entries: Vec<(String, Option<CellValue>)>,
}

impl SheetMetadata {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: impl Into<String>, value: Option<CellValue>) {
        self.entries.push((key.into(), value));
    }

    /// キーに対応する値を取得（キーが存在しない、または値が欠損の場合は`None`）
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// キーが存在するかを判定
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// 宣言順でエントリを走査
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&CellValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// エントリ数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// ワークブック名
    pub fn workbook_name(&self) -> Option<String> {
        self.get(WORKBOOK_NAME_KEY).map(CellValue::as_raw_string)
    }

    /// シート名
    pub fn sheet_name(&self) -> Option<String> {
        self.get(SHEET_NAME_KEY).map(CellValue::as_raw_string)
    }
}

/// 本体行1行分の生レコード
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// スプレッドシートの行番号（1始まり）
    pub row_number: u32,
    /// 識別列のセルが太字かどうか
    pub is_bold: bool,
    /// 識別列の値（前後の空白を除去、文字列以外は空文字列）
    pub label: String,
    /// 値列のセル値（列リストと位置で対応）
    pub values: Vec<CellValue>,
}

/// サブヘッダーが割り当てられた行レコード
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub row: RawRow,
    pub sub_header: Option<String>,
}

/// ロング形式レコード（出力の最小単位）
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub sub_header: Option<String>,
    pub financial_metric: String,
    /// 元の列名（例: `Q1 FY23`）
    pub period_label: String,
    pub quarter: Option<String>,
    pub fiscal_year: Option<String>,
    pub financial_amount: CellValue,
    /// シート単位で共有されるメタデータ
    pub metadata: Arc<SheetMetadata>,
}
