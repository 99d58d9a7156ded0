//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! シート単位の失敗はここには現れません。パイプラインの境界で
//! [`SkipReason`](crate::SkipReason)に格下げされ、実行は継続します。

use thiserror::Error;

/// xlsxmeltクレート全体で使用するエラー型
///
/// 実行全体を中断する（fatal）エラーだけを表します。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み失敗、出力先の作成失敗など）
/// - `Parse`: Excelファイルの解析中に発生したエラー（calamine由来）
/// - `Config`: 設定の検証に失敗したエラー
/// - `NoInput`: 入力パスがワークブックに一つも解決されなかったエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxmelt::XlsxMeltError;
/// use std::fs::File;
///
/// fn open_statement(path: &str) -> Result<(), XlsxMeltError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxMeltError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// ファイル形式が不正、破損したファイル、サポートされていない形式などが
    /// 原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー（スタイルID、行番号など）
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XML（styles.xml、ワークシートXMLなど）の解析エラー
    #[error("XML parse error in '{part}': {message}")]
    Xml {
        /// 解析に失敗したパーツ名（例: `xl/styles.xml`）
        part: String,
        /// エラーの詳細
        message: String,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `PipelineBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxmelt::{PipelineBuilder, MetadataStrategy, XlsxMeltError};
    ///
    /// let result = PipelineBuilder::new()
    ///     .with_metadata_strategy(MetadataStrategy::leading_rows(["Company", "Company"]))
    ///     .build();
    ///
    /// match result {
    ///     Err(XlsxMeltError::Config(msg)) => println!("設定エラー: {}", msg),
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 入力パス・パターンがワークブックに解決されなかったエラー
    #[error("No workbook found for input: {0}")]
    NoInput(String),

    /// globパターンが不正なエラー
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// CSV出力中のエラー
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSONの入出力エラー（設定ファイル、JSON Lines出力）
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxMeltError {
    /// XMLパーツ名とメッセージから`Xml`エラーを生成
    pub(crate) fn xml(part: &str, message: impl std::fmt::Display) -> Self {
        XlsxMeltError::Xml {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}
