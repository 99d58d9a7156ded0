//! Workbook Reader Module
//!
//! calamineのラッパーとして、XLSXファイルを`WorkbookSource`として提供します。
//! セルの値はcalamineから、フォント情報は`XlsxFormattingParser`から取得します。

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use tracing::{debug, instrument};

use crate::error::XlsxMeltError;
use crate::grid::SheetGrid;
use crate::parser::XlsxFormattingParser;
use crate::security::SecurityConfig;
use crate::source::WorkbookSource;
use crate::types::{CellFont, CellValue};

/// ZIPローカルファイルヘッダーのシグネチャ
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// XLSXワークブック
///
/// ファイル全体をメモリに読み込み、calamineと書式パーサーで共有します。
pub struct XlsxWorkbook {
    name: String,
    workbook: Xlsx<Cursor<Vec<u8>>>,
    formatting: XlsxFormattingParser<Cursor<Vec<u8>>>,
}

impl XlsxWorkbook {
    /// リーダーからワークブックを開く
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルを読み込むためのリーダー
    /// * `name` - ワークブック名（出力の`Workbook Name`列に使用）
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxWorkbook)` - ワークブックの読み込みに成功した場合
    /// * `Err(XlsxMeltError)` - 破損したファイル、XLSX以外の形式、セキュリティ制限違反
    pub fn open<R: Read>(mut reader: R, name: impl Into<String>) -> Result<Self, XlsxMeltError> {
        let security = SecurityConfig::default();

        let mut buffer = Vec::new();
        let bytes_read = reader.read_to_end(&mut buffer)?;
        security.check_input_size(bytes_read as u64)?;

        // ZIPアーカイブはcalamineに渡す前にセキュリティチェックを通す
        let checked = if buffer.starts_with(ZIP_MAGIC) {
            Some(XlsxFormattingParser::new(Cursor::new(buffer.clone()), &security)?)
        } else {
            None
        };

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer.clone()))?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxMeltError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        let formatting = match checked {
            Some(formatting) => formatting,
            None => XlsxFormattingParser::new(Cursor::new(buffer), &security)?,
        };

        Ok(Self {
            name: name.into(),
            workbook,
            formatting,
        })
    }

    /// ファイルパスからワークブックを開く（ワークブック名はファイル名）
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, XlsxMeltError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        SecurityConfig::default().check_input_size(file.metadata()?.len())?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::open(file, name)
    }

    /// シートの値をA1起点のグリッドとして読み取る
    ///
    /// calamineのRangeは使用範囲の左上から始まるため、
    /// 絶対座標で読み直して先頭の空行・空列を復元します。
    fn grid_from_range(range: &calamine::Range<Data>) -> SheetGrid {
        let Some((end_row, end_col)) = range.end() else {
            return SheetGrid::default();
        };

        let rows = (0..=end_row)
            .map(|row| {
                (0..=end_col)
                    .map(|col| {
                        range
                            .get_value((row, col))
                            .map(convert_cell)
                            .unwrap_or(CellValue::Empty)
                    })
                    .collect()
            })
            .collect();
        SheetGrid::from_rows(rows)
    }
}

/// calamineのセル値を`CellValue`に変換
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Empty => CellValue::Empty,
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn workbook_name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    fn read_grid(&mut self, sheet: &str) -> Result<SheetGrid, XlsxMeltError> {
        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(|e| XlsxMeltError::Parse(e.into()))?;
        let grid = Self::grid_from_range(&range);
        debug!(
            sheet,
            rows = grid.row_count(),
            cols = grid.col_count(),
            "read sheet grid"
        );
        Ok(grid)
    }

    fn column_fonts(&mut self, sheet: &str, column: u32) -> Result<Vec<CellFont>, XlsxMeltError> {
        self.formatting.column_fonts(sheet, column)
    }
}
