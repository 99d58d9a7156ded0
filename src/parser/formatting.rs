//! XML Formatting Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できないフォント情報を抽出するモジュール。
//! シート名からワークシートXMLへの対応付け、フォントの太字フラグ、
//! セルスタイル（cellXfs）からフォントへの対応付けを提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::XlsxMeltError;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::CellFont;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PART: &str = "xl/styles.xml";

/// XLSX書式パーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、セルのフォント情報を取得します。
/// ワークシートXMLは`column_fonts`の呼び出し時に読み込みます。
pub(crate) struct XlsxFormattingParser<R: Read + Seek> {
    archive: ZipArchive<R>,
    /// シート名 -> ワークシートXMLのパス
    sheet_parts: HashMap<String, String>,
    /// fontId -> 太字フラグ
    bold_fonts: Vec<bool>,
    /// styleId（cellXfsのインデックス） -> fontId
    cell_xf_fonts: Vec<u32>,
}

impl<R: Read + Seek> XlsxFormattingParser<R> {
    /// XLSXファイル（ZIPアーカイブ）を開き、スタイル情報を解析
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxFormattingParser)` - 解析に成功した場合
    /// * `Err(XlsxMeltError)` - ZIP・XMLの解析エラー、またはセキュリティ制限違反
    pub fn new(reader: R, security: &SecurityConfig) -> Result<Self, XlsxMeltError> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| XlsxMeltError::Zip(e.to_string()))?;
        security.check_archive(&mut archive)?;

        let sheet_parts = Self::parse_sheet_parts(&mut archive)?;
        let (bold_fonts, cell_xf_fonts) = match read_part(&mut archive, STYLES_PART)? {
            Some(xml) => parse_styles(&xml)?,
            None => (Vec::new(), Vec::new()),
        };

        debug!(
            sheets = sheet_parts.len(),
            fonts = bold_fonts.len(),
            cell_xfs = cell_xf_fonts.len(),
            "parsed workbook formatting"
        );

        Ok(Self {
            archive,
            sheet_parts,
            bold_fonts,
            cell_xf_fonts,
        })
    }

    /// styleIdの太字フラグを取得（スタイルまたはフォントが見つからない場合は`None`）
    pub fn is_bold_style(&self, style_id: u32) -> Option<bool> {
        self.cell_xf_fonts
            .get(style_id as usize)
            .and_then(|&font_id| self.bold_fonts.get(font_id as usize))
            .copied()
    }

    /// 指定した列（0始まり）にあるセルのフォント情報を取得
    ///
    /// ワークシートXMLが見つからない場合は空のリストを返します
    /// （すべての行が太字でないものとして扱われます）。
    pub fn column_fonts(&mut self, sheet: &str, column: u32) -> Result<Vec<CellFont>, XlsxMeltError> {
        let Some(part) = self.sheet_parts.get(sheet).cloned() else {
            warn!(sheet, "worksheet part not found; bold detection disabled");
            return Ok(Vec::new());
        };
        let Some(xml) = read_part(&mut self.archive, &part)? else {
            warn!(sheet, part = %part, "worksheet part missing from archive");
            return Ok(Vec::new());
        };

        let styles = parse_column_styles(&xml, &part, column)?;
        Ok(styles
            .into_iter()
            .map(|(row, style)| CellFont::new(row, self.is_bold_style(style)))
            .collect())
    }

    /// xl/workbook.xml と xl/_rels/workbook.xml.rels からシート名とパスを対応付ける
    fn parse_sheet_parts(
        archive: &mut ZipArchive<R>,
    ) -> Result<HashMap<String, String>, XlsxMeltError> {
        let Some(workbook_xml) = read_part(archive, WORKBOOK_PART)? else {
            return Ok(HashMap::new());
        };
        let relationships = match read_part(archive, WORKBOOK_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let mut sheet_parts = HashMap::new();
        for (name, rel_id) in parse_workbook_sheets(&workbook_xml)? {
            let Some(target) = relationships.get(&rel_id) else {
                warn!(sheet = %name, rel_id = %rel_id, "sheet relationship not found");
                continue;
            };
            let part = resolve_target(target);
            validate_zip_path(&part).map_err(|e| {
                XlsxMeltError::SecurityViolation(format!("Invalid sheet target: {}", e))
            })?;
            sheet_parts.insert(name, part);
        }
        Ok(sheet_parts)
    }
}

/// ZIP内のパーツを読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxMeltError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(XlsxMeltError::Zip(e.to_string())),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// リレーションシップのターゲットをアーカイブ内のパスに変換
///
/// 絶対パス（`/xl/worksheets/sheet1.xml`）と`xl/`からの相対パスの両方を受け付けます。
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// 属性値を取得（エスケープ解除済み）
fn attribute(e: &BytesStart<'_>, part: &str, key: &[u8]) -> Result<Option<String>, XlsxMeltError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XlsxMeltError::xml(part, err))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| XlsxMeltError::xml(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `<sheet name="..." r:id="..."/>` の一覧を文書順で返す
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, XlsxMeltError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| XlsxMeltError::xml(WORKBOOK_PART, err))?;
                    let key = attr.key.as_ref();
                    if key == b"name" {
                        name = Some(
                            attr.unescape_value()
                                .map_err(|err| XlsxMeltError::xml(WORKBOOK_PART, err))?
                                .into_owned(),
                        );
                    } else if key.ends_with(b":id") {
                        // 名前空間プレフィックスは通常`r`
                        rel_id = Some(std::str::from_utf8(&attr.value)?.to_string());
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxMeltError::xml(WORKBOOK_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxMeltError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, WORKBOOK_RELS_PART, b"Id")?;
                let target = attribute(&e, WORKBOOK_RELS_PART, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxMeltError::xml(WORKBOOK_RELS_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// `<b>`要素の`val`属性を太字フラグに変換
fn bold_flag(e: &BytesStart<'_>) -> Result<bool, XlsxMeltError> {
    Ok(match attribute(e, STYLES_PART, b"val")?.as_deref() {
        Some("0") | Some("false") => false,
        _ => true,
    })
}

/// xl/styles.xml の解析
///
/// `<fonts>`内の各`<font>`の太字フラグと、`<cellXfs>`内の各`<xf>`のfontIdを返します。
/// `<cellStyleXfs>`や`<dxfs>`内の要素は対象外です。
fn parse_styles(xml: &[u8]) -> Result<(Vec<bool>, Vec<u32>), XlsxMeltError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut bold_fonts = Vec::new();
    let mut cell_xf_fonts = Vec::new();
    let mut in_fonts = false;
    let mut in_cell_xfs = false;
    let mut current_font: Option<bool> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = true,
                b"font" if in_fonts => current_font = Some(false),
                b"b" if current_font.is_some() => current_font = Some(bold_flag(&e)?),
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => cell_xf_fonts.push(font_id(&e)?),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"font" if in_fonts => bold_fonts.push(false),
                b"b" if current_font.is_some() => current_font = Some(bold_flag(&e)?),
                b"xf" if in_cell_xfs => cell_xf_fonts.push(font_id(&e)?),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = false,
                b"font" => {
                    if let Some(bold) = current_font.take() {
                        bold_fonts.push(bold);
                    }
                }
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxMeltError::xml(STYLES_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((bold_fonts, cell_xf_fonts))
}

/// `<xf fontId="...">`のfontId（省略時は0）
fn font_id(e: &BytesStart<'_>) -> Result<u32, XlsxMeltError> {
    match attribute(e, STYLES_PART, b"fontId")? {
        Some(id) => Ok(id.parse()?),
        None => Ok(0),
    }
}

/// ワークシートXMLから指定列のセルの(行番号, styleId)を抽出
///
/// 行番号は1始まりです。`r`属性のない行・セルは直前の位置の次として扱い、
/// `s`属性のないセルはstyleId 0とします。
fn parse_column_styles(xml: &[u8], part: &str, column: u32) -> Result<Vec<(u32, u32)>, XlsxMeltError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut styles = Vec::new();
    let mut current_row = 0u32;
    let mut next_col = 0u32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = match attribute(&e, part, b"r")? {
                        Some(r) => r.parse()?,
                        None => current_row + 1,
                    };
                    next_col = 0;
                }
                b"c" => {
                    let mut col = next_col;
                    let mut row = current_row;
                    let mut style = 0u32;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|err| XlsxMeltError::xml(part, err))?;
                        match attr.key.as_ref() {
                            b"r" => {
                                if let Some((r, c)) = parse_cell_ref(std::str::from_utf8(&attr.value)?) {
                                    row = r;
                                    col = c;
                                }
                            }
                            b"s" => style = std::str::from_utf8(&attr.value)?.parse()?,
                            _ => {}
                        }
                    }
                    next_col = col + 1;
                    if col == column {
                        styles.push((row, style));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxMeltError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// セル参照文字列を(行番号（1始まり）, 列インデックス（0始まり）)に変換（例: "B3" -> (3, 1)）
fn parse_cell_ref(ref_str: &str) -> Option<(u32, u32)> {
    let split = ref_str.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = ref_str.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    // A=1, B=2, ..., Z=26, AA=27, ...
    let col = letters
        .chars()
        .try_fold(0u32, |acc, ch| {
            let val = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            acc.checked_mul(26)?.checked_add(val)
        })?;
    let row = digits.parse::<u32>().ok()?;
    if row == 0 {
        return None;
    }

    Some((row, col - 1))
}
