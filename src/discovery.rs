//! Input Discovery Module
//!
//! 入力引数（ファイル、ディレクトリ、globパターン）を処理対象の
//! ワークブックのパスに解決します。

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::XlsxMeltError;

/// 処理対象とする拡張子（小文字）
const WORKBOOK_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// Excelが編集中に作成するロックファイルの接頭辞
const LOCK_FILE_PREFIX: &str = "~$";

/// ワークブックとして扱うファイルかどうか
fn is_workbook(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOCK_FILE_PREFIX));
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    has_extension && !is_lock_file
}

fn has_glob_meta(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// ディレクトリ直下のワークブック（再帰なし）
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, XlsxMeltError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_workbook(&path) {
            found.push(path);
        }
    }
    Ok(found)
}

/// 入力引数をワークブックのパスに解決
///
/// * ファイル: 拡張子に関係なくそのまま対象にする
/// * ディレクトリ: 直下の`*.xlsx`/`*.xlsm`（ロックファイル`~$*`を除く）
/// * globパターン: 一致したファイルのうちワークブックであるもの
///
/// 結果はソート済みで重複を含みません。
///
/// # エラー
///
/// * `XlsxMeltError::Pattern` - globパターンが不正な場合
/// * `XlsxMeltError::NoInput` - ワークブックが1つも見つからない場合
pub fn discover_workbooks<I, S>(inputs: I) -> Result<Vec<PathBuf>, XlsxMeltError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut found = BTreeSet::new();
    let mut requested = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        requested.push(input.to_string());
        let path = Path::new(input);

        let matches = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            scan_directory(path)?
        } else if has_glob_meta(input) {
            let mut matches = Vec::new();
            for entry in glob::glob(input)? {
                match entry {
                    Ok(path) if path.is_file() && is_workbook(&path) => matches.push(path),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "unreadable glob match"),
                }
            }
            matches
        } else {
            warn!(input, "input does not exist");
            Vec::new()
        };

        debug!(input, matches = matches.len(), "resolved input");
        found.extend(matches);
    }

    if found.is_empty() {
        return Err(XlsxMeltError::NoInput(requested.join(", ")));
    }
    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn test_is_workbook() {
        assert!(is_workbook(Path::new("a/fy23.xlsx")));
        assert!(is_workbook(Path::new("FY23.XLSM")));
        assert!(!is_workbook(Path::new("a/~$fy23.xlsx")));
        assert!(!is_workbook(Path::new("notes.csv")));
        assert!(!is_workbook(Path::new("xlsx")));
    }

    #[test]
    fn test_directory_scan_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let b = touch(dir.path(), "b.xlsx");
        let a = touch(dir.path(), "a.xlsm");
        touch(dir.path(), "~$a.xlsx");
        touch(dir.path(), "readme.txt");
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "c.xlsx");

        let found = discover_workbooks([dir.path().to_str().unwrap()]).unwrap();
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn test_glob_and_file_inputs_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.xlsx");
        let b = touch(dir.path(), "b.xlsx");

        let pattern = format!("{}/*.xlsx", dir.path().display());
        let found =
            discover_workbooks([pattern.as_str(), a.to_str().unwrap()]).unwrap();
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn test_no_input_is_error() {
        let dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.xlsx", dir.path().display());
        let result = discover_workbooks([pattern.as_str()]);
        assert!(matches!(result, Err(XlsxMeltError::NoInput(_))));

        let result = discover_workbooks(["definitely/missing/file.xlsx"]);
        assert!(matches!(result, Err(XlsxMeltError::NoInput(_))));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let result = discover_workbooks(["data/[.xlsx"]);
        assert!(matches!(result, Err(XlsxMeltError::Pattern(_))));
    }
}
