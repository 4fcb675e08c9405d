// ledger-core/src/locate.rs
//! 定位收文目录文件及其中的分类工作表

use std::path::{Path, PathBuf};

use crate::config::{LedgerConfig, is_ooxml_extension};

/// 查找收文目录文件的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLookup {
    Found(PathBuf),
    /// 只找到旧版 `.xls` 文件
    Legacy(PathBuf),
    Missing(String),
}

/// 根据两位年份定位收文目录文件（直接位于监控根目录下）
pub fn ledger_for(config: &LedgerConfig, year_two: &str) -> LedgerLookup {
    let name = config.ledger_file_name(year_two);
    let path = config.watch_root.join(&name);
    if path.is_file() {
        if !is_ooxml_extension(&config.ledger_extension) {
            return LedgerLookup::Legacy(path);
        }
        return LedgerLookup::Found(path);
    }

    let legacy = path.with_extension("xls");
    if legacy != path && legacy.is_file() {
        return LedgerLookup::Legacy(legacy);
    }

    LedgerLookup::Missing(name)
}

/// 判断文件名是否是某一年的收文目录（含旧版 `.xls`）
pub fn is_ledger_name(config: &LedgerConfig, file_name: &str) -> bool {
    let Some(stem) = Path::new(file_name).file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(year_part) = stem.strip_prefix("20") else {
        return false;
    };
    config
        .years
        .iter()
        .any(|y| year_part.strip_prefix(y.as_str()) == Some(config.ledger_suffix.as_str()))
}

/// 按分类名查找工作表序号
///
/// 名称完全相同立即命中；否则在包含分类名的工作表中取名字最短的，
/// 名字一样长时取靠前的。
pub fn sheet_index_for(sheet_names: &[String], category: &str, placeholder: &str) -> Option<usize> {
    if category.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    for (i, name) in sheet_names.iter().enumerate() {
        if name == placeholder {
            continue;
        }
        if name == category {
            return Some(i);
        }
        if name.contains(category) {
            let len = name.chars().count();
            if best.is_none_or(|(best_len, _)| len < best_len) {
                best = Some((len, i));
            }
        }
    }
    best.map(|(_, i)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&["Sheet1", "上级文", "上级文（归档）"], "上级文", Some(1))]
    #[case(&["上级文收文登记表", "上级文（归档）", "其他"], "上级文", Some(1))]
    #[case(&["上级文甲", "上级文乙"], "上级文", Some(0))]
    #[case(&["上级文收文登记表", "上级文"], "上级文", Some(1))]
    #[case(&["Sheet1", "其他"], "Sheet1", None)]
    #[case(&["其他", "事项通知"], "上级文", None)]
    #[case(&["其他"], "", None)]
    fn test_sheet_index_for(
        #[case] sheets: &[&str],
        #[case] category: &str,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(sheet_index_for(&names(sheets), category, "Sheet1"), expected);
    }

    #[test]
    fn test_ledger_for_finds_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LedgerConfig::default().with_watch_root(dir.path());
        fs::write(dir.path().join("2026工区收文目录.xlsx"), b"x").unwrap();

        assert_eq!(
            ledger_for(&cfg, "26"),
            LedgerLookup::Found(dir.path().join("2026工区收文目录.xlsx"))
        );
        assert_eq!(
            ledger_for(&cfg, "25"),
            LedgerLookup::Missing("2025工区收文目录.xlsx".to_string())
        );
    }

    #[test]
    fn test_ledger_for_reports_legacy_format() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LedgerConfig::default().with_watch_root(dir.path());
        fs::write(dir.path().join("2025工区收文目录.xls"), b"x").unwrap();

        assert_eq!(
            ledger_for(&cfg, "25"),
            LedgerLookup::Legacy(dir.path().join("2025工区收文目录.xls"))
        );
    }

    #[test]
    fn test_configured_legacy_extension_is_never_opened() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = LedgerConfig::default().with_watch_root(dir.path());
        cfg.ledger_extension = "xls".to_string();
        fs::write(dir.path().join("2026工区收文目录.xls"), b"x").unwrap();

        assert_eq!(
            ledger_for(&cfg, "26"),
            LedgerLookup::Legacy(dir.path().join("2026工区收文目录.xls"))
        );
    }

    #[rstest]
    #[case("2026工区收文目录.xlsx", true)]
    #[case("2025工区收文目录.xls", true)]
    #[case("2024工区收文目录.xlsx", false)]
    #[case("2026工区收文目录（备份）.xlsx", false)]
    #[case("通知.doc", false)]
    fn test_is_ledger_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_ledger_name(&LedgerConfig::default(), name), expected);
    }
}
