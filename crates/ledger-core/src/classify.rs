// ledger-core/src/classify.rs
//! 路径分类：从文件路径推断年份目录和分类名

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// 去掉分类文件夹前面的序号，如 `1-上级文`、`10－事项通知`
static RE_ORDINAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*[-－]\s*").expect("valid ordinal prefix regex"));

/// 一次登记过程中被处理的文件
#[derive(Debug, Clone)]
pub struct WatchedFile {
    pub path: PathBuf,
    /// 相对监控根目录的路径，统一用 `/` 分隔
    pub relative: String,
    pub file_name: String,
    pub modified: Option<SystemTime>,
}

impl WatchedFile {
    pub fn new(path: &Path, watch_root: &Path) -> Self {
        let relative = path
            .strip_prefix(watch_root)
            .map(slash_path)
            .unwrap_or_else(|_| slash_path(path));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();

        Self {
            path: path.to_path_buf(),
            relative,
            file_name,
            modified,
        }
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 在路径各级目录中找第一个与已知年份完全相同的片段
pub fn year_of<'a>(path: &Path, years: &'a [String]) -> Option<&'a str> {
    path.components().find_map(|c| match c {
        Component::Normal(part) => {
            let part = part.to_string_lossy();
            years.iter().find(|y| **y == part).map(String::as_str)
        }
        _ => None,
    })
}

/// 取监控根目录下第一级文件夹作为分类名
///
/// 文件直接位于分类文件夹下（没有年份子目录）时返回 `None`。
pub fn category_of(path: &Path, watch_root: &Path) -> Option<String> {
    let relative = path.strip_prefix(watch_root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.len() < 2 {
        return None;
    }

    let folder = &parts[0];
    let label = RE_ORDINAL_PREFIX.replace(folder, "");
    let label = label.trim();
    if label.is_empty() {
        Some(folder.clone())
    } else {
        Some(label.to_string())
    }
}
