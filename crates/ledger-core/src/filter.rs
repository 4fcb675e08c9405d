// ledger-core/src/filter.rs
//! 事件过滤：目录、临时文件、收文目录本身和程序自身不参与登记

use std::path::Path;

use crate::config::LedgerConfig;
use crate::locate::is_ledger_name;

/// 按文件名判断是否忽略（不访问文件系统）
pub fn is_ignored_name(config: &LedgerConfig, file_name: &str) -> bool {
    if file_name.is_empty() {
        return true;
    }
    let lower = file_name.to_lowercase();
    config.ignore.prefixes.iter().any(|p| file_name.starts_with(p.as_str()))
        || config
            .ignore
            .suffixes
            .iter()
            .any(|s| lower.ends_with(&s.to_lowercase()))
        || config.ignore.names.iter().any(|n| n == file_name)
        || is_ledger_name(config, file_name)
}

/// 判断一个路径是否应跳过
pub fn is_ignored(config: &LedgerConfig, path: &Path) -> bool {
    if path.is_dir() {
        return true;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    is_ignored_name(config, &name)
}
