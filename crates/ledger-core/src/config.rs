// ledger-core/src/config.rs
//! 配置模块

use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// 收文登记配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LedgerConfig {
    /// 监控根目录，收文目录文件直接放在它下面
    pub watch_root: PathBuf,
    /// 可识别的两位年份目录名
    pub years: Vec<String>,
    /// 收文目录文件名中 `20YY` 之后的部分
    pub ledger_suffix: String,
    /// 只支持 OOXML 工作簿；旧版 `.xls` 目录只会被识别并跳过
    #[serde(deserialize_with = "ooxml_extension")]
    pub ledger_extension: String,
    /// 查找工作表时跳过的默认占位表
    pub placeholder_sheet: String,
    /// 表头最多在前多少行内查找
    pub header_scan_rows: usize,
    pub category_codes: CategoryCodes,
    pub policy: PolicyConfig,
    pub retry: RetryConfig,
    pub ignore: IgnoreConfig,
}

/// 分类 → 自编号前缀 对照表
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CategoryCodes {
    /// 未登记分类使用的前缀
    pub default: String,
    /// 用户配置的条目覆盖或追加到内置对照表上
    #[serde(deserialize_with = "merge_over_builtin")]
    pub codes: BTreeMap<String, String>,
}

/// 历代实现之间有分歧的规则，做成可选项
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolicyConfig {
    pub date_source: DateSource,
    pub dedup: DedupPolicy,
    pub identifier: IdentifierScheme,
}

/// 收文日期取值来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    /// 登记当天
    #[default]
    Today,
    /// 文件修改时间
    FileModified,
}

/// 判断“已登记”的依据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// 先比对文号，再比对路径/文件名
    #[default]
    DocumentNumberFirst,
    /// 只比对路径/文件名
    PathOnly,
}

/// 自编号生成方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierScheme {
    /// 按分类对照表取前缀，`前缀-年份-序号`
    #[default]
    CategoryCode,
    /// 从表中已有自编号推断前缀和位数
    InferredPrefix,
}

/// 重试配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
    /// 正式更新前等待文件解锁的最长时间
    pub preflight_wait_ms: u64,
    pub preflight_poll_ms: u64,
}

/// 事件过滤配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IgnoreConfig {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub names: Vec<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            watch_root: PathBuf::from("."),
            years: vec!["25".to_string(), "26".to_string()],
            ledger_suffix: "工区收文目录".to_string(),
            ledger_extension: "xlsx".to_string(),
            placeholder_sheet: "Sheet1".to_string(),
            header_scan_rows: 50,
            category_codes: CategoryCodes::default(),
            policy: PolicyConfig::default(),
            retry: RetryConfig::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

fn builtin_codes() -> BTreeMap<String, String> {
    [("上级文", "SJW"), ("其他", "QT"), ("事项通知", "SXTZ")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn merge_over_builtin<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let user = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut codes = builtin_codes();
    codes.extend(user);
    Ok(codes)
}

/// 能按 OOXML 压缩包改写的扩展名
pub fn is_ooxml_extension(extension: &str) -> bool {
    ["xlsx", "xlsm"]
        .iter()
        .any(|e| e.eq_ignore_ascii_case(extension.trim_start_matches('.')))
}

fn ooxml_extension<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let extension = String::deserialize(deserializer)?;
    if !is_ooxml_extension(&extension) {
        return Err(de::Error::custom(format!(
            "不支持的收文目录格式 \"{extension}\"：只能写入 xlsx/xlsm，旧版 xls 请先另存为 xlsx"
        )));
    }
    Ok(extension.trim_start_matches('.').to_string())
}

impl Default for CategoryCodes {
    fn default() -> Self {
        Self {
            default: "QT".to_string(),
            codes: builtin_codes(),
        }
    }
}

impl CategoryCodes {
    /// 查分类前缀，未登记的分类返回默认前缀
    pub fn code_for(&self, category: &str) -> &str {
        self.codes
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 8,
            delay_ms: 1000,
            preflight_wait_ms: 5000,
            preflight_poll_ms: 500,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn preflight_wait(&self) -> Duration {
        Duration::from_millis(self.preflight_wait_ms)
    }

    pub fn preflight_poll(&self) -> Duration {
        Duration::from_millis(self.preflight_poll_ms.max(1))
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["~$".to_string()],
            suffixes: vec![".tmp".to_string()],
            names: vec![],
        }
    }
}

impl LedgerConfig {
    pub fn with_watch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.watch_root = root.into();
        self
    }

    /// 两位年份对应的收文目录文件名，例如 `2026工区收文目录.xlsx`
    pub fn ledger_file_name(&self, year_two: &str) -> String {
        format!("20{}{}.{}", year_two, self.ledger_suffix, self.ledger_extension)
    }
}
