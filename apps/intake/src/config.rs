use crate::error::Result;
use ledger_core::LedgerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 用户配置文件内容。所有项都可省略，省略时监控程序所在目录。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// 监控根目录，未配置时为程序所在目录
    pub watch_root: Option<PathBuf>,
    #[serde(flatten)]
    pub ledger: LedgerConfig,
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        Ok(user_config)
    }

    pub fn load() -> Result<Config> {
        let config_path = config::config_dir().join(config::constants::CONFIG_FILE_NAME);

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => Self::load_str(&user_config_str),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 配置文件不存在，创建示例配置文件
                Self::create_example_config(&config_path)?;
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 生成登记用的完整配置：确定监控根目录，并把程序自身加入忽略列表
    pub fn into_ledger_config(self) -> LedgerConfig {
        let root = config::resolve_watch_root(self.watch_root.as_deref());
        let mut ledger = self.ledger.with_watch_root(root);
        if let Some(exe) = config::executable_name() {
            if !ledger.ignore.names.contains(&exe) {
                ledger.ignore.names.push(exe);
            }
        }
        ledger
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        use std::io::Write;

        // 确保配置目录存在
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example_config = r#"# 收文目录自动登记 配置文件
#
# 此文件在首次运行时自动创建，所有项都可省略
# 配置修改后重启生效

# 配置目录可用环境变量 INTAKE_CONFIG_DIR 指定

# 监控根目录，收文目录文件（如 2026工区收文目录.xlsx）直接放在它下面
# 未配置时为程序所在目录；环境变量 INTAKE_WATCH_ROOT 优先
# watch-root = "D:/收文"

# 可识别的年份目录
# years = ["25", "26"]

# [category-codes]
# default = "QT"
# codes = { "上级文" = "SJW", "其他" = "QT", "事项通知" = "SXTZ" }

# [policy]
# date-source = "today"            # 或 "file-modified"
# dedup = "document-number-first"  # 或 "path-only"
# identifier = "category-code"     # 或 "inferred-prefix"

# [retry]
# attempts = 8
# delay-ms = 1000
"#;

        let mut file = std::fs::File::create(config_path)?;
        file.write_all(example_config.as_bytes())?;

        eprintln!("\n📝 已创建配置文件: {:?}", config_path);
        eprintln!("💡 默认监控程序所在目录，如需修改请编辑 watch-root\n");

        Ok(())
    }
}
