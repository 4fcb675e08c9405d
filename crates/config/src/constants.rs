pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "qc-group";
pub const APP_NAME: &str = "doc-intake";

/// 配置文件名（位于平台配置目录下）
pub const CONFIG_FILE_NAME: &str = "intake.toml";

/// 覆盖监控根目录的环境变量
pub const WATCH_ROOT_ENV: &str = "INTAKE_WATCH_ROOT";

/// 覆盖配置目录的环境变量
pub const CONFIG_DIR_ENV: &str = "INTAKE_CONFIG_DIR";
