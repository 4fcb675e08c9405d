pub mod constants;

use etcetera::{AppStrategy, AppStrategyArgs, choose_app_strategy};

use std::path::{Path, PathBuf};
use std::env;

fn create_strategy() -> std::result::Result<impl AppStrategy, etcetera::HomeDirError> {
    choose_app_strategy(AppStrategyArgs {
        top_level_domain: constants::TOP_LEVEL_DOMAIN.to_string(),
        author: constants::AUTHOR.to_string(),
        app_name: constants::APP_NAME.to_string(),
    })
}

/// 配置文件所在目录：环境变量 > 平台配置目录 > 临时目录
pub fn config_dir() -> PathBuf {
    resolve_dir(
        env::var_os(constants::CONFIG_DIR_ENV).map(PathBuf::from),
        create_strategy().ok().map(|s| s.config_dir()),
    )
}

fn resolve_dir(from_env: Option<PathBuf>, from_platform: Option<PathBuf>) -> PathBuf {
    from_env
        .filter(|p| !p.as_os_str().is_empty())
        .or(from_platform)
        .unwrap_or_else(|| env::temp_dir().join(constants::APP_NAME))
}

/// 程序所在目录。
///
/// 收文目录与被监控的分类文件夹都放在程序旁边，所以它就是默认的监控根目录。
/// 取不到可执行文件路径时退回当前工作目录。
pub fn install_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 解析监控根目录：环境变量 > 配置值 > 程序所在目录
pub fn resolve_watch_root(configured: Option<&Path>) -> PathBuf {
    resolve_watch_root_with(env::var_os(constants::WATCH_ROOT_ENV).map(PathBuf::from), configured)
}

fn resolve_watch_root_with(from_env: Option<PathBuf>, configured: Option<&Path>) -> PathBuf {
    from_env
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(install_dir)
}

/// 当前可执行文件的文件名，监控时需要忽略它自己
pub fn executable_name() -> Option<String> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("/from/env"), Some("/from/config"), "/from/env")]
    #[case(None, Some("/from/config"), "/from/config")]
    #[case(Some(""), Some("/from/config"), "/from/config")]
    fn test_watch_root_precedence(
        #[case] from_env: Option<&str>,
        #[case] configured: Option<&str>,
        #[case] expected: &str,
    ) {
        let resolved = resolve_watch_root_with(
            from_env.map(PathBuf::from),
            configured.map(Path::new),
        );
        assert_eq!(resolved, PathBuf::from(expected));
    }

    #[rstest]
    #[case(Some("/etc/intake"), Some("/home/u/.config/doc-intake"), PathBuf::from("/etc/intake"))]
    #[case(Some(""), Some("/home/u/.config/doc-intake"), PathBuf::from("/home/u/.config/doc-intake"))]
    #[case(None, None, env::temp_dir().join(constants::APP_NAME))]
    fn test_config_dir_precedence(
        #[case] from_env: Option<&str>,
        #[case] from_platform: Option<&str>,
        #[case] expected: PathBuf,
    ) {
        let resolved = resolve_dir(from_env.map(PathBuf::from), from_platform.map(PathBuf::from));
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_watch_root_falls_back_to_install_dir() {
        assert_eq!(resolve_watch_root_with(None, None), install_dir());
    }
}
