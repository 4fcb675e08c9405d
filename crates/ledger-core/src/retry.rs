// ledger-core/src/retry.rs
//! 收文目录被其他程序占用时的等待与重试

use std::fs::OpenOptions;
use std::path::Path;
use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::config::RetryConfig;
use crate::error::Result;

/// 执行整次更新，遇到瞬时错误按固定间隔重试，最多 `attempts` 次。
/// 非瞬时错误立即返回。
pub fn retry_transient<T>(retry: &RetryConfig, mut op: impl FnMut(u32) -> Result<T>) -> Result<T> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                debug!("第 {}/{} 次尝试失败: {}，{:?} 后重试", attempt, attempts, e, retry.delay());
                thread::sleep(retry.delay());
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 轮询以追加方式打开文件，直到成功或超出等待时间。返回文件是否可写。
pub fn wait_for_unlock(path: &Path, retry: &RetryConfig) -> bool {
    let deadline = Instant::now() + retry.preflight_wait();
    loop {
        match OpenOptions::new().append(true).open(path) {
            Ok(_) => return true,
            Err(e) => {
                if Instant::now() >= deadline {
                    debug!("等待解锁超时 {}: {}", path.display(), e);
                    return false;
                }
                debug!("文件被占用，等待中 {}: {}", path.display(), e);
                thread::sleep(retry.preflight_poll());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use std::io;

    fn quick(attempts: u32) -> RetryConfig {
        RetryConfig {
            attempts,
            delay_ms: 0,
            preflight_wait_ms: 0,
            preflight_poll_ms: 1,
        }
    }

    #[test]
    fn test_transient_errors_are_retried_until_success() {
        let mut calls = 0;
        let value = retry_transient(&quick(8), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked").into())
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_budget_is_bounded() {
        let mut calls = 0;
        let result: Result<()> = retry_transient(&quick(4), |_| {
            calls += 1;
            Err(io::Error::other("busy").into())
        });
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_structural_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = retry_transient(&quick(8), |_| {
            calls += 1;
            Err(LedgerError::HeaderNotFound {
                sheet: "上级文".into(),
            })
        });
        assert!(matches!(result, Err(LedgerError::HeaderNotFound { .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_wait_for_unlock() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.xlsx");
        std::fs::write(&file, b"x").unwrap();

        assert!(wait_for_unlock(&file, &quick(1)));
        assert!(!wait_for_unlock(&dir.path().join("missing.xlsx"), &quick(1)));
    }
}
