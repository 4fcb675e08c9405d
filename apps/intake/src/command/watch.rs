use super::Command;
use crate::error::{Result, WrapErr};
use ledger_core::{LedgerConfig, Reconciler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

pub struct WatchCommand {
    config: LedgerConfig,
}

impl WatchCommand {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Command for WatchCommand {
    async fn execute(&self) -> Result<()> {
        let reconciler = Reconciler::new(self.config.clone());
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();

        // 登记是阻塞操作，放在独立线程上逐个处理事件
        let mut worker =
            tokio::task::spawn_blocking(move || ledger_core::watch(&reconciler, &worker_stop));

        tokio::select! {
            joined = &mut worker => {
                joined.wrap_err("监控线程异常退出")??;
                return Ok(());
            }
            signal = tokio::signal::ctrl_c() => {
                signal.wrap_err("无法监听 Ctrl-C")?;
                info!("收到中断信号，处理完当前文件后退出");
                stop.store(true, Ordering::Relaxed);
            }
        }

        worker.await.wrap_err("监控线程异常退出")??;
        Ok(())
    }
}
