use super::Command;
use crate::error::{Result, WrapErr};
use ledger_core::{LedgerConfig, Reconciler};

pub struct ScanCommand {
    config: LedgerConfig,
}

impl ScanCommand {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Command for ScanCommand {
    async fn execute(&self) -> Result<()> {
        let reconciler = Reconciler::new(self.config.clone());
        let summary = tokio::task::spawn_blocking(move || ledger_core::scan(&reconciler))
            .await
            .wrap_err("补登线程异常退出")?;

        println!(
            "新登记 {}，更新 {}，跳过 {}，失败 {}",
            summary.recorded, summary.updated, summary.skipped, summary.failed
        );
        Ok(())
    }
}
