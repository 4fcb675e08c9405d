use super::Command;
use crate::error::{Result, WrapErr, error};
use ledger_core::{LedgerConfig, Reconciler};
use std::path::PathBuf;

pub struct ReconcileCommand {
    config: LedgerConfig,
    files: Vec<PathBuf>,
}

impl ReconcileCommand {
    pub fn new(config: LedgerConfig, files: Vec<PathBuf>) -> Self {
        Self { config, files }
    }
}

#[async_trait::async_trait]
impl Command for ReconcileCommand {
    async fn execute(&self) -> Result<()> {
        let reconciler = Reconciler::new(self.config.clone());
        let files = self.files.clone();

        let failed = tokio::task::spawn_blocking(move || {
            files
                .iter()
                .map(|f| std::path::absolute(f).unwrap_or_else(|_| f.clone()))
                .filter(|f| reconciler.handle(f).is_none())
                .count()
        })
        .await
        .wrap_err("登记线程异常退出")?;

        if failed > 0 {
            return Err(error!("{} 个文件登记失败", failed));
        }
        Ok(())
    }
}
