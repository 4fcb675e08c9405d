// ledger-core/src/backend/mod.rs
//! 表格后端：一次事务内读取工作表快照并提交一处修改

use std::path::Path;

use crate::edit::SheetEdit;
use crate::error::Result;
use crate::grid::SheetGrid;

pub mod offline;

pub use offline::{OfflineBackend, OfflineSession};

/// 能打开收文目录的后端
pub trait SpreadsheetBackend {
    type Session: LedgerSession;

    /// 为一次更新打开收文目录
    fn open(&self, ledger: &Path) -> Result<Self::Session>;
}

/// 一次更新事务。
///
/// 会话销毁时必须释放它占用的一切资源（临时文件、外部进程等），
/// 不论提交成功与否。
pub trait LedgerSession {
    fn sheet_names(&self) -> &[String];

    fn read_sheet(&mut self, index: usize) -> Result<SheetGrid>;

    /// 应用修改并替换收文目录
    fn commit(self, edit: &SheetEdit) -> Result<()>;
}
