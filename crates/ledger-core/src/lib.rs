// ledger-core/src/lib.rs
//! 收文目录自动登记核心库
//!
//! 文件放入 `分类/年份/` 目录后，自动登记到对应年份收文目录的分类工作表中：
//! - 路径分类（年份、分类名）与收文目录定位
//! - 表头识别与历史数据推断（序号、收文日期格式、自编号、传阅方式）
//! - 去重：已登记的文件只更新文件名和链接
//! - 复制、修改、原子替换的安全写入，被占用时有限重试
//! - 文件名单元格上的相对路径超链接

pub mod backend;
pub mod classify;
pub mod config;
pub mod edit;
pub mod error;
pub mod filter;
pub mod grid;
pub mod history;
pub mod link;
pub mod locate;
pub mod reconcile;
pub mod retry;
pub mod schema;
pub mod watcher;
pub mod xlsx;

// 重导出核心类型
pub use backend::{LedgerSession, OfflineBackend, SpreadsheetBackend};
pub use classify::{WatchedFile, category_of, year_of};
pub use config::{
    CategoryCodes, DateSource, DedupPolicy, IdentifierScheme, IgnoreConfig, LedgerConfig,
    PolicyConfig, RetryConfig,
};
pub use edit::{CellLink, CellValue, CellWrite, SheetEdit};
pub use error::{LedgerError, Result};
pub use grid::SheetGrid;
pub use locate::{LedgerLookup, ledger_for, sheet_index_for};
pub use reconcile::{Candidate, Outcome, Placement, Reconciler, SkipReason};
pub use schema::HeaderMap;
pub use watcher::{IntakeEvent, IntakeKind, ScanSummary, intake_event, scan, watch};
