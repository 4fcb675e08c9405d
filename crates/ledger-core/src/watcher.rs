// ledger-core/src/watcher.rs
//! 文件监控适配：把 notify 事件转为登记事件，逐个交给登记器处理

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::thread;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::backend::SpreadsheetBackend;
use crate::error::Result;
use crate::filter::is_ignored;
use crate::reconcile::{Outcome, Reconciler};

/// 新建文件交给登记前的等待时间，让复制程序写完
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeKind {
    Created,
    Moved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeEvent {
    pub path: PathBuf,
    pub kind: IntakeKind,
}

/// 只关心新建和移入；重命名取目标路径。
///
/// 部分平台（如 macOS FSEvents）的重命名不区分源和目标，
/// 这时以路径是否仍然存在来判断它是不是移入的一端。
pub fn intake_event(event: &Event) -> Option<IntakeEvent> {
    let (path, kind) = match event.kind {
        EventKind::Create(_) => (event.paths.first()?, IntakeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            (event.paths.first()?, IntakeKind::Moved)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            (event.paths.get(1)?, IntakeKind::Moved)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            let path = event.paths.iter().rev().find(|p| p.exists())?;
            (path, IntakeKind::Moved)
        }
        _ => return None,
    };
    Some(IntakeEvent {
        path: path.clone(),
        kind,
    })
}

fn dispatch<B: SpreadsheetBackend>(reconciler: &Reconciler<B>, event: Event, settle: Duration) {
    if let EventKind::Remove(_) = event.kind {
        for path in &event.paths {
            info!("文件已删除（收文目录不做改动）: {}", path.display());
        }
        return;
    }

    let Some(intake) = intake_event(&event) else {
        return;
    };
    if is_ignored(reconciler.config(), &intake.path) {
        debug!("忽略: {}", intake.path.display());
        return;
    }

    if intake.kind == IntakeKind::Created && !settle.is_zero() {
        thread::sleep(settle);
    }
    reconciler.handle(&intake.path);
}

/// 监控根目录，阻塞直到 `stop` 被置位。事件在当前线程上逐个处理，
/// 正在进行的登记总会完成后才检查停止标志。
pub fn watch<B: SpreadsheetBackend>(reconciler: &Reconciler<B>, stop: &AtomicBool) -> Result<()> {
    let root = reconciler.config().watch_root.clone();
    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("文件监控已启动: {}", root.display());

    while !stop.load(Ordering::Relaxed) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                debug!("收到文件事件: {:?}", event);
                dispatch(reconciler, event, SETTLE_DELAY);
            }
            Ok(Err(e)) => warn!("文件监控错误: {}", e),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("文件监控已停止");
    Ok(())
}

/// 补登统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub recorded: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 遍历监控根目录，对每个文件登记一次。已登记的文件只会被更新，不会重复登记。
pub fn scan<B: SpreadsheetBackend>(reconciler: &Reconciler<B>) -> ScanSummary {
    let config = reconciler.config();
    let mut summary = ScanSummary::default();

    for entry in WalkDir::new(&config.watch_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if is_ignored(config, path) {
            continue;
        }
        match reconciler.handle(path) {
            Some(Outcome::Appended { .. } | Outcome::Filled { .. }) => summary.recorded += 1,
            Some(Outcome::Updated { .. }) => summary.updated += 1,
            Some(Outcome::Skipped(_)) => summary.skipped += 1,
            None => summary.failed += 1,
        }
    }

    info!(
        "补登完成: 新登记 {} 个，更新 {} 个，跳过 {} 个，失败 {} 个",
        summary.recorded, summary.updated, summary.skipped, summary.failed
    );
    summary
}
