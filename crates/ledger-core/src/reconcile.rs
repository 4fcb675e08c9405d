// ledger-core/src/reconcile.rs
//! 登记流程：路径分类 → 定位收文目录 → 读表头 → 决定写哪一行 → 安全写入

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::backend::{LedgerSession, OfflineBackend, SpreadsheetBackend};
use crate::classify::{WatchedFile, category_of, year_of};
use crate::config::{DateSource, DedupPolicy, IdentifierScheme, LedgerConfig};
use crate::edit::{CellValue, SheetEdit};
use crate::error::{LedgerError, Result};
use crate::filter::is_ignored;
use crate::grid::SheetGrid;
use crate::history::{
    extract_document_number, format_received_date, generate_identifier, infer_date_style,
    infer_identifier, last_non_blank, next_sequence, normalize_document_number,
};
use crate::link::relative_target;
use crate::locate::{LedgerLookup, ledger_for, sheet_index_for};
use crate::retry::{retry_transient, wait_for_unlock};
use crate::schema::HeaderMap;

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 临时文件、收文目录本身等
    Ignored,
    NoYear,
    NoCategory,
    LedgerMissing(String),
    LegacyLedger(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ignored => write!(f, "忽略的文件"),
            SkipReason::NoYear => write!(f, "路径中没有年份目录"),
            SkipReason::NoCategory => write!(f, "无法确定分类（文件需放在 分类/年份 目录下）"),
            SkipReason::LedgerMissing(name) => write!(f, "收文目录不存在: {name}"),
            SkipReason::LegacyLedger(path) => {
                write!(f, "收文目录为旧版 .xls 格式: {}", path.display())
            }
        }
    }
}

/// 一次登记的结果，行号从 1 开始
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 追加到末尾
    Appended {
        sheet: String,
        row: usize,
        sequence: i64,
        identifier: String,
    },
    /// 填入空行
    Filled {
        sheet: String,
        row: usize,
        sequence: i64,
        identifier: String,
    },
    /// 已登记过，更新文件名和链接
    Updated { sheet: String, row: usize },
    Skipped(SkipReason),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Appended {
                sheet,
                row,
                sequence,
                identifier,
            } => write!(f, "新增 [{sheet}] 第 {row} 行，序号 {sequence}，自编号 {identifier}"),
            Outcome::Filled {
                sheet,
                row,
                sequence,
                identifier,
            } => write!(f, "填入空行 [{sheet}] 第 {row} 行，序号 {sequence}，自编号 {identifier}"),
            Outcome::Updated { sheet, row } => write!(f, "已登记，更新 [{sheet}] 第 {row} 行"),
            Outcome::Skipped(reason) => write!(f, "跳过: {reason}"),
        }
    }
}

/// 待登记文件及其推断信息
#[derive(Debug, Clone)]
pub struct Candidate {
    pub file: WatchedFile,
    /// 四位年份
    pub year_full: String,
    pub category: String,
    pub document_number: String,
}

/// 目标行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Existing(usize),
    Vacant(usize),
    Append(usize),
}

/// 在已有数据行中查找代表同一份文件的行。
///
/// 先比对规整后的文号，再看文件名列是否包含相对路径或文件名。
pub fn find_existing_row(
    grid: &SheetGrid,
    header: &HeaderMap,
    candidate: &Candidate,
    policy: DedupPolicy,
) -> Option<usize> {
    let rows = header.first_data_row()..grid.height();

    if policy == DedupPolicy::DocumentNumberFirst {
        let wanted = normalize_document_number(&candidate.document_number);
        if !wanted.is_empty() {
            let hit = rows
                .clone()
                .find(|&r| normalize_document_number(grid.text(r, header.doc_no)) == wanted);
            if hit.is_some() {
                return hit;
            }
        }
    }

    let slash = candidate.file.relative.as_str();
    let backslash = slash.replace('/', "\\");
    let name = candidate.file.file_name.as_str();
    rows.into_iter().find(|&r| {
        let cell = grid.text(r, header.file);
        !cell.is_empty()
            && ((!slash.is_empty() && cell.contains(slash))
                || (!backslash.is_empty() && cell.contains(backslash.as_str()))
                || (!name.is_empty() && cell.contains(name)))
    })
}

/// 第一条日期、文号、文件名、自编号都为空的数据行
pub fn find_vacant_row(grid: &SheetGrid, header: &HeaderMap) -> Option<usize> {
    (header.first_data_row()..grid.height()).find(|&r| {
        [header.date, header.doc_no, header.file, header.self_id]
            .iter()
            .all(|&c| grid.is_blank(r, c))
    })
}

pub fn choose_placement(
    grid: &SheetGrid,
    header: &HeaderMap,
    candidate: &Candidate,
    policy: DedupPolicy,
) -> Placement {
    if let Some(row) = find_existing_row(grid, header, candidate, policy) {
        return Placement::Existing(row);
    }
    if let Some(row) = find_vacant_row(grid, header) {
        return Placement::Vacant(row);
    }
    Placement::Append(grid.height().max(header.first_data_row()))
}

/// 根据表中现状生成本次修改及其结果描述
pub fn plan_edit(
    config: &LedgerConfig,
    grid: &SheetGrid,
    header: &HeaderMap,
    sheet_index: usize,
    candidate: &Candidate,
    link_target: &str,
    today: NaiveDate,
) -> (SheetEdit, Outcome) {
    let file_name = candidate.file.file_name.as_str();
    let mut edit = SheetEdit::new(sheet_index);

    let placement = choose_placement(grid, header, candidate, config.policy.dedup);
    let row = match placement {
        Placement::Existing(row) => {
            edit.set(row, header.file, CellValue::text(file_name))
                .set(row, header.remarks, CellValue::Blank)
                .link(row, header.file, link_target, file_name);
            let outcome = Outcome::Updated {
                sheet: grid.name.clone(),
                row: row + 1,
            };
            return (edit, outcome);
        }
        Placement::Vacant(row) | Placement::Append(row) => row,
    };

    let sequence = next_sequence(grid, header, row);
    let date = match config.policy.date_source {
        DateSource::Today => today,
        DateSource::FileModified => candidate
            .file
            .modified
            .map(|t| DateTime::<Local>::from(t).date_naive())
            .unwrap_or(today),
    };
    let date_text = format_received_date(
        date,
        infer_date_style(grid, header),
        Some(candidate.year_full.as_str()),
    );
    let identifier = match config.policy.identifier {
        IdentifierScheme::CategoryCode => generate_identifier(
            grid,
            header,
            config.category_codes.code_for(&candidate.category),
            &candidate.year_full,
        ),
        IdentifierScheme::InferredPrefix => infer_identifier(grid, header, &candidate.year_full),
    };
    let circulation = last_non_blank(grid, header, header.circulation);

    edit.set(row, header.sequence, CellValue::Number(sequence as f64))
        .set(row, header.date, CellValue::text(date_text))
        .set(row, header.doc_no, CellValue::text(candidate.document_number.as_str()))
        .set(row, header.file, CellValue::text(file_name))
        .set(row, header.self_id, CellValue::text(identifier.as_str()))
        .set(row, header.circulation, CellValue::text(circulation))
        .set(row, header.storage, CellValue::Blank)
        .set(row, header.remarks, CellValue::Blank)
        .link(row, header.file, link_target, file_name);

    let sheet = grid.name.clone();
    let outcome = match placement {
        Placement::Vacant(_) => Outcome::Filled {
            sheet,
            row: row + 1,
            sequence,
            identifier,
        },
        _ => Outcome::Appended {
            sheet,
            row: row + 1,
            sequence,
            identifier,
        },
    };
    (edit, outcome)
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// 登记器：持有配置和表格后端，逐个处理文件
pub struct Reconciler<B = OfflineBackend> {
    config: LedgerConfig,
    backend: B,
    clock: fn() -> NaiveDate,
}

impl Reconciler<OfflineBackend> {
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_backend(config, OfflineBackend)
    }
}

impl<B: SpreadsheetBackend> Reconciler<B> {
    pub fn with_backend(config: LedgerConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            clock: local_today,
        }
    }

    /// 替换取“今天”的方式
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// 推断待登记文件的年份、分类和文号；无法登记时给出原因
    pub fn classify(&self, path: &Path) -> std::result::Result<Candidate, SkipReason> {
        if is_ignored(&self.config, path) {
            return Err(SkipReason::Ignored);
        }
        let year_two = year_of(path, &self.config.years).ok_or(SkipReason::NoYear)?;
        let category = category_of(path, &self.config.watch_root).ok_or(SkipReason::NoCategory)?;
        let file = WatchedFile::new(path, &self.config.watch_root);
        let document_number = extract_document_number(&file.file_name);

        Ok(Candidate {
            year_full: format!("20{year_two}"),
            category,
            document_number,
            file,
        })
    }

    /// 登记一个文件。瞬时错误按配置重试，其他错误直接返回。
    pub fn reconcile(&self, path: &Path) -> Result<Outcome> {
        let candidate = match self.classify(path) {
            Ok(candidate) => candidate,
            Err(reason) => return Ok(Outcome::Skipped(reason)),
        };
        let year_two = &candidate.year_full[2..];
        let ledger = match ledger_for(&self.config, year_two) {
            LedgerLookup::Found(path) => path,
            LedgerLookup::Legacy(path) => return Ok(Outcome::Skipped(SkipReason::LegacyLedger(path))),
            LedgerLookup::Missing(name) => return Ok(Outcome::Skipped(SkipReason::LedgerMissing(name))),
        };

        if !wait_for_unlock(&ledger, &self.config.retry) {
            warn!("收文目录仍被占用，照常尝试: {}", ledger.display());
        }

        retry_transient(&self.config.retry, |attempt| {
            debug!("第 {} 次登记 {} → {}", attempt, candidate.file.relative, ledger.display());
            self.apply(&ledger, &candidate)
        })
    }

    fn apply(&self, ledger: &Path, candidate: &Candidate) -> Result<Outcome> {
        let mut session = self.backend.open(ledger)?;
        let index = sheet_index_for(
            session.sheet_names(),
            &candidate.category,
            &self.config.placeholder_sheet,
        )
        .ok_or_else(|| LedgerError::SheetNotFound {
            category: candidate.category.clone(),
        })?;

        let grid = session.read_sheet(index)?;
        let header = HeaderMap::read(&grid, self.config.header_scan_rows)?;
        let target = relative_target(ledger, &candidate.file.path);
        let (edit, outcome) = plan_edit(
            &self.config,
            &grid,
            &header,
            index,
            candidate,
            &target,
            (self.clock)(),
        );

        session.commit(&edit)?;
        Ok(outcome)
    }

    /// 处理一个文件事件并写日志，错误不向外传播
    pub fn handle(&self, path: &Path) -> Option<Outcome> {
        match self.reconcile(path) {
            Ok(Outcome::Skipped(reason)) => {
                warn!("跳过 {}: {}", path.display(), reason);
                Some(Outcome::Skipped(reason))
            }
            Ok(outcome) => {
                info!("已处理 {}: {}", path.display(), outcome);
                Some(outcome)
            }
            Err(e) if e.is_transient() => {
                error!(
                    "重试 {} 次后仍失败，未登记 {}: {}",
                    self.config.retry.attempts.max(1),
                    path.display(),
                    e
                );
                None
            }
            Err(e) => {
                error!("登记失败 {}: {}", path.display(), e);
                None
            }
        }
    }
}
