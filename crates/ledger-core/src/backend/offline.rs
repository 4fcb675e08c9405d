// ledger-core/src/backend/offline.rs
//! 离线后端：复制、修改、原子替换。
//!
//! 1. 收文目录复制为 `<目录>.read.tmp`，所有分析都读这份副本；
//! 2. 修改后的整包写到 `<目录>.write.tmp` 并落盘；
//! 3. 用 rename 把写副本换到收文目录的位置；
//! 4. 两个临时文件在会话销毁时删除。
//!
//! 写副本失败时收文目录本身从未被打开写入，内容保持原样。

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use calamine::{Reader, Sheets, open_workbook_auto};
use tracing::debug;

use super::{LedgerSession, SpreadsheetBackend};
use crate::edit::SheetEdit;
use crate::error::{LedgerError, Result};
use crate::grid::SheetGrid;
use crate::link::attach_link;
use crate::xlsx::{Package, PartChanges};
use crate::xlsx::sheet::{SheetPatch, patch_sheet_xml};

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl SpreadsheetBackend for OfflineBackend {
    type Session = OfflineSession;

    fn open(&self, ledger: &Path) -> Result<OfflineSession> {
        OfflineSession::open(ledger)
    }
}

/// 两个临时文件的路径，销毁时删除
#[derive(Debug)]
struct ScratchFiles {
    read: PathBuf,
    write: PathBuf,
}

impl ScratchFiles {
    fn for_ledger(ledger: &Path) -> Self {
        Self {
            read: with_suffix(ledger, ".read.tmp"),
            write: with_suffix(ledger, ".write.tmp"),
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in [&self.read, &self.write] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => debug!("临时文件删除失败 {}: {}", path.display(), e),
            }
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

// 字段按声明顺序销毁：读句柄先关闭，再删临时文件
pub struct OfflineSession {
    workbook: Sheets<BufReader<File>>,
    package: Package,
    names: Vec<String>,
    ledger: PathBuf,
    scratch: ScratchFiles,
}

impl OfflineSession {
    pub fn open(ledger: &Path) -> Result<Self> {
        let scratch = ScratchFiles::for_ledger(ledger);
        fs::copy(ledger, &scratch.read)?;

        let workbook = open_workbook_auto(&scratch.read)?;
        let package = Package::open(&scratch.read)?;
        let names = package.sheets().iter().map(|s| s.name.clone()).collect();

        Ok(Self {
            workbook,
            package,
            names,
            ledger: ledger.to_path_buf(),
            scratch,
        })
    }
}

impl LedgerSession for OfflineSession {
    fn sheet_names(&self) -> &[String] {
        &self.names
    }

    fn read_sheet(&mut self, index: usize) -> Result<SheetGrid> {
        let name = self
            .names
            .get(index)
            .ok_or_else(|| LedgerError::Package(format!("工作表序号越界: {index}")))?;
        let range = self.workbook.worksheet_range(name)?;
        Ok(SheetGrid::from_range(name, &range))
    }

    fn commit(self, edit: &SheetEdit) -> Result<()> {
        let part = self
            .package
            .sheet(edit.sheet_index)
            .ok_or_else(|| LedgerError::Package(format!("工作表序号越界: {}", edit.sheet_index)))?;
        let sheet_xml = self
            .package
            .read_part(&part.part)?
            .ok_or_else(|| LedgerError::Package(format!("缺少工作表部件 {}", part.part)))?;

        let mut changes = PartChanges::default();
        let formula_replaced = match &edit.link {
            Some(link) => {
                let rels_part = part.rels_part();
                let rels = self.package.read_part(&rels_part)?;
                let linked = attach_link(&sheet_xml, rels.as_deref(), &edit.cells, link)?;
                changes.replace(part.part.clone(), linked.sheet);
                changes.replace(rels_part, linked.rels);
                linked.formula_replaced
            }
            None => {
                let patched = patch_sheet_xml(
                    &sheet_xml,
                    &SheetPatch {
                        cells: &edit.cells,
                        hyperlink: None,
                    },
                )?;
                changes.replace(part.part.clone(), patched.xml);
                patched.formula_replaced
            }
        };
        if formula_replaced && self.package.remove_calc_chain(&mut changes)? {
            debug!("覆盖了公式单元格，计算链已移除");
        }

        self.package.write_with(&self.scratch.write, &changes)?;
        debug!("写副本已落盘: {}", self.scratch.write.display());
        fs::rename(&self.scratch.write, &self.ledger)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_paths_sit_beside_ledger() {
        let scratch = ScratchFiles::for_ledger(Path::new("/w/2026工区收文目录.xlsx"));
        assert_eq!(scratch.read, PathBuf::from("/w/2026工区收文目录.xlsx.read.tmp"));
        assert_eq!(scratch.write, PathBuf::from("/w/2026工区收文目录.xlsx.write.tmp"));
    }

    #[test]
    fn test_scratch_files_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("ledger.xlsx");
        let scratch = ScratchFiles::for_ledger(&ledger);
        fs::write(&scratch.read, b"r").unwrap();
        fs::write(&scratch.write, b"w").unwrap();

        drop(scratch);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_ledger_is_transient_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = OfflineBackend
            .open(&dir.path().join("missing.xlsx"))
            .err()
            .unwrap();
        assert!(err.is_transient());
    }
}
