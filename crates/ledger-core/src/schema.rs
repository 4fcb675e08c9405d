// ledger-core/src/schema.rs
//! 表头识别：定位表头行，建立列名 → 列号映射

use std::collections::HashMap;

use crate::error::{LedgerError, Result};
use crate::grid::SheetGrid;

pub const COL_SEQUENCE: &str = "序号";
pub const COL_DATE: &str = "收文日期";
pub const COL_DOC_NO: &str = "文号";
pub const COL_FILE: &str = "文件名";
pub const COL_SELF_ID: &str = "自编号";
pub const COL_CIRCULATION: &str = "传阅方式";
pub const COL_STORAGE: &str = "存盒位置";
pub const COL_REMARKS: &str = "备注";

/// 旧表头里的“存放位置”，等同于“存盒位置”
pub const COL_STORAGE_LEGACY: &str = "存放位置";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_SEQUENCE,
    COL_DATE,
    COL_DOC_NO,
    COL_FILE,
    COL_SELF_ID,
    COL_CIRCULATION,
    COL_STORAGE,
    COL_REMARKS,
];

/// 在前 `max_rows` 行内查找同时含有“序号”和“文件名”的行
pub fn find_header_row(grid: &SheetGrid, max_rows: usize) -> Option<usize> {
    (0..grid.height().min(max_rows)).find(|&r| {
        let row = grid.row(r);
        row.iter().any(|v| v == COL_SEQUENCE) && row.iter().any(|v| v == COL_FILE)
    })
}

/// 一张分类工作表的列布局，八个必需列都已解析
#[derive(Debug, Clone)]
pub struct HeaderMap {
    pub header_row: usize,
    pub sequence: usize,
    pub date: usize,
    pub doc_no: usize,
    pub file: usize,
    pub self_id: usize,
    pub circulation: usize,
    pub storage: usize,
    pub remarks: usize,
}

impl HeaderMap {
    pub fn build(grid: &SheetGrid, header_row: usize) -> Result<Self> {
        let mut columns: HashMap<String, usize> = HashMap::new();
        for (c, v) in grid.row(header_row).iter().enumerate() {
            if !v.is_empty() {
                columns.entry(v.clone()).or_insert(c);
            }
        }
        if !columns.contains_key(COL_STORAGE) {
            if let Some(&legacy) = columns.get(COL_STORAGE_LEGACY) {
                columns.insert(COL_STORAGE.to_string(), legacy);
            }
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|k| !columns.contains_key(**k))
            .map(|k| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::SchemaIncomplete {
                sheet: grid.name.clone(),
                missing,
            });
        }

        let col = |name: &str| columns[name];
        Ok(Self {
            header_row,
            sequence: col(COL_SEQUENCE),
            date: col(COL_DATE),
            doc_no: col(COL_DOC_NO),
            file: col(COL_FILE),
            self_id: col(COL_SELF_ID),
            circulation: col(COL_CIRCULATION),
            storage: col(COL_STORAGE),
            remarks: col(COL_REMARKS),
        })
    }

    /// 定位表头并建立映射
    pub fn read(grid: &SheetGrid, max_rows: usize) -> Result<Self> {
        let header_row = find_header_row(grid, max_rows).ok_or_else(|| LedgerError::HeaderNotFound {
            sheet: grid.name.clone(),
        })?;
        Self::build(grid, header_row)
    }

    /// 第一条数据行
    pub fn first_data_row(&self) -> usize {
        self.header_row + 1
    }
}
