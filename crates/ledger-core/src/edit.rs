// ledger-core/src/edit.rs
//! 对单张工作表的一次修改：若干单元格写入，外加至多一个超链接

/// 写入单元格的值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    /// 清空内容，保留单元格格式
    Blank,
}

impl CellValue {
    /// 空文本等同于清空
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}

/// 挂在某个单元格上的文件链接
#[derive(Debug, Clone, PartialEq)]
pub struct CellLink {
    pub row: u32,
    pub col: u32,
    /// 相对收文目录所在目录的路径，`/` 分隔
    pub target: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetEdit {
    pub sheet_index: usize,
    pub cells: Vec<CellWrite>,
    pub link: Option<CellLink>,
}

impl SheetEdit {
    pub fn new(sheet_index: usize) -> Self {
        Self {
            sheet_index,
            cells: Vec::new(),
            link: None,
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: CellValue) -> &mut Self {
        self.cells.push(CellWrite {
            row: row as u32,
            col: col as u32,
            value,
        });
        self
    }

    pub fn link(&mut self, row: usize, col: usize, target: &str, display: &str) -> &mut Self {
        self.link = Some(CellLink {
            row: row as u32,
            col: col as u32,
            target: target.to_string(),
            display: display.to_string(),
        });
        self
    }
}
