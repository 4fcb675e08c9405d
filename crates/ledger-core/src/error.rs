// ledger-core/src/error.rs
//! 错误类型

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("找不到对应工作表: {category}")]
    SheetNotFound { category: String },

    #[error("工作表缺少表头: {sheet}")]
    HeaderNotFound { sheet: String },

    #[error("工作表列缺失: {sheet} {missing:?}")]
    SchemaIncomplete { sheet: String, missing: Vec<String> },

    #[error("工作簿结构异常: {0}")]
    Package(String),

    #[error("读取表格失败: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("XML 处理失败: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML 属性异常: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("ZIP 处理失败: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("文件监控失败: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// 是否为可重试的瞬时错误（通常是收文目录正被其他程序占用）。
    ///
    /// 结构性错误重试也不会成功，只有 I/O 失败才值得再试。
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Io(_) => true,
            LedgerError::Zip(zip::result::ZipError::Io(_)) => true,
            LedgerError::Spreadsheet(calamine::Error::Io(_)) => true,
            _ => false,
        }
    }
}
