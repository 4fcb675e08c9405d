// ledger-core/src/link.rs
//! 文件名单元格上的超链接：目标为相对收文目录所在目录的路径，显示文件名。
//!
//! 同一单元格上已有的链接先摘除，再挂新链接；其他单元格的链接和关系不动。

use std::path::{Component, Path};

use crate::edit::{CellLink, CellWrite};
use crate::error::Result;
use crate::xlsx::rels::Relationships;
use crate::xlsx::sheet::{HyperlinkPatch, SheetPatch, patch_sheet_xml};

/// 修补后的工作表部件与关系部件
#[derive(Debug)]
pub struct LinkedParts {
    pub sheet: Vec<u8>,
    pub rels: Vec<u8>,
    pub formula_replaced: bool,
}

/// `file` 相对 `ledger` 所在目录的路径，统一用 `/` 分隔
pub fn relative_target(ledger: &Path, file: &Path) -> String {
    let base = ledger.parent().unwrap_or_else(|| Path::new(""));
    if let Ok(rest) = file.strip_prefix(base) {
        return join_components(rest);
    }

    let base_parts: Vec<Component<'_>> = base.components().collect();
    let file_parts: Vec<Component<'_>> = file.components().collect();
    let common = base_parts
        .iter()
        .zip(&file_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    segments.extend(
        file_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    segments.join("/")
}

fn join_components(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// 写入单元格并把链接挂到目标单元格上
pub fn attach_link(
    sheet_xml: &[u8],
    rels_xml: Option<&[u8]>,
    cells: &[CellWrite],
    link: &CellLink,
) -> Result<LinkedParts> {
    let mut rels = match rels_xml {
        Some(xml) => Relationships::parse(xml)?,
        None => Relationships::default(),
    };
    let rel_id = rels.next_id();

    let patched = patch_sheet_xml(
        sheet_xml,
        &SheetPatch {
            cells,
            hyperlink: Some(HyperlinkPatch {
                row: link.row,
                col: link.col,
                rel_id: rel_id.clone(),
                display: link.display.clone(),
            }),
        },
    )?;

    rels.remove_hyperlinks(&patched.replaced_rel_ids);
    rels.push_external_hyperlink(&rel_id, &link.target);

    Ok(LinkedParts {
        sheet: patched.xml,
        rels: rels.to_xml()?,
        formula_replaced: patched.formula_replaced,
    })
}
