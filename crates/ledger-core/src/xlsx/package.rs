// ledger-core/src/xlsx/package.rs
//! 工作簿压缩包：工作表名到部件路径的映射，以及带替换部件的整包重写

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{LedgerError, Result};
use crate::xlsx::rels::{CALC_CHAIN_TYPE, Relationships};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// 重写包时要替换（或新增）和删除的部件
#[derive(Debug, Default)]
pub struct PartChanges {
    pub replaced: BTreeMap<String, Vec<u8>>,
    pub removed: BTreeSet<String>,
}

impl PartChanges {
    pub fn replace(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.replaced.insert(name.into(), bytes);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPart {
    pub name: String,
    /// 包内路径，例如 `xl/worksheets/sheet1.xml`
    pub part: String,
}

impl SheetPart {
    /// 该工作表的关系部件路径
    pub fn rels_part(&self) -> String {
        rels_part_for(&self.part)
    }
}

pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

#[derive(Debug)]
pub struct Package {
    path: PathBuf,
    sheets: Vec<SheetPart>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let workbook = read_entry(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| LedgerError::Package(format!("缺少 {WORKBOOK_PART}")))?;
        let rels = read_entry(&mut archive, WORKBOOK_RELS_PART)?
            .ok_or_else(|| LedgerError::Package(format!("缺少 {WORKBOOK_RELS_PART}")))?;
        let rels = Relationships::parse(&rels)?;

        let mut sheets = Vec::new();
        for (name, rel_id) in workbook_sheets(&workbook)? {
            let rel = rels.get(&rel_id).ok_or_else(|| {
                LedgerError::Package(format!("工作表 {name} 的关系 {rel_id} 不存在"))
            })?;
            sheets.push(SheetPart {
                name,
                part: resolve_target("xl", &rel.target),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn sheets(&self) -> &[SheetPart] {
        &self.sheets
    }

    pub fn sheet(&self, index: usize) -> Option<&SheetPart> {
        self.sheets.get(index)
    }

    pub fn read_part(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        read_entry(&mut archive, name)
    }

    /// 计算链记录了含公式的单元格，公式被覆盖后 Excel 打开会提示修复。
    /// 删掉计算链部件及其关系和内容类型声明，Excel 会在下次计算时重建。
    /// 包中没有计算链时返回 false。
    pub fn remove_calc_chain(&self, changes: &mut PartChanges) -> Result<bool> {
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        let rels_xml = read_entry(&mut archive, WORKBOOK_RELS_PART)?
            .ok_or_else(|| LedgerError::Package(format!("缺少 {WORKBOOK_RELS_PART}")))?;
        let mut rels = Relationships::parse(&rels_xml)?;

        let part = rels
            .iter()
            .find(|rel| rel.rel_type == CALC_CHAIN_TYPE)
            .map(|rel| resolve_target("xl", &rel.target))
            .unwrap_or_else(|| CALC_CHAIN_PART.to_string());
        if !archive.file_names().any(|name| name == part) {
            return Ok(false);
        }

        if rels.remove_type(CALC_CHAIN_TYPE) {
            changes.replace(WORKBOOK_RELS_PART, rels.to_xml()?);
        }
        if let Some(types) = read_entry(&mut archive, CONTENT_TYPES_PART)? {
            changes.replace(CONTENT_TYPES_PART, remove_override(&types, &format!("/{part}"))?);
        }
        changes.removed.insert(part);
        Ok(true)
    }

    /// 把整个包写到 `dest`：`changes` 中的部件替换、新增或删除，其余条目原样拷贝。
    /// 写完后落盘。
    pub fn write_with(&self, dest: &Path, changes: &PartChanges) -> Result<()> {
        let parts = &changes.replaced;
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        let mut zip = ZipWriter::new(File::create(dest)?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut written = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let name = entry.name().to_string();
            if changes.removed.contains(&name) {
                continue;
            }
            match parts.get(&name) {
                Some(bytes) => {
                    drop(entry);
                    zip.start_file(name.as_str(), options)?;
                    zip.write_all(bytes)?;
                    written.push(name);
                }
                None => zip.raw_copy_file(entry)?,
            }
        }
        for (name, bytes) in parts {
            if written.contains(name) {
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        let mut file = zip.finish()?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// 按 workbook.xml 中的顺序列出 (工作表名, 关系 id)
fn workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| LedgerError::Package(format!("workbook.xml 不是有效的 UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.local_name().as_ref() {
                        b"name" => name = Some(attr.unescape_value()?.into_owned()),
                        b"id" => rel_id = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// 去掉 `[Content_Types].xml` 中指向 `part_name` 的 Override
fn remove_override(xml: &[u8], part_name: &str) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| LedgerError::Package(format!("{CONTENT_TYPES_PART} 不是有效的 UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match &event {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Override" => {
                let target = e
                    .try_get_attribute("PartName")?
                    .map(|a| a.unescape_value().map(|v| v.into_owned()))
                    .transpose()?;
                if target.as_deref() == Some(part_name) {
                    if matches!(event, Event::Start(_)) {
                        skip_depth = 1;
                    }
                    continue;
                }
            }
            _ => {}
        }
        writer.write_event(event)?;
    }
    Ok(writer.into_inner())
}

/// 关系目标转为包内路径：`/xl/a.xml` 取绝对路径，其余相对 `base` 解析
fn resolve_target(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
