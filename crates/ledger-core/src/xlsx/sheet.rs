// ledger-core/src/xlsx/sheet.rs
//! 工作表 XML 的流式修补。
//!
//! 只改动要写的单元格、`<dimension>` 与 `<hyperlinks>`，其余元素逐个原样输出，
//! 因此列宽、合并单元格、条件格式、打印设置等都不受影响。

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::edit::{CellValue, CellWrite};
use crate::error::{LedgerError, Result};
use crate::xlsx::cell_ref::{cell_ref, parse_cell_ref, widen_dimension};
use crate::xlsx::rels::OFFICE_RELS_NS;

/// CT_Worksheet 中排在 `<hyperlinks>` 之后的元素
const AFTER_HYPERLINKS: &[&[u8]] = &[
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"drawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

#[derive(Debug, Clone, PartialEq)]
pub struct HyperlinkPatch {
    pub row: u32,
    pub col: u32,
    pub rel_id: String,
    pub display: String,
}

#[derive(Debug, Default)]
pub struct SheetPatch<'a> {
    pub cells: &'a [CellWrite],
    pub hyperlink: Option<HyperlinkPatch>,
}

#[derive(Debug)]
pub struct PatchResult {
    pub xml: Vec<u8>,
    /// 被新链接顶替掉的旧超链接关系 id
    pub replaced_rel_ids: Vec<String>,
    /// 被替换的单元格中有公式，计算链需要作废
    pub formula_replaced: bool,
}

pub fn patch_sheet_xml(xml: &[u8], patch: &SheetPatch<'_>) -> Result<PatchResult> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| LedgerError::Package(format!("工作表不是有效的 UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    let mut state = PatchState::new(patch, xml.len());

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => state.handle(event)?,
        }
    }

    if state.hyperlink.is_some() && !state.link_written {
        return Err(LedgerError::Package("工作表缺少 worksheet 根元素".into()));
    }
    Ok(PatchResult {
        xml: state.writer.into_inner(),
        replaced_rel_ids: state.replaced,
        formula_replaced: state.formula_replaced,
    })
}

struct RowState {
    cells: BTreeMap<u32, CellValue>,
    last_col: Option<u32>,
}

struct PatchState {
    writer: Writer<Vec<u8>>,
    /// 主命名空间前缀（通常为空）
    prefix: String,
    /// 关系命名空间前缀
    rel_prefix: String,
    pending: BTreeMap<u32, BTreeMap<u32, CellValue>>,
    bounds: Option<(u32, u32)>,
    depth: usize,
    skip_depth: usize,
    skipping_cell: bool,
    formula_replaced: bool,
    in_sheet_data: bool,
    in_hyperlinks: bool,
    row: Option<RowState>,
    last_row: Option<u32>,
    hyperlink: Option<HyperlinkPatch>,
    link_written: bool,
    replaced: Vec<String>,
}

impl PatchState {
    fn new(patch: &SheetPatch<'_>, capacity: usize) -> Self {
        let mut pending: BTreeMap<u32, BTreeMap<u32, CellValue>> = BTreeMap::new();
        let mut bounds: Option<(u32, u32)> = None;
        for write in patch.cells {
            pending
                .entry(write.row)
                .or_default()
                .insert(write.col, write.value.clone());
            bounds = Some(match bounds {
                Some((r, c)) => (r.max(write.row), c.max(write.col)),
                None => (write.row, write.col),
            });
        }
        Self {
            writer: Writer::new(Vec::with_capacity(capacity + 512)),
            prefix: String::new(),
            rel_prefix: "r".to_string(),
            pending,
            bounds,
            depth: 0,
            skip_depth: 0,
            skipping_cell: false,
            formula_replaced: false,
            in_sheet_data: false,
            in_hyperlinks: false,
            row: None,
            last_row: None,
            hyperlink: patch.hyperlink.clone(),
            link_written: false,
            replaced: Vec::new(),
        }
    }

    fn handle(&mut self, event: Event<'_>) -> Result<()> {
        if self.skip_depth > 0 {
            if let Event::Start(e) | Event::Empty(e) = &event {
                if self.skipping_cell && e.local_name().as_ref() == b"f" {
                    self.formula_replaced = true;
                }
            }
            match event {
                Event::Start(_) => self.skip_depth += 1,
                Event::End(_) => self.skip_depth -= 1,
                _ => {}
            }
            if self.skip_depth == 0 {
                self.skipping_cell = false;
            }
            return Ok(());
        }

        match event {
            Event::Start(e) => self.on_start(e),
            Event::Empty(e) => self.on_empty(e),
            Event::End(e) => self.on_end(e),
            other => Ok(self.writer.write_event(other)?),
        }
    }

    fn on_start(&mut self, e: BytesStart<'_>) -> Result<()> {
        let level = self.depth;
        let local = e.local_name().as_ref().to_vec();

        if level == 0 && local == b"worksheet" {
            let root = self.prepare_root(e)?;
            self.writer.write_event(Event::Start(root))?;
            self.depth += 1;
            return Ok(());
        }

        if level == 1 {
            self.maybe_insert_hyperlinks_before(&local)?;
            match local.as_slice() {
                b"sheetData" => self.in_sheet_data = true,
                b"hyperlinks" => self.in_hyperlinks = true,
                _ => {}
            }
        }

        if self.in_sheet_data && level == 2 && local == b"row" {
            let start = self.begin_row(&e)?;
            self.writer.write_event(Event::Start(start))?;
            self.depth += 1;
            return Ok(());
        }

        if self.in_sheet_data && level == 3 && local == b"c" && self.on_cell(&e)? {
            // 旧单元格内容整体跳过，直到 </c>
            self.skip_depth = 1;
            self.skipping_cell = true;
            return Ok(());
        }

        if self.in_hyperlinks && level == 2 && local == b"hyperlink" && self.drop_hyperlink(&e)? {
            self.skip_depth = 1;
            return Ok(());
        }

        self.writer.write_event(Event::Start(e))?;
        self.depth += 1;
        Ok(())
    }

    fn on_empty(&mut self, e: BytesStart<'_>) -> Result<()> {
        let level = self.depth;
        let local = e.local_name().as_ref().to_vec();

        if level == 1 {
            self.maybe_insert_hyperlinks_before(&local)?;
            match local.as_slice() {
                b"dimension" => {
                    let dimension = self.widen(&e)?;
                    self.writer.write_event(Event::Empty(dimension))?;
                    return Ok(());
                }
                b"sheetData" if !self.pending.is_empty() => {
                    let name = self.element("sheetData");
                    self.writer.write_event(Event::Start(e))?;
                    self.flush_rows_before(None)?;
                    self.writer.write_event(Event::End(BytesEnd::new(name)))?;
                    return Ok(());
                }
                b"hyperlinks" => {
                    let name = self.element("hyperlinks");
                    self.writer.write_event(Event::Start(e))?;
                    self.write_hyperlink()?;
                    self.writer.write_event(Event::End(BytesEnd::new(name)))?;
                    return Ok(());
                }
                _ => {}
            }
        }

        if self.in_sheet_data && level == 2 && local == b"row" {
            let start = self.begin_row(&e)?;
            if self.row.as_ref().is_some_and(|r| !r.cells.is_empty()) {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                self.writer.write_event(Event::Start(start))?;
                self.flush_row_cells(None)?;
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            } else {
                self.writer.write_event(Event::Empty(start))?;
            }
            self.row = None;
            return Ok(());
        }

        if self.in_sheet_data && level == 3 && local == b"c" && self.on_cell(&e)? {
            return Ok(());
        }

        if self.in_hyperlinks && level == 2 && local == b"hyperlink" && self.drop_hyperlink(&e)? {
            return Ok(());
        }

        self.writer.write_event(Event::Empty(e))?;
        Ok(())
    }

    fn on_end(&mut self, e: BytesEnd<'_>) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        let level = self.depth;
        let local = e.local_name().as_ref().to_vec();

        match (level, local.as_slice()) {
            (2, b"row") if self.in_sheet_data => {
                self.flush_row_cells(None)?;
                self.row = None;
            }
            (1, b"sheetData") => {
                self.flush_rows_before(None)?;
                self.in_sheet_data = false;
            }
            (1, b"hyperlinks") => {
                self.write_hyperlink()?;
                self.in_hyperlinks = false;
            }
            (0, b"worksheet") => self.maybe_insert_hyperlinks_before(b"")?,
            _ => {}
        }

        self.writer.write_event(Event::End(e))?;
        Ok(())
    }

    /// 记下命名空间前缀，需要时补上关系命名空间声明
    fn prepare_root(&mut self, e: BytesStart<'_>) -> Result<BytesStart<'static>> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        if let Some((prefix, _)) = name.split_once(':') {
            self.prefix = format!("{prefix}:");
        }

        let mut rel_prefix = None;
        for attr in e.attributes() {
            let attr = attr?;
            if attr.value.as_ref() == OFFICE_RELS_NS.as_bytes() {
                if let Some(p) = attr.key.as_ref().strip_prefix(b"xmlns:") {
                    rel_prefix = Some(String::from_utf8_lossy(p).into_owned());
                }
            }
        }

        let mut root = e.into_owned();
        match rel_prefix {
            Some(prefix) => self.rel_prefix = prefix,
            None if self.hyperlink.is_some() => {
                root.push_attribute(("xmlns:r", OFFICE_RELS_NS));
            }
            None => {}
        }
        Ok(root)
    }

    fn element(&self, local: &str) -> String {
        format!("{}{local}", self.prefix)
    }

    fn widen(&self, e: &BytesStart<'_>) -> Result<BytesStart<'static>> {
        let Some((row, col)) = self.bounds else {
            return Ok(e.clone().into_owned());
        };
        let mut out = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        for attr in e.attributes() {
            let attr = attr?;
            if attr.key.as_ref() == b"ref" {
                let current = attr.unescape_value()?;
                let widened = widen_dimension(&current, row, col)
                    .unwrap_or_else(|| current.into_owned());
                out.push_attribute(("ref", widened.as_str()));
            } else {
                out.push_attribute(attr);
            }
        }
        Ok(out)
    }

    /// 进入一行：先补写排在它前面的新行，再取出本行待写的单元格
    fn begin_row(&mut self, e: &BytesStart<'_>) -> Result<BytesStart<'static>> {
        let explicit = attr_text(e, b"r")?
            .and_then(|r| r.parse::<u32>().ok())
            .and_then(|r| r.checked_sub(1));
        let row = explicit.unwrap_or_else(|| self.last_row.map_or(0, |r| r + 1));
        self.last_row = Some(row);

        self.flush_rows_before(Some(row))?;
        let cells = self.pending.remove(&row).unwrap_or_default();
        let touched = !cells.is_empty();
        self.row = Some(RowState {
            cells,
            last_col: None,
        });

        let mut out = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        for attr in e.attributes() {
            let attr = attr?;
            // 改动过的行 spans 可能失效
            if touched && attr.key.as_ref() == b"spans" {
                continue;
            }
            out.push_attribute(attr);
        }
        Ok(out)
    }

    /// 处理一个已有单元格；返回 true 表示它已被替换，原内容应丢弃
    fn on_cell(&mut self, e: &BytesStart<'_>) -> Result<bool> {
        let Some(row_state) = self.row.as_mut() else {
            return Ok(false);
        };
        let col = attr_text(e, b"r")?
            .and_then(|r| parse_cell_ref(&r))
            .map(|(_, c)| c)
            .unwrap_or_else(|| row_state.last_col.map_or(0, |c| c + 1));
        row_state.last_col = Some(col);

        self.flush_row_cells(Some(col))?;

        let row = self.last_row.unwrap_or(0);
        let Some(value) = self.row.as_mut().and_then(|r| r.cells.remove(&col)) else {
            return Ok(false);
        };
        let style = attr_text(e, b"s")?;
        self.write_cell(row, col, &value, style.as_deref())?;
        Ok(true)
    }

    /// 目标单元格上原有的超链接被新链接取代
    fn drop_hyperlink(&mut self, e: &BytesStart<'_>) -> Result<bool> {
        let Some(link) = &self.hyperlink else {
            return Ok(false);
        };
        let target = cell_ref(link.row, link.col);
        if attr_text(e, b"ref")?.as_deref() != Some(target.as_str()) {
            return Ok(false);
        }
        for attr in e.attributes() {
            let attr = attr?;
            if attr.key.local_name().as_ref() == b"id" {
                self.replaced.push(attr.unescape_value()?.into_owned());
            }
        }
        Ok(true)
    }

    /// 写出当前行中列号小于 `before` 的待写单元格；`None` 表示全部写出
    fn flush_row_cells(&mut self, before: Option<u32>) -> Result<()> {
        let row = self.last_row.unwrap_or(0);
        loop {
            let Some(row_state) = self.row.as_mut() else {
                return Ok(());
            };
            let Some((&col, _)) = row_state.cells.first_key_value() else {
                return Ok(());
            };
            if before.is_some_and(|limit| col >= limit) {
                return Ok(());
            }
            let Some(value) = row_state.cells.remove(&col) else {
                return Ok(());
            };
            self.write_cell(row, col, &value, None)?;
        }
    }

    /// 写出行号小于 `before` 的新行；`None` 表示全部写出
    fn flush_rows_before(&mut self, before: Option<u32>) -> Result<()> {
        while let Some((&row, _)) = self.pending.first_key_value() {
            if before.is_some_and(|limit| row >= limit) {
                break;
            }
            let Some(cells) = self.pending.remove(&row) else {
                break;
            };
            let name = self.element("row");
            let mut start = BytesStart::new(name.as_str());
            start.push_attribute(("r", (row + 1).to_string().as_str()));
            self.writer.write_event(Event::Start(start))?;
            for (col, value) in &cells {
                self.write_cell(row, *col, value, None)?;
            }
            self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Ok(())
    }

    fn write_cell(&mut self, row: u32, col: u32, value: &CellValue, style: Option<&str>) -> Result<()> {
        let name = self.element("c");
        let mut start = BytesStart::new(name.as_str());
        start.push_attribute(("r", cell_ref(row, col).as_str()));
        if let Some(style) = style {
            start.push_attribute(("s", style));
        }

        match value {
            CellValue::Blank => {
                self.writer.write_event(Event::Empty(start))?;
            }
            CellValue::Number(n) => {
                self.writer.write_event(Event::Start(start))?;
                let v = self.element("v");
                self.writer.write_event(Event::Start(BytesStart::new(v.as_str())))?;
                self.writer
                    .write_event(Event::Text(BytesText::new(&number_text(*n))))?;
                self.writer.write_event(Event::End(BytesEnd::new(v)))?;
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            CellValue::Text(text) => {
                start.push_attribute(("t", "inlineStr"));
                self.writer.write_event(Event::Start(start))?;
                let is = self.element("is");
                let t = self.element("t");
                self.writer.write_event(Event::Start(BytesStart::new(is.as_str())))?;
                let mut t_start = BytesStart::new(t.as_str());
                t_start.push_attribute(("xml:space", "preserve"));
                self.writer.write_event(Event::Start(t_start))?;
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
                self.writer.write_event(Event::End(BytesEnd::new(t)))?;
                self.writer.write_event(Event::End(BytesEnd::new(is)))?;
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }
        Ok(())
    }

    fn write_hyperlink(&mut self) -> Result<()> {
        if self.link_written {
            return Ok(());
        }
        let Some(link) = self.hyperlink.clone() else {
            return Ok(());
        };
        let mut e = BytesStart::new(self.element("hyperlink"));
        e.push_attribute(("ref", cell_ref(link.row, link.col).as_str()));
        let id_key = format!("{}:id", self.rel_prefix);
        e.push_attribute((id_key.as_str(), link.rel_id.as_str()));
        e.push_attribute(("display", link.display.as_str()));
        self.writer.write_event(Event::Empty(e))?;
        self.link_written = true;
        Ok(())
    }

    /// 工作表原本没有 `<hyperlinks>` 时，在第一个排在它之后的元素前插入
    fn maybe_insert_hyperlinks_before(&mut self, local: &[u8]) -> Result<()> {
        if self.hyperlink.is_none() || self.link_written || self.in_hyperlinks {
            return Ok(());
        }
        if local == b"hyperlinks" {
            return Ok(());
        }
        if !local.is_empty() && !AFTER_HYPERLINKS.contains(&local) {
            return Ok(());
        }
        let name = self.element("hyperlinks");
        self.writer
            .write_event(Event::Start(BytesStart::new(name.as_str())))?;
        self.write_hyperlink()?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

fn attr_text(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sheet(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{body}</worksheet>"#
        )
    }

    fn write(row: u32, col: u32, value: CellValue) -> CellWrite {
        CellWrite { row, col, value }
    }

    fn patch(xml: &str, cells: &[CellWrite], link: Option<HyperlinkPatch>) -> (String, Vec<String>) {
        let result = patch_sheet_xml(
            xml.as_bytes(),
            &SheetPatch {
                cells,
                hyperlink: link,
            },
        )
        .unwrap();
        (String::from_utf8(result.xml).unwrap(), result.replaced_rel_ids)
    }

    #[test]
    fn test_untouched_sheet_is_unchanged() {
        let xml = sheet(
            r#"<dimension ref="A1:B2"/><cols><col min="1" max="1" width="30" customWidth="1"/></cols><sheetData><row r="1" spans="1:2"><c r="A1" t="s"><v>0</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A2:B2"/></mergeCells><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
        );
        let (out, _) = patch(&xml, &[], None);
        assert!(out.contains(r#"<col min="1" max="1" width="30" customWidth="1"/>"#));
        assert!(out.contains(r#"<row r="1" spans="1:2"><c r="A1" t="s"><v>0</v></c></row>"#));
        assert!(out.contains(r#"<mergeCell ref="A2:B2"/>"#));
        assert!(out.contains(r#"<dimension ref="A1:B2"/>"#));
    }

    #[test]
    fn test_replaces_cell_keeping_style() {
        let xml = sheet(
            r#"<dimension ref="A1:C2"/><sheetData><row r="2" spans="1:3"><c r="A2" s="4"><v>1</v></c><c r="B2" s="5" t="s"><v>3</v></c><c r="C2" s="6"/></row></sheetData>"#,
        );
        let (out, _) = patch(
            &xml,
            &[
                write(1, 1, CellValue::Text("通知.doc".into())),
                write(1, 2, CellValue::Blank),
            ],
            None,
        );
        assert!(out.contains(r#"<c r="A2" s="4"><v>1</v></c>"#));
        assert!(out.contains(
            r#"<c r="B2" s="5" t="inlineStr"><is><t xml:space="preserve">通知.doc</t></is></c>"#
        ));
        assert!(out.contains(r#"<c r="C2" s="6"/>"#));
        assert!(out.contains(r#"<row r="2">"#));
    }

    #[test]
    fn test_inserts_cells_in_column_order() {
        let xml = sheet(r#"<sheetData><row r="3"><c r="B3"><v>2</v></c><c r="E3"><v>5</v></c></row></sheetData>"#);
        let (out, _) = patch(
            &xml,
            &[
                write(2, 0, CellValue::Number(1.0)),
                write(2, 3, CellValue::Number(4.0)),
                write(2, 6, CellValue::Number(7.0)),
            ],
            None,
        );
        let a = out.find(r#"<c r="A3"><v>1</v></c>"#).unwrap();
        let b = out.find(r#"<c r="B3">"#).unwrap();
        let d = out.find(r#"<c r="D3"><v>4</v></c>"#).unwrap();
        let e = out.find(r#"<c r="E3">"#).unwrap();
        let g = out.find(r#"<c r="G3"><v>7</v></c>"#).unwrap();
        assert!(a < b && b < d && d < e && e < g);
    }

    #[test]
    fn test_new_rows_keep_row_order_and_widen_dimension() {
        let xml = sheet(
            r#"<dimension ref="A1:H2"/><sheetData><row r="1"><c r="A1"><v>1</v></c></row><row r="5"><c r="A5"><v>5</v></c></row></sheetData>"#,
        );
        let (out, _) = patch(
            &xml,
            &[
                write(2, 0, CellValue::Number(3.0)),
                write(9, 8, CellValue::Text("x".into())),
            ],
            None,
        );
        let r1 = out.find(r#"<row r="1">"#).unwrap();
        let r3 = out.find(r#"<row r="3"><c r="A3"><v>3</v></c></row>"#).unwrap();
        let r5 = out.find(r#"<row r="5">"#).unwrap();
        let r10 = out.find(r#"<row r="10">"#).unwrap();
        assert!(r1 < r3 && r3 < r5 && r5 < r10);
        assert!(out.contains(r#"<dimension ref="A1:I10"/>"#));
    }

    #[test]
    fn test_empty_sheet_data_gets_rows() {
        let xml = sheet(r#"<sheetData/>"#);
        let (out, _) = patch(&xml, &[write(0, 0, CellValue::Number(1.0))], None);
        assert!(out.contains(r#"<sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData>"#));
    }

    #[test]
    fn test_hyperlinks_block_inserted_before_page_margins() {
        let xml = sheet(r#"<sheetData/><mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells><pageMargins left="0.7"/>"#);
        let link = HyperlinkPatch {
            row: 4,
            col: 3,
            rel_id: "rId2".into(),
            display: "a.doc".into(),
        };
        let (out, replaced) = patch(&xml, &[write(4, 3, CellValue::Text("a.doc".into()))], Some(link));
        assert!(replaced.is_empty());
        assert!(out.contains(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#));
        let merge = out.find("</mergeCells>").unwrap();
        let links = out
            .find(r#"<hyperlinks><hyperlink ref="D5" r:id="rId2" display="a.doc"/></hyperlinks>"#)
            .unwrap();
        let margins = out.find("<pageMargins").unwrap();
        assert!(merge < links && links < margins);
    }

    #[test]
    fn test_existing_link_on_target_is_replaced() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData/><hyperlinks><hyperlink ref="D5" r:id="rId1"/><hyperlink ref="A1" r:id="rId2"/></hyperlinks></worksheet>"#;
        let link = HyperlinkPatch {
            row: 4,
            col: 3,
            rel_id: "rId3".into(),
            display: "b.doc".into(),
        };
        let (out, replaced) = patch(xml, &[], Some(link));
        assert_eq!(replaced, vec!["rId1".to_string()]);
        assert!(!out.contains(r#"r:id="rId1""#));
        assert!(out.contains(r#"<hyperlink ref="A1" r:id="rId2"/>"#));
        assert!(out.contains(r#"<hyperlink ref="D5" r:id="rId3" display="b.doc"/></hyperlinks>"#));
    }

    #[rstest]
    #[case(r#"<c r="D2" s="3" t="str"><f>HYPERLINK("a.doc","a.doc")</f><v>a.doc</v></c>"#, true)]
    #[case(r#"<c r="D2" s="3"><f t="shared" ref="D2:D4" si="0"/><v>0</v></c>"#, true)]
    #[case(r#"<c r="D2" s="3" t="inlineStr"><is><t>a.doc</t></is></c>"#, false)]
    #[case(r#"<c r="D2" s="3"/>"#, false)]
    fn test_reports_replaced_formula(#[case] cell: &str, #[case] expected: bool) {
        let xml = sheet(&format!(
            r#"<sheetData><row r="2"><c r="C2"><f>1+1</f><v>2</v></c>{cell}</row></sheetData>"#
        ));
        let result = patch_sheet_xml(
            xml.as_bytes(),
            &SheetPatch {
                cells: &[write(1, 3, CellValue::Text("b.doc".into()))],
                hyperlink: None,
            },
        )
        .unwrap();
        assert_eq!(result.formula_replaced, expected);
        let out = String::from_utf8(result.xml).unwrap();
        assert!(out.contains(r#"<c r="C2"><f>1+1</f><v>2</v></c>"#));
        assert!(out.contains(r#"<c r="D2" s="3" t="inlineStr"><is><t xml:space="preserve">b.doc</t></is></c>"#));
    }

    #[test]
    fn test_implicit_row_and_cell_positions() {
        let xml = sheet(r#"<sheetData><row><c><v>1</v></c></row><row><c><v>2</v></c><c><v>3</v></c></row></sheetData>"#);
        let (out, _) = patch(&xml, &[write(1, 1, CellValue::Number(9.0))], None);
        assert!(out.contains(r#"<c r="B2"><v>9</v></c>"#));
        assert!(!out.contains("<v>3</v>"));
        assert!(out.contains("<v>2</v>"));
    }
}
