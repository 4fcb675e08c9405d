// ledger-core/src/xlsx/rels.rs
//! `.rels` 关系部件的读取与重写

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{LedgerError, Result};

pub const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const OFFICE_RELS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const HYPERLINK_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
pub const CALC_CHAIN_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn is_hyperlink(&self) -> bool {
        self.rel_type == HYPERLINK_TYPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| LedgerError::Package(format!("关系部件不是有效的 UTF-8: {e}")))?;
        let mut reader = Reader::from_str(text);
        let mut items = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let mut rel = Relationship {
                        id: String::new(),
                        rel_type: String::new(),
                        target: String::new(),
                        target_mode: None,
                    };
                    for attr in e.attributes() {
                        let attr = attr?;
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            b"TargetMode" => rel.target_mode = Some(value),
                            _ => {}
                        }
                    }
                    items.push(rel);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Self { items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// 现有 `rIdN` 中最大的 N 加一
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// 删除指定 id 的超链接关系，其他类型的关系不动
    pub fn remove_hyperlinks(&mut self, ids: &[String]) {
        self.items
            .retain(|r| !(r.is_hyperlink() && ids.iter().any(|id| *id == r.id)));
    }

    /// 删除某类型的全部关系，有删除时返回 true
    pub fn remove_type(&mut self, rel_type: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|r| r.rel_type != rel_type);
        self.items.len() != before
    }

    pub fn push_external_hyperlink(&mut self, id: &str, target: &str) {
        self.items.push(Relationship {
            id: id.to_string(),
            rel_type: HYPERLINK_TYPE.to_string(),
            target: target.to_string(),
            target_mode: Some("External".to_string()),
        });
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut root = BytesStart::new("Relationships");
        root.push_attribute(("xmlns", PACKAGE_RELS_NS));
        if self.items.is_empty() {
            writer.write_event(Event::Empty(root))?;
            return Ok(writer.into_inner());
        }

        writer.write_event(Event::Start(root))?;
        for rel in &self.items {
            let mut e = BytesStart::new("Relationship");
            e.push_attribute(("Id", rel.id.as_str()));
            e.push_attribute(("Type", rel.rel_type.as_str()));
            e.push_attribute(("Target", rel.target.as_str()));
            if let Some(mode) = &rel.target_mode {
                e.push_attribute(("TargetMode", mode.as_str()));
            }
            writer.write_event(Event::Empty(e))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
        Ok(writer.into_inner())
    }
}
