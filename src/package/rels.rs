use crate::error::{Error, Result};

use super::xml::{Element, XmlTree};

pub const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_TYPE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const REL_TYPE_SETTINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
pub const REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn new(id: impl Into<String>, rel_type: impl Into<String>, target: impl Into<String>) -> Self {
        Relationship {
            id: id.into(),
            rel_type: rel_type.into(),
            target: target.into(),
            external: false,
        }
    }

    pub fn is_image(&self) -> bool {
        self.rel_type == REL_TYPE_IMAGE
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    pub fn parse(xml_content: &str) -> Result<Self> {
        let xml = roxmltree::Document::parse(xml_content)?;
        let mut items = Vec::new();
        for node in xml.root_element().children() {
            if node.tag_name().name() != "Relationship" {
                continue;
            }
            let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) else {
                return Err(Error::PackageAssembly(
                    "relationship without Id or Target".into(),
                ));
            };
            items.push(Relationship {
                id: id.to_string(),
                rel_type: node.attribute("Type").unwrap_or("").to_string(),
                target: target.to_string(),
                external: node.attribute("TargetMode") == Some("External"),
            });
        }
        Ok(Relationships { items })
    }

    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::PackageAssembly(format!("relationships are not UTF-8: {e}")))?;
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn push(&mut self, rel: Relationship) {
        self.items.push(rel);
    }

    /// First free `rIdN` above every numeric id already present.
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

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("Relationships").with_attr("xmlns", PKG_REL_NS);
        for rel in &self.items {
            let mut el = Element::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if rel.external {
                el = el.with_attr("TargetMode", "External");
            }
            root = root.with_child(el);
        }
        XmlTree::new(root).to_bytes()
    }
}

/// `word/document.xml` → `word/_rels/document.xml.rels`
pub fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Inverse of [`resolve_target`]: the target a relationship of
/// `source_part` should carry to reach `part_path`.
pub fn relative_target(source_part: &str, part_path: &str) -> String {
    let dir = source_part.rsplit_once('/').map_or("", |(d, _)| d);
    if dir.is_empty() {
        return part_path.to_string();
    }
    match part_path.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => format!("/{part_path}"),
    }
}

pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
