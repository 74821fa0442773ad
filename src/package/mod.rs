pub mod content_types;
pub mod rels;
pub mod xml;

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

use content_types::{CONTENT_TYPES_PART, ContentTypes};
use rels::{REL_TYPE_OFFICE_DOCUMENT, Relationships, rels_path_for, resolve_target};
use xml::XmlTree;

pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

#[derive(Clone, Debug, Default)]
pub struct Package {
    parts: Vec<(String, Arc<[u8]>)>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(data))
            .map_err(|_| Error::PackageAssembly("not a ZIP archive".into()))?;
        let mut parts = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;
            parts.push((name, Arc::from(content)));
        }
        Ok(Package { parts })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_ref())
    }

    pub fn shared_part(&self, name: &str) -> Option<Arc<[u8]>> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| Arc::clone(d))
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, &Arc<[u8]>)> {
        self.parts.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn set_part(&mut self, name: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        let name = name.into();
        let data = data.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = data,
            None => self.parts.push((name, data)),
        }
    }

    pub fn xml_part(&self, name: &str) -> Result<XmlTree> {
        let data = self
            .part(name)
            .ok_or_else(|| Error::PackageAssembly(format!("missing part {name}")))?;
        XmlTree::parse_bytes(data)
    }

    pub fn set_xml_part(&mut self, name: &str, tree: &XmlTree) -> Result<()> {
        self.set_part(name, tree.to_bytes()?);
        Ok(())
    }

    /// Relationship table of `part`; empty when the part has none.
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        match self.part(&rels_path_for(part)) {
            Some(data) => Relationships::parse_bytes(data),
            None => Ok(Relationships::default()),
        }
    }

    pub fn set_relationships(&mut self, part: &str, rels: &Relationships) -> Result<()> {
        self.set_part(rels_path_for(part), rels.to_xml()?);
        Ok(())
    }

    pub fn content_types(&self) -> Result<ContentTypes> {
        match self.part(CONTENT_TYPES_PART) {
            Some(data) => ContentTypes::parse(data),
            None => Ok(ContentTypes::new()),
        }
    }

    pub fn set_content_types(&mut self, ct: &ContentTypes) -> Result<()> {
        self.set_part(CONTENT_TYPES_PART, ct.to_xml()?);
        Ok(())
    }

    /// Path of the main document part, from the package-level relationships.
    pub fn main_document_path(&self) -> Result<String> {
        let root_rels = self.relationships("")?;
        Ok(root_rels
            .iter()
            .find(|r| r.rel_type == REL_TYPE_OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()))
    }
}
