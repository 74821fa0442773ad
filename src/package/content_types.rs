use crate::error::Result;

use super::xml::{Element, XmlTree};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        "rels" => "application/vnd.openxmlformats-package.relationships+xml",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

pub struct ContentTypes {
    tree: XmlTree,
}

impl ContentTypes {
    pub fn new() -> Self {
        let root = Element::new("Types").with_attr("xmlns", CT_NS);
        let mut ct = ContentTypes {
            tree: XmlTree::new(root),
        };
        ct.ensure_default("rels");
        ct.ensure_default("xml");
        ct
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(ContentTypes {
            tree: XmlTree::parse_bytes(data)?,
        })
    }

    pub fn has_default(&self, ext: &str) -> bool {
        self.tree.root.elements().any(|el| {
            el.local_name() == "Default"
                && el
                    .attr("Extension")
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
    }

    pub fn ensure_default(&mut self, ext: &str) {
        if self.has_default(ext) {
            return;
        }
        let el = Element::new("Default")
            .with_attr("Extension", ext.to_ascii_lowercase())
            .with_attr("ContentType", mime_for_extension(ext));
        self.tree.root = std::mem::take(&mut self.tree.root).with_child(el);
    }

    pub fn ensure_override(&mut self, part_name: &str, content_type: &str) {
        let part_name = format!("/{}", part_name.trim_start_matches('/'));
        let exists = self
            .tree
            .root
            .elements()
            .any(|el| el.local_name() == "Override" && el.attr("PartName") == Some(part_name.as_str()));
        if exists {
            return;
        }
        let el = Element::new("Override")
            .with_attr("PartName", part_name)
            .with_attr("ContentType", content_type);
        self.tree.root = std::mem::take(&mut self.tree.root).with_child(el);
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        self.tree.to_bytes()
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self::new()
    }
}
