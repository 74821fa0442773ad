use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::sync::Arc;

use zip::ZipArchive;

use crate::model::{EmbeddedImage, ImageMap};
use crate::package::rels::{Relationships, rels_path_for, resolve_target};
use crate::package::xml::{DML_NS, REL_NS};

const XDR_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";

#[derive(Clone, Debug)]
pub struct AnchoredImage {
    pub row: u32,
    pub col: u32,
    pub data: Arc<[u8]>,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageExtractionWarning {
    pub part: Option<String>,
    pub message: String,
}

impl ImageExtractionWarning {
    fn new(part: Option<&str>, message: impl Into<String>) -> Self {
        ImageExtractionWarning {
            part: part.map(String::from),
            message: message.into(),
        }
    }
}

impl fmt::Display for ImageExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.part {
            Some(part) => write!(f, "image extraction ({part}): {}", self.message),
            None => write!(f, "image extraction: {}", self.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct StructuralImages {
    pub images: Vec<AnchoredImage>,
    pub warnings: Vec<ImageExtractionWarning>,
}

/// Binds pictures to `(data row, header)` pairs.
///
/// Declared anchors are bound first, then anchors recovered from the
/// drawing parts; on collision the drawing-part binding wins.
pub fn resolve_images(data: &[u8], headers: &[String], declared: &[AnchoredImage]) -> ImageMap {
    let mut map = ImageMap::new();
    for image in declared {
        bind(&mut map, headers, image);
    }

    let structural = scan_drawings(data);
    for warning in &structural.warnings {
        log::warn!("{warning}");
    }
    for image in &structural.images {
        bind(&mut map, headers, image);
    }
    map
}

fn bind(map: &mut ImageMap, headers: &[String], image: &AnchoredImage) {
    if image.row == 0 {
        return;
    }
    let Some(header) = headers.get(image.col as usize).filter(|h| !h.is_empty()) else {
        return;
    };
    let data_row = image.row as usize - 1;
    log::debug!("picture at row {} col {} bound to {header}", image.row, image.col);
    map.entry(data_row).or_default().insert(
        header.clone(),
        EmbeddedImage::new(Arc::clone(&image.data), image.extension.clone()),
    );
}

fn read_zip_text<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

fn read_zip_bytes<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut content = Vec::new();
    zip.by_name(name).ok()?.read_to_end(&mut content).ok()?;
    Some(content)
}

/// Walks every `xl/drawings/*.xml` part and resolves its cell-anchored
/// pictures through that drawing's own relationship table.
pub fn scan_drawings(data: &[u8]) -> StructuralImages {
    let mut out = StructuralImages::default();
    let mut zip = match ZipArchive::new(Cursor::new(data)) {
        Ok(zip) => zip,
        Err(e) => {
            out.warnings
                .push(ImageExtractionWarning::new(None, format!("unreadable archive: {e}")));
            return out;
        }
    };

    let mut drawings: Vec<String> = zip
        .file_names()
        .filter(|n| n.starts_with("xl/drawings/") && n.ends_with(".xml") && !n.contains("/_rels/"))
        .map(String::from)
        .collect();
    drawings.sort();

    for drawing in &drawings {
        if let Err(warning) = scan_drawing(&mut zip, drawing, &mut out) {
            out.warnings.push(warning);
        }
    }
    out
}

fn scan_drawing<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    drawing: &str,
    out: &mut StructuralImages,
) -> Result<(), ImageExtractionWarning> {
    let warn = |msg: String| ImageExtractionWarning::new(Some(drawing), msg);

    let Some(rels_xml) = read_zip_text(zip, &rels_path_for(drawing)) else {
        return Ok(());
    };
    let rels = Relationships::parse(&rels_xml).map_err(|e| warn(e.to_string()))?;

    let xml_content =
        read_zip_text(zip, drawing).ok_or_else(|| warn("part is not readable text".into()))?;
    let xml = roxmltree::Document::parse(&xml_content).map_err(|e| warn(e.to_string()))?;

    let anchors = xml.descendants().filter(|n| {
        n.tag_name().namespace() == Some(XDR_NS)
            && matches!(n.tag_name().name(), "twoCellAnchor" | "oneCellAnchor")
    });

    let mut media_cache: HashMap<String, Arc<[u8]>> = HashMap::new();
    for anchor in anchors {
        let Some(pic) = xdr(anchor, "pic") else {
            continue;
        };
        match resolve_anchor(zip, drawing, anchor, pic, &rels, &mut media_cache) {
            Ok(Some(image)) => out.images.push(image),
            Ok(None) => {}
            Err(msg) => out.warnings.push(warn(msg)),
        }
    }
    Ok(())
}

fn resolve_anchor<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    drawing: &str,
    anchor: roxmltree::Node,
    pic: roxmltree::Node,
    rels: &Relationships,
    media_cache: &mut HashMap<String, Arc<[u8]>>,
) -> Result<Option<AnchoredImage>, String> {
    let (row, col) = cell_of(anchor)?;

    let embed_id = pic
        .descendants()
        .find(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))
        .and_then(|n| n.attribute((REL_NS, "embed")))
        .ok_or_else(|| format!("picture at row {row} col {col} has no blip reference"))?;

    let rel = rels
        .get(embed_id)
        .ok_or_else(|| format!("relationship {embed_id} not found"))?;
    if rel.external {
        return Ok(None);
    }
    let media_path = resolve_target(drawing, &rel.target);

    let data = match media_cache.get(&media_path) {
        Some(d) => Arc::clone(d),
        None => {
            let bytes = read_zip_bytes(zip, &media_path)
                .ok_or_else(|| format!("media part {media_path} is missing"))?;
            let shared: Arc<[u8]> = Arc::from(bytes);
            media_cache.insert(media_path.clone(), Arc::clone(&shared));
            shared
        }
    };

    let extension = media_path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        .unwrap_or_else(|| "png".to_string());

    Ok(Some(AnchoredImage {
        row,
        col,
        data,
        extension,
    }))
}

fn xdr<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(XDR_NS))
}

fn cell_of(anchor: roxmltree::Node) -> Result<(u32, u32), String> {
    let from = xdr(anchor, "from").ok_or("anchor without xdr:from")?;
    let index = |name: &str| -> Result<u32, String> {
        let node = xdr(from, name).ok_or(format!("anchor without xdr:{name}"))?;
        let text = node.text().unwrap_or("").trim();
        text.parse::<u32>()
            .map_err(|_| format!("anchor xdr:{name} is not a number: {text:?}"))
    };
    Ok((index("row")?, index("col")?))
}
