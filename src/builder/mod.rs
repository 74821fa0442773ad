pub mod drawing;
pub mod overlay;
pub mod substitute;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;

use crate::error::{Error, Result};
use crate::model::{EmbeddedImage, Record, RecordImages, TemplateDescriptor, TemplateKind};
use crate::package::Package;

pub use overlay::OverlayTemplate;
pub use substitute::SubstitutionTemplate;

/// Monotonic source of drawing object ids (`wp:docPr/@id`).
#[derive(Debug, Clone)]
pub struct DrawingIds {
    next: u32,
}

impl DrawingIds {
    pub fn new() -> Self {
        DrawingIds { next: 1 }
    }

    pub fn starting_at(first: u32) -> Self {
        DrawingIds { next: first.max(1) }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}

impl Default for DrawingIds {
    fn default() -> Self {
        Self::new()
    }
}

pub trait RecordBuilder {
    fn build(&self, record: &Record, images: &RecordImages, ids: &mut DrawingIds) -> Result<Package>;
}

pub enum Template {
    Substitution(SubstitutionTemplate),
    Overlay(OverlayTemplate),
}

impl Template {
    pub fn from_descriptor(descriptor: &TemplateDescriptor, data: Vec<u8>) -> Result<Self> {
        match descriptor.kind {
            TemplateKind::Substitution => {
                Ok(Template::Substitution(SubstitutionTemplate::from_bytes(&data)?))
            }
            TemplateKind::Overlay => {
                let hint = descriptor
                    .path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("png");
                Ok(Template::Overlay(OverlayTemplate::new(
                    descriptor.display_name(),
                    data,
                    hint,
                    descriptor.fields.clone(),
                )?))
            }
        }
    }

    pub fn load(descriptor: &TemplateDescriptor, path: &Path) -> Result<Self> {
        // Overlay setup is checked before touching the file.
        if descriptor.kind == TemplateKind::Overlay && descriptor.fields.is_empty() {
            return Err(Error::MissingTemplateSetup(descriptor.display_name().to_string()));
        }
        let data = std::fs::read(path)?;
        Self::from_descriptor(descriptor, data)
    }
}

impl RecordBuilder for Template {
    fn build(&self, record: &Record, images: &RecordImages, ids: &mut DrawingIds) -> Result<Package> {
        match self {
            Template::Substitution(t) => t.build(record, images, ids),
            Template::Overlay(t) => t.build(record, images, ids),
        }
    }
}

fn extension_of(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::Bmp => Some("bmp"),
        ImageFormat::Tiff => Some("tiff"),
        _ => None,
    }
}

/// Makes sure a raster can be embedded in a Word document: formats Word
/// reads natively pass through untouched, anything else decodable (WebP)
/// is re-encoded as PNG. Unrecognized bytes keep their extension hint.
pub fn normalize_raster(data: Arc<[u8]>, hint: &str) -> Result<EmbeddedImage> {
    let Ok(format) = image::guess_format(&data) else {
        return Ok(EmbeddedImage::new(data, hint.to_ascii_lowercase()));
    };
    if let Some(ext) = extension_of(format) {
        return Ok(EmbeddedImage::new(data, ext));
    }

    let decoded = image::load_from_memory_with_format(&data, format)
        .map_err(|e| Error::PackageAssembly(format!("cannot decode {format:?} image: {e}")))?;
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::PackageAssembly(format!("cannot re-encode image as PNG: {e}")))?;
    log::debug!("converted {format:?} image ({} bytes) to PNG ({} bytes)", data.len(), png.len());
    Ok(EmbeddedImage::new(png, "png"))
}
