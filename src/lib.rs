pub mod builder;
pub mod catalog;
mod error;
pub mod geometry;
pub mod merge;
pub mod model;
pub mod package;
pub mod sheet;

pub use builder::{DrawingIds, OverlayTemplate, RecordBuilder, SubstitutionTemplate, Template};
pub use catalog::Catalog;
pub use error::{Error, Result};
pub use model::{
    Alignment, EmbeddedImage, FieldPlacement, Record, RecordImages, TemplateDescriptor,
    TemplateKind,
};
pub use package::Package;
pub use sheet::images::AnchoredImage;

use std::time::Instant;

#[derive(Debug)]
pub struct Generated {
    pub bytes: Vec<u8>,
    pub record_count: usize,
}

/// Builds one certificate page per non-blank spreadsheet row and merges
/// them into a single document.
pub fn generate(sheet: &[u8], template: &Template) -> Result<Generated> {
    generate_with_images(sheet, template, &[])
}

/// Like [`generate`], with anchored images the caller already extracted
/// from the workbook. Images found in the workbook's drawings take
/// precedence over them.
pub fn generate_with_images(
    sheet: &[u8],
    template: &Template,
    declared: &[AnchoredImage],
) -> Result<Generated> {
    let t0 = Instant::now();

    let rows = sheet::read_sheet(sheet)?;
    let (headers, records) = sheet::extract_records(&rows)?;
    if records.is_empty() {
        return Err(Error::MalformedInput("every data row is blank".into()));
    }
    let images = sheet::images::resolve_images(sheet, &headers, declared);
    let t_extract = t0.elapsed();

    let no_images = RecordImages::new();
    let mut ids = DrawingIds::new();
    let mut packages = Vec::with_capacity(records.len());
    for record in &records {
        log::info!(
            "Rendering certificate {}/{}: {}",
            record.index + 1,
            records.len(),
            record.label()
        );
        let record_images = images.get(&record.data_row).unwrap_or(&no_images);
        let package = template
            .build(record, record_images, &mut ids)
            .map_err(|e| match e {
                Error::TemplateRender { .. } => e,
                other => Error::render(record.label(), other),
            })?;
        packages.push(package);
    }
    let t_build = t0.elapsed();

    let bytes = merge::merge(packages)?.to_bytes()?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: extract={:.1}ms, build={:.1}ms, merge={:.1}ms, total={:.1}ms ({} records, output {} bytes)",
        t_extract.as_secs_f64() * 1000.0,
        (t_build - t_extract).as_secs_f64() * 1000.0,
        (t_total - t_build).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        records.len(),
        bytes.len(),
    );

    Ok(Generated {
        bytes,
        record_count: records.len(),
    })
}

pub fn generate_from_catalog(sheet: &[u8], catalog: &Catalog, template_id: &str) -> Result<Generated> {
    let descriptor = catalog.get(template_id)?;
    let template = Template::load(descriptor, &catalog.template_path(descriptor))?;
    generate(sheet, &template)
}
