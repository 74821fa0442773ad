use std::sync::Arc;

use crate::error::{Error, Result};
use crate::geometry::{
    EmuRect, PAGE_HEIGHT_EMU, PAGE_HEIGHT_TWIPS, PAGE_WIDTH_EMU, PAGE_WIDTH_TWIPS,
    half_points_to_pt,
};
use crate::model::{EmbeddedImage, FieldPlacement, Record, RecordImages};
use crate::package::Package;
use crate::package::content_types::ContentTypes;
use crate::package::rels::{
    REL_TYPE_IMAGE, REL_TYPE_OFFICE_DOCUMENT, REL_TYPE_SETTINGS, REL_TYPE_STYLES, Relationship,
    Relationships,
};
use crate::package::xml::{DML_NS, Element, PIC_NS, REL_NS, WML_NS, WPD_NS, WPS_NS, XmlTree};

use super::drawing::{anchored_drawing, picture_graphic, text_box_graphic};
use super::{DrawingIds, RecordBuilder, normalize_raster};

const DOCUMENT_PART: &str = "word/document.xml";
const BACKGROUND_REL_ID: &str = "rId3";

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Normal" w:default="1"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style></w:styles>"#;

const SETTINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:compat><w:compatSetting w:name="compatibilityMode" w:uri="http://schemas.microsoft.com/office/word" w:val="15"/></w:compat></w:settings>"#;

pub struct OverlayTemplate {
    background: EmbeddedImage,
    fields: Vec<FieldPlacement>,
}

impl OverlayTemplate {
    /// Fails with `MissingTemplateSetup` when no field has been placed yet.
    pub fn new(
        name: &str,
        background: impl Into<Arc<[u8]>>,
        extension_hint: &str,
        fields: Vec<FieldPlacement>,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::MissingTemplateSetup(name.to_string()));
        }
        let background = normalize_raster(background.into(), extension_hint)?;
        Ok(OverlayTemplate { background, fields })
    }

    pub fn background(&self) -> &EmbeddedImage {
        &self.background
    }

    fn media_path(&self) -> String {
        format!("word/media/cert_bg.{}", self.background.extension)
    }

    fn document(&self, record: &Record, ids: &mut DrawingIds) -> XmlTree {
        let page = (PAGE_WIDTH_EMU, PAGE_HEIGHT_EMU);
        let mut body = Element::new("w:body").with_child(background_paragraph(ids.next_id()));

        for field in &self.fields {
            let value = record.field_value(&field.name);
            let rect = EmuRect::from_percent(field.x, field.y, field.width, field.height, page);
            log::debug!(
                "{} at ({}, {}) size {}x{} EMU, {}pt",
                field.name,
                rect.x,
                rect.y,
                rect.cx,
                rect.cy,
                half_points_to_pt(field.font_size)
            );
            body = body.with_child(text_box_paragraph(value, field, rect, ids.next_id()));
        }

        body = body.with_child(page_section());

        let root = Element::new("w:document")
            .with_attr("xmlns:w", WML_NS)
            .with_attr("xmlns:r", REL_NS)
            .with_attr("xmlns:wp", WPD_NS)
            .with_attr("xmlns:a", DML_NS)
            .with_attr("xmlns:pic", PIC_NS)
            .with_attr("xmlns:wps", WPS_NS)
            .with_child(body);
        XmlTree::new(root)
    }
}

fn background_paragraph(id: u32) -> Element {
    let full_page = EmuRect {
        x: 0,
        y: 0,
        cx: PAGE_WIDTH_EMU,
        cy: PAGE_HEIGHT_EMU,
    };
    let graphic = picture_graphic(BACKGROUND_REL_ID, id, "bg", PAGE_WIDTH_EMU, PAGE_HEIGHT_EMU);
    Element::new("w:p")
        .with_child(
            Element::new("w:pPr").with_child(
                Element::new("w:spacing")
                    .with_attr("w:line", "240")
                    .with_attr("w:lineRule", "auto"),
            ),
        )
        .with_child(Element::new("w:r").with_child(anchored_drawing(
            id,
            &format!("bg{id}"),
            full_page,
            true,
            graphic,
        )))
}

fn justification(field: &FieldPlacement) -> Element {
    Element::new("w:pPr").with_child(Element::new("w:jc").with_attr("w:val", field.align.as_wml()))
}

fn text_box_paragraph(value: &str, field: &FieldPlacement, rect: EmuRect, id: u32) -> Element {
    let size = field.font_size.to_string();
    let mut run_props = Element::new("w:rPr");
    if field.bold {
        run_props = run_props
            .with_child(Element::new("w:b"))
            .with_child(Element::new("w:bCs"));
    }
    run_props = run_props
        .with_child(Element::new("w:sz").with_attr("w:val", size.as_str()))
        .with_child(Element::new("w:szCs").with_attr("w:val", size.as_str()));

    let text = Element::new("w:t")
        .with_attr("xml:space", "preserve")
        .with_text(value);
    let content = Element::new("w:txbxContent").with_child(
        Element::new("w:p")
            .with_child(justification(field))
            .with_child(Element::new("w:r").with_child(run_props).with_child(text)),
    );

    let graphic = text_box_graphic(rect.cx, rect.cy, content);
    Element::new("w:p")
        .with_child(justification(field))
        .with_child(Element::new("w:r").with_child(anchored_drawing(
            id,
            &format!("tb{id}"),
            rect,
            false,
            graphic,
        )))
}

fn page_section() -> Element {
    Element::new("w:sectPr")
        .with_child(
            Element::new("w:pgSz")
                .with_attr("w:w", PAGE_WIDTH_TWIPS.to_string())
                .with_attr("w:h", PAGE_HEIGHT_TWIPS.to_string()),
        )
        .with_child(
            Element::new("w:pgMar")
                .with_attr("w:top", "0")
                .with_attr("w:right", "0")
                .with_attr("w:bottom", "0")
                .with_attr("w:left", "0")
                .with_attr("w:header", "0")
                .with_attr("w:footer", "0")
                .with_attr("w:gutter", "0"),
        )
}

impl RecordBuilder for OverlayTemplate {
    fn build(&self, record: &Record, _images: &RecordImages, ids: &mut DrawingIds) -> Result<Package> {
        let document = self.document(record, ids);

        let mut root_rels = Relationships::default();
        root_rels.push(Relationship::new("rId1", REL_TYPE_OFFICE_DOCUMENT, DOCUMENT_PART));

        let mut doc_rels = Relationships::default();
        doc_rels.push(Relationship::new("rId1", REL_TYPE_STYLES, "styles.xml"));
        doc_rels.push(Relationship::new("rId2", REL_TYPE_SETTINGS, "settings.xml"));
        doc_rels.push(Relationship::new(
            BACKGROUND_REL_ID,
            REL_TYPE_IMAGE,
            format!("media/cert_bg.{}", self.background.extension),
        ));

        let mut content_types = ContentTypes::new();
        content_types.ensure_default(&self.background.extension);
        content_types.ensure_override(
            DOCUMENT_PART,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        );
        content_types.ensure_override(
            "word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
        );
        content_types.ensure_override(
            "word/settings.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml",
        );

        let mut package = Package::new();
        package.set_content_types(&content_types)?;
        package.set_relationships("", &root_rels)?;
        package.set_xml_part(DOCUMENT_PART, &document)?;
        package.set_relationships(DOCUMENT_PART, &doc_rels)?;
        package.set_part("word/styles.xml", STYLES_XML.as_bytes());
        package.set_part("word/settings.xml", SETTINGS_XML.as_bytes());
        package.set_part(self.media_path(), Arc::clone(&self.background.data));
        Ok(package)
    }
}
