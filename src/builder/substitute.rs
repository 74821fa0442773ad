use std::sync::Arc;

use crate::error::{Error, Result};
use crate::geometry::px_to_emu;
use crate::model::{EmbeddedImage, Record, RecordImages, TEXT_FIELDS, image_slot_px};
use crate::package::Package;
use crate::package::rels::{REL_TYPE_IMAGE, Relationship, Relationships, relative_target, resolve_target};
use crate::package::xml::{Element, Namespaces, Node, WML_NS, WPD_NS};

use super::drawing::{inline_drawing, picture_graphic};
use super::{DrawingIds, RecordBuilder, normalize_raster};

const REL_TYPE_HEADER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const REL_TYPE_FOOTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";

#[derive(Clone)]
pub struct SubstitutionTemplate {
    base: Package,
}

impl SubstitutionTemplate {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(SubstitutionTemplate {
            base: Package::from_bytes(data)?,
        })
    }

    fn render(&self, record: &Record, images: &RecordImages, ids: &mut DrawingIds) -> Result<Package> {
        let mut package = self.base.clone();
        let document_part = package.main_document_path()?;
        let document_rels = package.relationships(&document_part)?;

        let mut parts = vec![document_part.clone()];
        parts.extend(
            document_rels
                .iter()
                .filter(|r| !r.external && (r.rel_type == REL_TYPE_HEADER || r.rel_type == REL_TYPE_FOOTER))
                .map(|r| resolve_target(&document_part, &r.target)),
        );

        let mut content_types = package.content_types()?;
        for part in &parts {
            let mut tree = package.xml_part(part)?;
            let mut ctx = PartContext {
                part,
                record,
                images,
                ids: &mut *ids,
                rels: package.relationships(part)?,
                media: Vec::new(),
            };
            let ns = Namespaces::of(&tree.root);
            renumber_drawings(&mut tree.root, &ns, ctx.ids);
            render_container(&mut tree.root, &ns, &mut ctx)?;

            let PartContext { rels, media, .. } = ctx;
            package.set_xml_part(part, &tree)?;
            if !media.is_empty() {
                for image in media {
                    content_types.ensure_default(&image.extension);
                    package.set_part(image.path, image.data);
                }
                package.set_relationships(part, &rels)?;
            }
        }
        package.set_content_types(&content_types)?;
        Ok(package)
    }
}

impl RecordBuilder for SubstitutionTemplate {
    fn build(&self, record: &Record, images: &RecordImages, ids: &mut DrawingIds) -> Result<Package> {
        self.render(record, images, ids).map_err(|e| match e {
            Error::TemplateRender { .. } => e,
            other => Error::render(record.label(), other),
        })
    }
}

struct NewMedia {
    path: String,
    data: Arc<[u8]>,
    extension: String,
}

struct PartContext<'a> {
    part: &'a str,
    record: &'a Record,
    images: &'a RecordImages,
    ids: &'a mut DrawingIds,
    rels: Relationships,
    media: Vec<NewMedia>,
}

impl PartContext<'_> {
    fn fail(&self, reason: impl std::fmt::Display) -> Error {
        Error::render(self.record.label(), format!("{}: {reason}", self.part))
    }

    fn picture(&mut self, field: &str, image: &EmbeddedImage) -> Element {
        let image = match normalize_raster(Arc::clone(&image.data), &image.extension) {
            Ok(normalized) => normalized,
            Err(e) => {
                log::warn!("{}: embedding {field} as-is: {e}", self.record.label());
                image.clone()
            }
        };
        let id = self.ids.next_id();
        let stem: String = field
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        let path = format!("word/media/{stem}_{id}.{}", image.extension);

        let rel_id = self.rels.next_id();
        self.rels.push(Relationship::new(
            rel_id.as_str(),
            REL_TYPE_IMAGE,
            relative_target(self.part, &path),
        ));
        self.media.push(NewMedia {
            path,
            data: image.data,
            extension: image.extension,
        });

        let (w, h) = image_slot_px(field);
        let (cx, cy) = (px_to_emu(w), px_to_emu(h));
        let graphic = picture_graphic(&rel_id, id, field, cx, cy);
        inline_drawing(id, &format!("{stem}{id}"), cx, cy, graphic)
    }
}

fn renumber_drawings(el: &mut Element, ns: &Namespaces, ids: &mut DrawingIds) {
    for child in el.children.iter_mut() {
        let Node::Element(child) = child else {
            continue;
        };
        let scope = ns.enter(child);
        if scope.is(child, WPD_NS, "docPr") {
            child.set_attr("id", ids.next_id().to_string());
        }
        renumber_drawings(child, &scope, ids);
    }
}

fn render_container(el: &mut Element, ns: &Namespaces, ctx: &mut PartContext) -> Result<()> {
    for child in el.children.iter_mut() {
        let Node::Element(child) = child else {
            continue;
        };
        let scope = ns.enter(child);
        if scope.is(child, WML_NS, "p") {
            render_paragraph(child, &scope, ctx)?;
        } else {
            render_container(child, &scope, ctx)?;
        }
    }
    Ok(())
}

struct TextSlot {
    path: Vec<usize>,
    text: String,
}

fn collect_slots(el: &Element, ns: &Namespaces, path: &mut Vec<usize>, out: &mut Vec<TextSlot>) {
    for (i, child) in el.children.iter().enumerate() {
        let Node::Element(child) = child else {
            continue;
        };
        let scope = ns.enter(child);
        path.push(i);
        if scope.is(child, WML_NS, "t") {
            out.push(TextSlot {
                path: path.clone(),
                text: child.text(),
            });
        } else if !scope.is(child, WML_NS, "p") {
            collect_slots(child, &scope, path, out);
        }
        path.pop();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder<'a> {
    Text(&'a str),
    Image(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpan<'a> {
    /// Byte range of the braces and everything between them.
    pub start: usize,
    pub end: usize,
    pub placeholder: Placeholder<'a>,
}

/// Finds `{name}` and `{%name}` placeholders. Unbalanced braces are an error.
pub fn find_placeholders(text: &str) -> std::result::Result<Vec<PlaceholderSpan<'_>>, String> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if let Some(start) = open {
                    return Err(format!("unclosed placeholder \"{}\"", &text[start..i]));
                }
                open = Some(i);
            }
            '}' => {
                let Some(start) = open.take() else {
                    return Err(format!("'}}' without opening '{{' in \"{text}\""));
                };
                let inner = text[start + 1..i].trim();
                let placeholder = match inner.strip_prefix('%') {
                    Some(name) => Placeholder::Image(name.trim()),
                    None => Placeholder::Text(inner),
                };
                if matches!(placeholder, Placeholder::Text("") | Placeholder::Image("")) {
                    return Err("empty placeholder \"{}\"".to_string());
                }
                spans.push(PlaceholderSpan {
                    start,
                    end: i + 1,
                    placeholder,
                });
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        return Err(format!("unclosed placeholder \"{}\"", &text[start..]));
    }
    Ok(spans)
}

enum Replacement {
    Text(String),
    Picture(Element),
    Keep,
}

enum Piece {
    Text(String),
    Picture(Element),
}

/// New content of one `w:t`, in document order.
#[derive(Default)]
struct SlotEdit {
    pieces: Vec<Piece>,
}

impl SlotEdit {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.pieces.last_mut() {
            Some(Piece::Text(last)) => last.push_str(text),
            _ => self.pieces.push(Piece::Text(text.to_string())),
        }
    }

    fn is_unchanged(&self, original: &str) -> bool {
        match self.pieces.as_slice() {
            [] => original.is_empty(),
            [Piece::Text(text)] => text == original,
            _ => false,
        }
    }
}

fn render_paragraph(p: &mut Element, ns: &Namespaces, ctx: &mut PartContext) -> Result<()> {
    // Paragraphs nested in text boxes first: editing them never moves the
    // runs of this paragraph.
    render_container(p, ns, ctx)?;

    let mut slots = Vec::new();
    collect_slots(p, ns, &mut Vec::new(), &mut slots);
    let full: String = slots.iter().map(|s| s.text.as_str()).collect();
    if !full.contains(['{', '}']) {
        return Ok(());
    }

    let spans = find_placeholders(&full).map_err(|reason| ctx.fail(reason))?;
    let images = ctx.images;
    let mut replacements = Vec::with_capacity(spans.len());
    for span in &spans {
        let replacement = match span.placeholder {
            Placeholder::Text(name) if TEXT_FIELDS.contains(&name) => {
                Replacement::Text(ctx.record.field_value(name).to_string())
            }
            Placeholder::Text(name) => {
                log::warn!("{}: unknown placeholder {{{name}}} left as-is", ctx.part);
                Replacement::Keep
            }
            Placeholder::Image(name) => match images.get(name) {
                Some(image) => Replacement::Picture(ctx.picture(name, image)),
                None => Replacement::Text(String::new()),
            },
        };
        replacements.push(replacement);
    }

    let mut edits: Vec<SlotEdit> = Vec::with_capacity(slots.len());
    let mut offset = 0;
    for slot in &slots {
        let (start, end) = (offset, offset + slot.text.len());
        offset = end;

        let mut edit = SlotEdit::default();
        let mut cursor = start;
        for (span, replacement) in spans.iter().zip(replacements.iter_mut()) {
            if span.end <= start || span.start >= end {
                continue;
            }
            if span.start > cursor {
                edit.push_text(&full[cursor..span.start]);
            }
            if span.start >= start {
                match replacement {
                    Replacement::Text(value) => edit.push_text(value),
                    Replacement::Picture(pic) => edit.pieces.push(Piece::Picture(std::mem::take(pic))),
                    Replacement::Keep => edit.push_text(&full[span.start..span.end]),
                }
            }
            cursor = cursor.max(span.end.min(end));
        }
        if cursor < end {
            edit.push_text(&full[cursor..end]);
        }
        edits.push(edit);
    }

    for (slot, edit) in slots.iter().zip(edits).rev() {
        if edit.is_unchanged(&slot.text) {
            continue;
        }
        let Some((&index, parent_path)) = slot.path.split_last() else {
            continue;
        };
        let parent = p
            .element_at_mut(parent_path)
            .ok_or_else(|| ctx.fail("text run moved while rendering"))?;
        let Some(Node::Element(original)) = parent.children.get(index) else {
            continue;
        };
        let mut nodes = Vec::new();
        for piece in edit.pieces {
            match piece {
                Piece::Text(text) => nodes.extend(text_nodes(original, &text)),
                Piece::Picture(pic) => nodes.push(Node::Element(pic)),
            }
        }
        if nodes.is_empty() {
            nodes = text_nodes(original, "");
        }
        parent.children.splice(index..index + 1, nodes);
    }
    Ok(())
}

fn text_nodes(original: &Element, text: &str) -> Vec<Node> {
    let br = match original.prefix() {
        Some(prefix) => format!("{prefix}:br"),
        None => "br".to_string(),
    };
    let mut nodes = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::Element(Element::new(br.as_str())));
        }
        let mut t = Element {
            name: original.name.clone(),
            attrs: original.attrs.clone(),
            children: Vec::new(),
        };
        t.set_attr("xml:space", "preserve");
        let line = line.strip_suffix('\r').unwrap_or(line);
        if !line.is_empty() {
            t.children.push(Node::Text(line.to_string()));
        }
        nodes.push(Node::Element(t));
    }
    nodes
}
