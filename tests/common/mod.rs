#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Zip container holding `parts` in the given order.
pub fn zip_bytes(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn read_parts(data: &[u8]) -> HashMap<String, Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut parts = HashMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        parts.insert(entry.name().to_string(), content);
    }
    parts
}

pub fn part_text(data: &[u8], name: &str) -> String {
    let parts = read_parts(data);
    let bytes = parts
        .get(name)
        .unwrap_or_else(|| panic!("missing part {name}"));
    String::from_utf8(bytes.clone()).unwrap()
}

/// Concatenated `w:t` text of every top-level body paragraph.
pub fn paragraph_texts(document_xml: &str) -> Vec<String> {
    let doc = roxmltree::Document::parse(document_xml).unwrap();
    let body = doc
        .descendants()
        .find(|n| n.has_tag_name((W_NS, "body")))
        .unwrap();
    body.children()
        .filter(|n| n.has_tag_name((W_NS, "p")))
        .map(|p| {
            p.descendants()
                .filter(|n| n.has_tag_name((W_NS, "t")))
                .filter_map(|t| t.text())
                .collect()
        })
        .collect()
}

/// Solid-colour PNG of the given size.
pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

pub fn webp(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::WebP)
        .unwrap();
    out
}

fn column_name(mut col: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn sheet_xml(rows: &[&[&str]], with_drawing: bool) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell = format!("{}{}", column_name(c), r + 1);
            if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{cell}"><v>{value}</v></c>"#));
            } else {
                xml.push_str(&format!(
                    r#"<c r="{cell}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    escape(value)
                ));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    if with_drawing {
        xml.push_str(r#"<drawing r:id="rId1"/>"#);
    }
    xml.push_str("</worksheet>");
    xml
}

/// A picture placed on the sheet: 0-based anchor row/col, bytes, extension.
pub struct SheetPicture<'a> {
    pub row: u32,
    pub col: u32,
    pub data: &'a [u8],
    pub extension: &'a str,
}

fn drawing_xml(pictures: &[SheetPicture]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
    );
    for (i, pic) in pictures.iter().enumerate() {
        xml.push_str(&format!(
            r#"<xdr:twoCellAnchor editAs="oneCell"><xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:to><xdr:col>{col}</xdr:col><xdr:colOff>9525</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>9525</xdr:rowOff></xdr:to><xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{id}" name="Picture {id}"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="rId{n}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr></xdr:pic><xdr:clientData/></xdr:twoCellAnchor>"#,
            col = pic.col,
            row = pic.row,
            id = i + 2,
            n = i + 1,
        ));
    }
    xml.push_str("</xdr:wsDr>");
    xml
}

fn drawing_rels(pictures: &[SheetPicture]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, pic) in pictures.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{n}.{ext}"/>"#,
            n = i + 1,
            ext = pic.extension,
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// `.xlsx` with one sheet holding `rows`, and `pictures` anchored on it.
pub fn xlsx_with_pictures(rows: &[&[&str]], pictures: &[SheetPicture]) -> Vec<u8> {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
    let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    let sheet_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#;

    let has_pictures = !pictures.is_empty();
    let sheet = sheet_xml(rows, has_pictures);
    let drawing = drawing_xml(pictures);
    let drawing_rels = drawing_rels(pictures);
    let media_names: Vec<String> = pictures
        .iter()
        .enumerate()
        .map(|(i, p)| format!("xl/media/image{}.{}", i + 1, p.extension))
        .collect();

    let mut parts: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", content_types.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
    ];
    if has_pictures {
        parts.push(("xl/worksheets/_rels/sheet1.xml.rels", sheet_rels.as_bytes()));
        parts.push(("xl/drawings/drawing1.xml", drawing.as_bytes()));
        parts.push(("xl/drawings/_rels/drawing1.xml.rels", drawing_rels.as_bytes()));
        for (name, pic) in media_names.iter().zip(pictures) {
            parts.push((name.as_str(), pic.data));
        }
    }
    zip_bytes(&parts)
}

pub fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
    xlsx_with_pictures(rows, &[])
}

fn biff_record(out: &mut Vec<u8>, typ: u16, data: &[u8]) {
    out.extend_from_slice(&typ.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn biff_bof(substream: u16) -> [u8; 16] {
    let mut bof = [0u8; 16];
    bof[..2].copy_from_slice(&0x0600u16.to_le_bytes());
    bof[2..4].copy_from_slice(&substream.to_le_bytes());
    bof
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

const END_OF_CHAIN: u32 = 0xFFFF_FFFE;
const FREE_SECTOR: u32 = 0xFFFF_FFFF;

fn directory_entry(name: &str, kind: u8, child: u32, start: u32, size: u32) -> [u8; 128] {
    let mut entry = [0u8; 128];
    let units: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in units.iter().enumerate() {
        put_u16(&mut entry, 2 * i, *unit);
    }
    if !name.is_empty() {
        put_u16(&mut entry, 64, ((units.len() + 1) * 2) as u16);
    }
    entry[66] = kind;
    entry[67] = 1;
    put_u32(&mut entry, 68, FREE_SECTOR);
    put_u32(&mut entry, 72, FREE_SECTOR);
    put_u32(&mut entry, 76, child);
    put_u32(&mut entry, 116, start);
    put_u32(&mut entry, 120, size);
    entry
}

/// Legacy BIFF8 `.xls`: one sheet of LABEL/NUMBER cells in a `Workbook`
/// stream, wrapped in a version 3 compound file (512-byte sectors: FAT,
/// directory, then the stream). Text cells must be ASCII.
pub fn xls(rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet = Vec::new();
    biff_record(&mut sheet, 0x0809, &biff_bof(0x0010));
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let mut cell = Vec::new();
            cell.extend_from_slice(&(r as u16).to_le_bytes());
            cell.extend_from_slice(&(c as u16).to_le_bytes());
            cell.extend_from_slice(&0u16.to_le_bytes());
            match value.parse::<f64>() {
                Ok(n) => {
                    cell.extend_from_slice(&n.to_le_bytes());
                    biff_record(&mut sheet, 0x0203, &cell);
                }
                Err(_) => {
                    assert!(value.is_ascii(), "xls fixture text must be ASCII: {value}");
                    cell.extend_from_slice(&(value.len() as u16).to_le_bytes());
                    cell.push(0);
                    cell.extend_from_slice(value.as_bytes());
                    biff_record(&mut sheet, 0x0204, &cell);
                }
            }
        }
    }
    biff_record(&mut sheet, 0x000A, &[]);

    let name = b"Sheet1";
    let mut bound_sheet = vec![0u8; 4];
    bound_sheet.extend_from_slice(&[0, 0, name.len() as u8, 0]);
    bound_sheet.extend_from_slice(name);
    let mut workbook = Vec::new();
    biff_record(&mut workbook, 0x0809, &biff_bof(0x0005));
    let sheet_offset = workbook.len() + 4 + bound_sheet.len() + 4;
    put_u32(&mut bound_sheet, 0, sheet_offset as u32);
    biff_record(&mut workbook, 0x0085, &bound_sheet);
    biff_record(&mut workbook, 0x000A, &[]);
    workbook.extend_from_slice(&sheet);
    // Streams under 4096 bytes would live in the mini stream.
    let padded = workbook.len().max(4096).div_ceil(512) * 512;
    workbook.resize(padded, 0);
    let stream_sectors = padded / 512;
    assert!(stream_sectors + 2 <= 128, "xls fixture too large");

    let mut header = vec![0u8; 512];
    header[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    put_u16(&mut header, 24, 0x003E);
    put_u16(&mut header, 26, 3);
    put_u16(&mut header, 28, 0xFFFE);
    put_u16(&mut header, 30, 9);
    put_u16(&mut header, 32, 6);
    put_u32(&mut header, 44, 1);
    put_u32(&mut header, 48, 1);
    put_u32(&mut header, 56, 4096);
    put_u32(&mut header, 60, END_OF_CHAIN);
    put_u32(&mut header, 68, END_OF_CHAIN);
    put_u32(&mut header, 76, 0);
    for i in 1..109 {
        put_u32(&mut header, 76 + 4 * i, FREE_SECTOR);
    }

    let mut fat = vec![0u8; 512];
    for i in 0..128 {
        put_u32(&mut fat, 4 * i, FREE_SECTOR);
    }
    put_u32(&mut fat, 0, 0xFFFF_FFFD);
    put_u32(&mut fat, 4, END_OF_CHAIN);
    for k in 0..stream_sectors {
        let next = if k + 1 < stream_sectors { (k + 3) as u32 } else { END_OF_CHAIN };
        put_u32(&mut fat, 4 * (k + 2), next);
    }

    let mut directory = Vec::with_capacity(512);
    directory.extend_from_slice(&directory_entry("Root Entry", 5, 1, END_OF_CHAIN, 0));
    directory.extend_from_slice(&directory_entry("Workbook", 2, FREE_SECTOR, 2, padded as u32));
    directory.extend_from_slice(&directory_entry("", 0, FREE_SECTOR, 0, 0));
    directory.extend_from_slice(&directory_entry("", 0, FREE_SECTOR, 0, 0));

    let mut out = header;
    out.extend_from_slice(&fat);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&workbook);
    out
}

pub const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body>"#;
pub const SECTION: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#;

/// `.docx` whose body is `body_xml` followed by a section, with optional
/// extra parts and document relationships.
pub fn docx_with(body_xml: &str, extra_rels: &str, extra_parts: &[(&str, &[u8])]) -> Vec<u8> {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
    let document_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>{extra_rels}</Relationships>"#
    );
    let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;
    let document = format!("{DOCUMENT_OPEN}{body_xml}{SECTION}</w:body></w:document>");

    let mut parts: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", content_types.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("word/_rels/document.xml.rels", document_rels.as_bytes()),
        ("word/styles.xml", styles.as_bytes()),
    ];
    parts.extend_from_slice(extra_parts);
    zip_bytes(&parts)
}

pub fn docx(body_xml: &str) -> Vec<u8> {
    docx_with(body_xml, "", &[])
}

/// Relationship id → target of a part's relationship table.
pub fn relationships(package: &[u8], rels_part: &str) -> HashMap<String, String> {
    let xml = part_text(package, rels_part);
    let doc = roxmltree::Document::parse(&xml).unwrap();
    doc.root_element()
        .children()
        .filter(|n| n.has_tag_name("Relationship"))
        .map(|n| {
            (
                n.attribute("Id").unwrap().to_string(),
                n.attribute("Target").unwrap().to_string(),
            )
        })
        .collect()
}
