use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const TEXT_FIELDS: [&str; 13] = [
    "ho_ten",
    "ngay_sinh",
    "noi_sinh",
    "khoa_hoc",
    "tu_ngay",
    "den_ngay",
    "ket_qua",
    "xep_loai",
    "so_quyet_dinh",
    "so_vao_so",
    "ngay_ky",
    "thang_ky",
    "nam_ky",
];

pub const PHOTO_FIELD: &str = "anh_the";
pub const SIGNATURE_FIELD: &str = "chu_ky";

pub fn image_slot_px(field: &str) -> (i64, i64) {
    match field {
        PHOTO_FIELD => (85, 113),
        SIGNATURE_FIELD => (150, 60),
        _ => (100, 80),
    }
}

/// One non-blank data row of the spreadsheet.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Position among non-blank data rows, contiguous from 0.
    pub index: usize,
    /// Position among all data rows (spreadsheet row - 1), blanks included.
    pub data_row: usize,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(index: usize, data_row: usize, fields: Vec<(String, String)>) -> Self {
        Record {
            index,
            data_row,
            fields,
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// Resolves a vocabulary field; absent fields are empty.
    /// `ket_qua` falls back to `xep_loai` when missing or blank.
    pub fn field_value(&self, name: &str) -> &str {
        let own = self.get(name).unwrap_or("");
        if name == "ket_qua" && own.is_empty() {
            return self.get("xep_loai").unwrap_or("");
        }
        own
    }

    pub fn label(&self) -> String {
        match self.get("ho_ten") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("#{}", self.index + 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedImage {
    pub data: Arc<[u8]>,
    pub extension: String,
}

impl EmbeddedImage {
    pub fn new(data: impl Into<Arc<[u8]>>, extension: impl Into<String>) -> Self {
        EmbeddedImage {
            data: data.into(),
            extension: extension.into(),
        }
    }
}

pub type RecordImages = HashMap<String, EmbeddedImage>;

pub type ImageMap = HashMap<usize, RecordImages>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    #[serde(alias = "both")]
    Justify,
}

impl Alignment {
    pub fn as_wml(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

fn default_width() -> f64 {
    40.0
}

fn default_height() -> f64 {
    5.0
}

fn default_font_size() -> u32 {
    22
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPlacement {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// Half-points; 22 is 11pt.
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub align: Alignment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    #[serde(rename = "docx")]
    Substitution,
    #[serde(rename = "image")]
    Overlay,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    #[serde(rename = "filename")]
    pub path: PathBuf,
    #[serde(default)]
    pub fields: Vec<FieldPlacement>,
}

impl TemplateDescriptor {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
