use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("template '{0}' has no field placements configured")]
    MissingTemplateSetup(String),

    /// One record's document could not be built; aborts the whole batch.
    #[error("failed to render certificate for \"{record}\": {reason}")]
    TemplateRender { record: String, reason: String },

    #[error("package assembly failed: {0}")]
    PackageAssembly(String),

    #[error("catalog error: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn render(record: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::TemplateRender {
            record: record.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::PackageAssembly(format!("zip: {e}"))
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::PackageAssembly(format!("xml: {e}"))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::PackageAssembly(format!("xml: {e}"))
    }
}
