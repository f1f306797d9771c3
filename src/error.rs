use std::io;

pub type Result<T> = std::result::Result<T, EpubError>;

/// Structural problems with an EPUB archive.
#[derive(Debug, thiserror::Error)]
pub enum EpubError {
    #[error("missing archive entry: {0}")]
    MissingEntry(String),

    #[error("container.xml declares no package document")]
    MissingRootfile,

    #[error("invalid package document {path}: {reason}")]
    InvalidPackage { path: String, reason: String },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml deserialize error: {0}")]
    XmlDe(#[from] quick_xml::DeError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
