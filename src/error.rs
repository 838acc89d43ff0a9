use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid repository '{0}': expected 'owner/name'")]
    InvalidRepo(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
