use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON export error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed profile: {0}")]
    MalformedProfile(String),

    #[error("Invalid LCPI expression at line {line}: {message}")]
    InvalidExpression { line: usize, message: String },

    #[error("Expression parse error: {0}")]
    ParseError(String),

    #[error("Rule store error: {0}")]
    RuleStore(String),

    #[error("No hotspots found: {0}")]
    NoHotspots(String),
}
