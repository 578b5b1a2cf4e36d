use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("LAS error in {path}: {source}")]
    Las {
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("required field '{field}' is missing in {path}")]
    MissingField { path: PathBuf, field: String },
    #[error("invalid value '{value}' for field '{field}' in {path}")]
    InvalidValue {
        path: PathBuf,
        field: String,
        value: String,
    },
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("no input files given")]
    NoInput,
}
