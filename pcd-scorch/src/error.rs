use std::path::PathBuf;

use pcd_parser::ParseError;
use pcd_transformer::TransformError;

#[derive(Debug, thiserror::Error)]
pub enum ScorchError {
    #[error("missing {attribute}: {remedy}")]
    MissingAttribute {
        attribute: &'static str,
        remedy: &'static str,
    },
    #[error("stem classification failed: {0}")]
    Classification(String),
    #[error("scorch model unavailable at {path}: {reason}")]
    ModelUnavailable { path: PathBuf, reason: String },
    #[error("feature vector does not match the model, missing columns: {}", missing.join(", "))]
    FeatureMismatch { missing: Vec<String> },
    #[error("feature vector has {names} names but {values} values")]
    FeatureLength { names: usize, values: usize },
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("invalid bin edges: {0}")]
    InvalidBinEdges(String),
    #[error("invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },
    #[error("failed to render histogram plot: {0}")]
    Plot(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<TransformError> for ScorchError {
    fn from(error: TransformError) -> Self {
        match error {
            TransformError::MissingAttribute { attribute, remedy } => {
                ScorchError::MissingAttribute { attribute, remedy }
            }
            TransformError::Classification(message) => ScorchError::Classification(message),
        }
    }
}
