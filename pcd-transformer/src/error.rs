#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("missing {attribute}: {remedy}")]
    MissingAttribute {
        attribute: &'static str,
        remedy: &'static str,
    },
    #[error("stem classification failed: {0}")]
    Classification(String),
}
