use std::{
    env,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crate::{error::ScorchError, features::FeatureVector};

pub mod forest;

pub use forest::ForestModel;

/// Environment variable overriding the location of the default model.
pub const MODEL_PATH_ENV: &str = "SCORCH_MODEL";

/// A pre-trained regressor mapping a reflectance feature vector to a
/// scorch fraction.
pub trait ScorchModel: Send + Sync {
    /// Columns the model was trained on.
    fn feature_names(&self) -> &[String];

    fn predict(&self, features: &FeatureVector) -> Result<f64, ScorchError>;
}

static DEFAULT_MODEL: OnceLock<Arc<ForestModel>> = OnceLock::new();

pub fn load_model(path: &Path) -> Result<ForestModel, ScorchError> {
    let start = std::time::Instant::now();
    let content = std::fs::read_to_string(path).map_err(|e| ScorchError::ModelUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let model = ForestModel::from_json(&content).map_err(|e| ScorchError::ModelUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    log::info!(
        "loaded model {:?} ({} trees, {} features) in {:?}",
        path,
        model.tree_count(),
        model.feature_names().len(),
        start.elapsed()
    );
    Ok(model)
}

/// Location of the packaged model, unless `SCORCH_MODEL` points elsewhere.
pub fn default_model_path() -> PathBuf {
    match env::var_os(MODEL_PATH_ENV) {
        Some(path) => PathBuf::from(path),
        None => Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("models")
            .join("default_scorch_model.json"),
    }
}

/// The model at [`default_model_path`], loaded on first use and shared
/// afterwards.
///
/// The packaged file is an untrained placeholder with the right column
/// layout; its predictions carry no meaning. Set `SCORCH_MODEL` to a
/// trained export for real estimates.
pub fn default_model() -> Result<Arc<ForestModel>, ScorchError> {
    if let Some(model) = DEFAULT_MODEL.get() {
        return Ok(model.clone());
    }

    if env::var_os(MODEL_PATH_ENV).is_none() {
        log::warn!(
            "{} is not set, using the packaged placeholder model; predictions are not scorch estimates",
            MODEL_PATH_ENV
        );
    }
    let model = Arc::new(load_model(&default_model_path())?);
    // Another thread may have won the race; either copy is identical.
    Ok(DEFAULT_MODEL.get_or_init(|| model).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::BinEdges;

    #[test]
    fn packaged_model_loads_and_matches_default_bins() {
        let model = load_model(
            &Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("models")
                .join("default_scorch_model.json"),
        )
        .unwrap();

        let expected: Vec<String> = BinEdges::default()
            .edges()
            .windows(2)
            .map(|w| FeatureVector::feature_name((w[0] + w[1]) / 2.0))
            .collect();
        assert_eq!(model.feature_names(), expected.as_slice());
        assert!(model.description.contains("placeholder"));
    }

    #[test]
    fn default_model_is_cached() {
        let first = default_model().unwrap();
        let second = default_model().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_model_is_unavailable() {
        let result = load_model(Path::new("/nonexistent/model.json"));
        assert!(matches!(result, Err(ScorchError::ModelUnavailable { .. })));
    }

    #[test]
    fn unparsable_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            load_model(&path),
            Err(ScorchError::ModelUnavailable { .. })
        ));
    }
}
