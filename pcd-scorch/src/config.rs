use std::path::Path;

use pcd_transformer::{
    builder::{DEFAULT_GROUND_QUANTILE, DEFAULT_MIN_CROWN_HEIGHT},
    CalibrationConstants, StemClassifierConfig,
};
use serde::{Deserialize, Serialize};

use crate::{error::ScorchError, histogram::BinEdges};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            min: BinEdges::DEFAULT_MIN,
            max: BinEdges::DEFAULT_MAX,
            step: BinEdges::DEFAULT_STEP,
        }
    }
}

/// Tunables of the scorch pipeline. Every field is optional in the JSON
/// form and falls back to the values the bundled model was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorchConfig {
    pub ground_quantile: f64,
    pub min_crown_height: f64,
    pub calibration: CalibrationConstants,
    pub stem: StemClassifierConfig,
    pub bins: BinConfig,
}

impl Default for ScorchConfig {
    fn default() -> Self {
        Self {
            ground_quantile: DEFAULT_GROUND_QUANTILE,
            min_crown_height: DEFAULT_MIN_CROWN_HEIGHT,
            calibration: CalibrationConstants::default(),
            stem: StemClassifierConfig::default(),
            bins: BinConfig::default(),
        }
    }
}

impl ScorchConfig {
    pub fn from_path(path: &Path) -> Result<Self, ScorchError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScorchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ScorchConfig =
            serde_json::from_str(&content).map_err(|e| ScorchError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !(0.0..=1.0).contains(&config.ground_quantile) {
            return Err(ScorchError::Config {
                path: path.to_path_buf(),
                reason: format!(
                    "ground_quantile must be within [0, 1], got {}",
                    config.ground_quantile
                ),
            });
        }
        config.stem.validate().map_err(|e| ScorchError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if config.bins != BinConfig::default() {
            log::warn!(
                "custom histogram bins {:?} differ from the bins the bundled model was trained with",
                config.bins
            );
        }

        Ok(config)
    }

    pub fn bin_edges(&self) -> Result<BinEdges, ScorchError> {
        BinEdges::regular(self.bins.min, self.bins.max, self.bins.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.json");
        std::fs::write(&path, r#"{ "min_crown_height": 2.5, "stem": { "min_points": 50 } }"#)
            .unwrap();

        let config = ScorchConfig::from_path(&path).unwrap();
        assert_eq!(config.min_crown_height, 2.5);
        assert_eq!(config.stem.min_points, 50);
        assert_eq!(config.stem.slice_height, 0.5);
        assert_eq!(config.ground_quantile, 0.001);
        assert_eq!(config.calibration, CalibrationConstants::default());
        assert_eq!(config.bin_edges().unwrap(), BinEdges::default());
    }

    #[test]
    fn out_of_range_quantile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.json");
        std::fs::write(&path, r#"{ "ground_quantile": 2.0 }"#).unwrap();

        assert!(matches!(
            ScorchConfig::from_path(&path),
            Err(ScorchError::Config { .. })
        ));
    }

    #[test]
    fn zero_slice_height_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.json");
        std::fs::write(&path, r#"{ "stem": { "slice_height": 0 } }"#).unwrap();

        assert!(matches!(
            ScorchConfig::from_path(&path),
            Err(ScorchError::Config { reason, .. }) if reason.contains("slice_height")
        ));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ScorchConfig::from_path(&path),
            Err(ScorchError::Config { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = ScorchConfig::from_path(Path::new("/nonexistent/scorch.json"));
        assert!(matches!(result, Err(ScorchError::Io { .. })));
    }
}
