use std::{path::Path, sync::Arc};

use pcd_core::pointcloud::point::PointCloud;
use pcd_transformer::{
    CrownIsolationBuilder, PointCloudTransformer, ReflectanceCalibration, SliceStemClassifier,
    StemClassifier, Transform as _, TransformBuilder as _, Transformer as _,
};
use serde::Serialize;

use crate::{
    config::ScorchConfig,
    error::ScorchError,
    features::FeatureVector,
    histogram::{build_histogram, BinEdges},
    model::{default_model, ScorchModel},
    plot::render_histogram,
};

/// Scorch fraction as returned by the model. Values outside `[0, 1]` are
/// passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScorchPrediction {
    pub predicted_scorch: f64,
}

/// Runs crown isolation, calibration, binning and the model for one tree.
pub struct ScorchPredictor {
    config: ScorchConfig,
    bin_edges: BinEdges,
    classifier: Arc<dyn StemClassifier>,
    assume_crown_only: bool,
}

impl ScorchPredictor {
    pub fn new(config: ScorchConfig) -> Result<Self, ScorchError> {
        let bin_edges = config.bin_edges()?;
        let classifier = Arc::new(SliceStemClassifier::new(config.stem));
        Ok(Self {
            config,
            bin_edges,
            classifier,
            assume_crown_only: false,
        })
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn StemClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Treats every input as already stripped of stem and ground points.
    pub fn assume_crown_only(mut self, crown_only: bool) -> Self {
        self.assume_crown_only = crown_only;
        self
    }

    pub fn config(&self) -> &ScorchConfig {
        &self.config
    }

    pub fn features(&self, point_cloud: PointCloud) -> Result<FeatureVector, ScorchError> {
        self.features_and_plot(point_cloud, None)
    }

    fn features_and_plot(
        &self,
        point_cloud: PointCloud,
        plot: Option<&Path>,
    ) -> Result<FeatureVector, ScorchError> {
        let crown = if point_cloud.metadata.crown_only || self.assume_crown_only {
            point_cloud
        } else {
            let builder = CrownIsolationBuilder::new(self.classifier.clone())
                .ground_quantile(self.config.ground_quantile)
                .min_height(self.config.min_crown_height);
            PointCloudTransformer::new(builder.build()).execute(point_cloud)?
        };

        let calibrated = ReflectanceCalibration::new(self.config.calibration).transform(crown)?;
        let histogram = build_histogram(&calibrated, &self.bin_edges)?;

        if let Some(path) = plot {
            let title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            render_histogram(&histogram, path, &title)?;
        }

        Ok(FeatureVector::from_histogram(&histogram))
    }

    pub fn predict(
        &self,
        point_cloud: PointCloud,
        model: &dyn ScorchModel,
        plot: Option<&Path>,
    ) -> Result<ScorchPrediction, ScorchError> {
        let features = self.features_and_plot(point_cloud, plot)?;
        let predicted_scorch = model.predict(&features)?;
        log::debug!("predicted scorch {predicted_scorch:.4}");
        Ok(ScorchPrediction { predicted_scorch })
    }
}

/// Predicts crown scorch for a single tree with the default configuration.
///
/// Without an explicit `model` the one from [`default_model`] is used. Unless
/// `SCORCH_MODEL` points at a trained export, that is the packaged
/// placeholder, whose output is not a scorch estimate. When `plot` is given,
/// the reflectance histogram is also written there as a PNG.
pub fn predict_scorch(
    point_cloud: PointCloud,
    model: Option<&dyn ScorchModel>,
    plot: Option<&Path>,
) -> Result<ScorchPrediction, ScorchError> {
    let predictor = ScorchPredictor::new(ScorchConfig::default())?;
    match model {
        Some(model) => predictor.predict(point_cloud, model, plot),
        None => {
            let model = default_model()?;
            predictor.predict(point_cloud, model.as_ref(), plot)
        }
    }
}
