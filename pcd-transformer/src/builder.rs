use std::sync::Arc;

use crate::transform::{
    crown::CrownIsolation, ground::GroundNormalization, height::HeightFilter, stem::StemRemoval,
    stem::StemClassifier, CompositeTransform, Transform,
};

pub const DEFAULT_GROUND_QUANTILE: f64 = 0.001;
pub const DEFAULT_MIN_CROWN_HEIGHT: f64 = 1.0;

pub trait TransformBuilder {
    fn build(&self) -> Box<dyn Transform>;
}

/// Builds the crown isolation pipeline: ground normalization, stem removal
/// and the near-ground height cut, in that order.
pub struct CrownIsolationBuilder {
    ground_quantile: f64,
    min_height: f64,
    classifier: Arc<dyn StemClassifier>,
}

impl CrownIsolationBuilder {
    pub fn new(classifier: Arc<dyn StemClassifier>) -> Self {
        Self {
            ground_quantile: DEFAULT_GROUND_QUANTILE,
            min_height: DEFAULT_MIN_CROWN_HEIGHT,
            classifier,
        }
    }

    pub fn ground_quantile(mut self, quantile: f64) -> Self {
        self.ground_quantile = quantile;
        self
    }

    pub fn min_height(mut self, min_height: f64) -> Self {
        self.min_height = min_height;
        self
    }
}

impl TransformBuilder for CrownIsolationBuilder {
    fn build(&self) -> Box<dyn Transform> {
        let ground = Box::new(GroundNormalization::new(self.ground_quantile));
        let stem = Box::new(StemRemoval::new(self.classifier.clone()));
        let height = Box::new(HeightFilter::new(self.min_height));

        let composite = CompositeTransform::new(vec![ground, stem, height]);

        Box::new(CrownIsolation::new(composite))
    }
}
