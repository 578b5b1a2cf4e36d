pub mod builder;
pub mod error;
pub mod runner;
pub mod transform;

use std::sync::Arc;

use pcd_core::pointcloud::point::PointCloud;

pub use builder::{CrownIsolationBuilder, TransformBuilder};
pub use error::TransformError;
pub use runner::{PointCloudTransformer, Transformer};
pub use transform::reflectance::{CalibrationConstants, ReflectanceCalibration};
pub use transform::stem::{SliceStemClassifier, StemClassifier, StemClassifierConfig};
pub use transform::{CompositeTransform, Transform};

/// Isolates the crown of a single tree with the default stem classifier.
///
/// The cloud is shifted so that its 0.1st height percentile sits at zero,
/// stem points are dropped, and so is everything at or below 1 unit height.
pub fn remove_stem(point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
    remove_stem_with(point_cloud, Arc::new(SliceStemClassifier::default()))
}

pub fn remove_stem_with(
    point_cloud: PointCloud,
    classifier: Arc<dyn StemClassifier>,
) -> Result<PointCloud, TransformError> {
    let builder = CrownIsolationBuilder::new(classifier);
    let transformer = PointCloudTransformer::new(builder.build());
    transformer.execute(point_cloud)
}

/// Attaches calibrated reflectance to every point, using the default
/// calibration constants. A cloud that already carries reflectance is
/// returned unchanged.
pub fn add_reflectance(point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
    ReflectanceCalibration::default().transform(point_cloud)
}
