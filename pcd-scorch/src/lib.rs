//! Crown fire-scorch estimation from terrestrial lidar point clouds.
//!
//! The pipeline isolates the crown of a single tree, calibrates raw
//! intensity into reflectance, bins reflectance into a fixed histogram and
//! feeds the histogram densities to a pre-trained regression model.

pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod histogram;
pub mod model;
pub mod plot;
pub mod predictor;

pub use batch::{list_point_cloud_files, predict_directory, predict_files, BatchPolicy, BatchRecord};
pub use config::ScorchConfig;
pub use error::ScorchError;
pub use features::FeatureVector;
pub use histogram::{build_histogram, BinEdges, Histogram};
pub use model::{default_model, load_model, ForestModel, ScorchModel};
pub use pcd_transformer::{add_reflectance, remove_stem, remove_stem_with};
pub use predictor::{predict_scorch, ScorchPrediction, ScorchPredictor};

use pcd_core::pointcloud::point::PointCloud;

/// Histogram of calibrated reflectance over `bin_edges`, or over the
/// default edges the bundled model was trained with.
pub fn get_histogram(
    point_cloud: &PointCloud,
    bin_edges: Option<&BinEdges>,
) -> Result<Histogram, ScorchError> {
    match bin_edges {
        Some(edges) => build_histogram(point_cloud, edges),
        None => build_histogram(point_cloud, &BinEdges::default()),
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::point::Point;

    use super::*;

    #[test]
    fn get_histogram_defaults_to_model_bins() {
        let pc = PointCloud::new(vec![Point::new(0.0, 0.0, 2.0).with_reflectance(-7.5)]);
        assert_eq!(get_histogram(&pc, None).unwrap().len(), 100);

        let edges = BinEdges::new(vec![-10.0, -5.0]).unwrap();
        let histogram = get_histogram(&pc, Some(&edges)).unwrap();
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram.bins[0].count, 1);
    }

    #[test]
    fn public_operations_chain() {
        let points = (0..40)
            .map(|i| Point::new(0.0, 0.0, i as f64 * 0.25).with_intensity(30000))
            .collect();
        let crown = remove_stem_with(
            PointCloud::new(points),
            std::sync::Arc::new(NoStem),
        )
        .unwrap();
        let calibrated = add_reflectance(crown).unwrap();
        let histogram = get_histogram(&calibrated, None).unwrap();
        // 30000 -> -11.266588 dB
        assert_eq!(histogram.retained, calibrated.len());
        assert!(histogram.bins[43].count > 0);
    }

    struct NoStem;

    impl pcd_transformer::StemClassifier for NoStem {
        fn classify(
            &self,
            point_cloud: &PointCloud,
        ) -> Result<Vec<bool>, pcd_transformer::TransformError> {
            Ok(vec![false; point_cloud.len()])
        }
    }
}
