use pcd_core::{pointcloud::point::PointCloud, stats::quantile};

use super::Transform;
use crate::error::TransformError;

/// Shifts heights so that a low quantile of z lands at zero. A quantile is
/// used instead of the minimum so a few noise returns below the true ground
/// do not move the whole cloud.
pub struct GroundNormalization {
    quantile: f64,
}

impl GroundNormalization {
    pub fn new(quantile: f64) -> Self {
        Self { quantile }
    }
}

impl Transform for GroundNormalization {
    fn name(&self) -> &'static str {
        "ground normalization"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let Some(ground) = quantile(&point_cloud.heights(), self.quantile) else {
            return Ok(point_cloud);
        };

        let previous_offset = point_cloud.metadata.ground_offset.unwrap_or(0.0);
        let points = point_cloud
            .points
            .iter()
            .map(|point| {
                let mut point = point.clone();
                point.z -= ground;
                point
            })
            .collect();

        let mut normalized = point_cloud.derive(points);
        normalized.metadata.ground_offset = Some(previous_offset + ground);
        Ok(normalized)
    }
}
