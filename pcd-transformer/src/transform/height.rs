use pcd_core::pointcloud::point::PointCloud;

use super::Transform;
use crate::error::TransformError;

/// Keeps points strictly above `min_height`.
pub struct HeightFilter {
    min_height: f64,
}

impl HeightFilter {
    pub fn new(min_height: f64) -> Self {
        Self { min_height }
    }
}

impl Transform for HeightFilter {
    fn name(&self) -> &'static str {
        "height filter"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let points = point_cloud
            .points
            .iter()
            .filter(|point| point.z > self.min_height)
            .cloned()
            .collect();
        Ok(point_cloud.derive(points))
    }
}
