use pcd_core::pointcloud::point::PointCloud;

use crate::{error::TransformError, transform::Transform};

pub trait Transformer {
    fn execute(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError>;
}

pub struct PointCloudTransformer {
    transform: Box<dyn Transform>,
}

impl PointCloudTransformer {
    pub fn new(transform: Box<dyn Transform>) -> Self {
        Self { transform }
    }
}

impl Transformer for PointCloudTransformer {
    fn execute(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let start = std::time::Instant::now();
        let input_count = point_cloud.len();
        let transformed = self.transform.transform(point_cloud)?;
        log::info!(
            "{}: {} -> {} points in {:?}",
            self.transform.name(),
            input_count,
            transformed.len(),
            start.elapsed()
        );
        Ok(transformed)
    }
}
