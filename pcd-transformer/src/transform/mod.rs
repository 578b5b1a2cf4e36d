use pcd_core::pointcloud::point::PointCloud;

use crate::error::TransformError;

pub mod crown;
pub mod ground;
pub mod height;
pub mod reflectance;
pub mod stem;

pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError>;
}

pub struct CompositeTransform {
    transforms: Vec<Box<dyn Transform>>,
}

impl CompositeTransform {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }
}

impl Transform for CompositeTransform {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let mut intermediate = point_cloud;

        for transform in &self.transforms {
            let input_count = intermediate.len();
            intermediate = transform.transform(intermediate)?;
            log::debug!(
                "  {}: {} -> {} points",
                transform.name(),
                input_count,
                intermediate.len()
            );
        }

        Ok(intermediate)
    }
}
