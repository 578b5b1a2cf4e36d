use pcd_core::pointcloud::point::PointCloud;

use super::{CompositeTransform, Transform};
use crate::error::TransformError;

/// Runs the crown isolation stages and marks the result as crown-only.
pub struct CrownIsolation {
    stages: CompositeTransform,
}

impl CrownIsolation {
    pub fn new(stages: CompositeTransform) -> Self {
        Self { stages }
    }
}

impl Transform for CrownIsolation {
    fn name(&self) -> &'static str {
        "crown isolation"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let mut crown = self.stages.transform(point_cloud)?;
        crown.metadata.crown_only = true;
        Ok(crown)
    }
}
