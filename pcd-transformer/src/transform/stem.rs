use std::{cmp::Ordering, sync::Arc};

use pcd_core::{
    pointcloud::point::{Point, PointCloud},
    stats::median,
};
use serde::{Deserialize, Serialize};

use super::Transform;
use crate::error::TransformError;

/// Labels each point of a cloud as stem (`true`) or not.
///
/// The returned vector must have one label per input point, in input order.
pub trait StemClassifier: Send + Sync {
    fn classify(&self, point_cloud: &PointCloud) -> Result<Vec<bool>, TransformError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemClassifierConfig {
    /// Lower bound of the height band used to locate the trunk.
    pub base_min: f64,
    /// Upper bound (exclusive) of that band.
    pub base_max: f64,
    pub slice_height: f64,
    /// Horizontal search radius around the trunk axis of the previous slice.
    pub search_radius: f64,
    /// Slices whose fitted radius exceeds this are no longer trunk.
    pub max_radius: f64,
    pub tolerance: f64,
    pub min_points: usize,
    pub min_slice_points: usize,
}

impl Default for StemClassifierConfig {
    fn default() -> Self {
        Self {
            base_min: 1.0,
            base_max: 2.0,
            slice_height: 0.5,
            search_radius: 0.6,
            max_radius: 0.5,
            tolerance: 0.05,
            min_points: 20,
            min_slice_points: 8,
        }
    }
}

/// Follows the trunk upward slice by slice. Each slice refits the axis as
/// the mean of the points near the previous axis and the radius as their
/// median distance to it; tracking stops once a slice is too sparse or too
/// wide to be trunk. Heights must already be relative to the ground.
#[derive(Debug, Clone, Default)]
pub struct SliceStemClassifier {
    pub config: StemClassifierConfig,
}

struct SliceFit {
    center: (f64, f64),
    radius: f64,
}

impl StemClassifierConfig {
    pub fn validate(&self) -> Result<(), TransformError> {
        if !(self.slice_height.is_finite() && self.slice_height > 0.0) {
            return Err(TransformError::Classification(format!(
                "slice_height must be positive, got {}",
                self.slice_height
            )));
        }
        if self.base_max.partial_cmp(&self.base_min) != Some(Ordering::Greater) {
            return Err(TransformError::Classification(format!(
                "stem base band [{}, {}) is empty",
                self.base_min, self.base_max
            )));
        }
        Ok(())
    }
}

impl SliceStemClassifier {
    pub fn new(config: StemClassifierConfig) -> Self {
        Self { config }
    }

    fn fit_slice(&self, slice: &[&Point], center: (f64, f64)) -> Option<SliceFit> {
        let near: Vec<&Point> = slice
            .iter()
            .copied()
            .filter(|p| p.horizontal_distance(center) <= self.config.search_radius)
            .collect();
        if near.len() < self.config.min_slice_points {
            return None;
        }

        let n = near.len() as f64;
        let center = (
            near.iter().map(|p| p.x).sum::<f64>() / n,
            near.iter().map(|p| p.y).sum::<f64>() / n,
        );
        let distances: Vec<f64> = near.iter().map(|p| p.horizontal_distance(center)).collect();
        let radius = median(&distances)?;
        if radius > self.config.max_radius {
            return None;
        }

        Some(SliceFit { center, radius })
    }
}

impl StemClassifier for SliceStemClassifier {
    fn classify(&self, point_cloud: &PointCloud) -> Result<Vec<bool>, TransformError> {
        let config = &self.config;
        config.validate()?;
        let base: Vec<&Point> = point_cloud
            .points
            .iter()
            .filter(|p| p.z >= config.base_min && p.z < config.base_max)
            .collect();
        if base.len() < config.min_points {
            return Err(TransformError::Classification(format!(
                "too few points in the stem base slice ({} < {})",
                base.len(),
                config.min_points
            )));
        }

        let xs: Vec<f64> = base.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = base.iter().map(|p| p.y).collect();
        let mut center = match (median(&xs), median(&ys)) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(TransformError::Classification(
                    "stem base slice has no finite coordinates".to_string(),
                ))
            }
        };

        let mut above: Vec<usize> = (0..point_cloud.len())
            .filter(|&i| point_cloud.points[i].z >= config.base_min)
            .collect();
        above.sort_by(|&a, &b| point_cloud.points[a].z.total_cmp(&point_cloud.points[b].z));

        let mut labels = vec![false; point_cloud.len()];
        let mut foot: Option<SliceFit> = None;
        let mut remaining = above.as_slice();
        let mut level = 1.0;
        while !remaining.is_empty() {
            let slice_top = config.base_min + level * config.slice_height;
            let end = remaining.partition_point(|&i| point_cloud.points[i].z < slice_top);
            let (slice, rest) = remaining.split_at(end);
            remaining = rest;
            level += 1.0;

            let slice_points: Vec<&Point> =
                slice.iter().map(|&i| &point_cloud.points[i]).collect();
            let Some(fit) = self.fit_slice(&slice_points, center) else {
                break;
            };

            for &index in slice {
                let distance = point_cloud.points[index].horizontal_distance(fit.center);
                if distance <= fit.radius + config.tolerance {
                    labels[index] = true;
                }
            }
            center = fit.center;
            foot.get_or_insert(fit);
        }

        match foot {
            Some(foot) => {
                for (index, point) in point_cloud.points.iter().enumerate() {
                    if point.z < config.base_min
                        && point.horizontal_distance(foot.center) <= foot.radius + config.tolerance
                    {
                        labels[index] = true;
                    }
                }
            }
            None => log::warn!("no trunk slice found above the base band, nothing labelled as stem"),
        }

        Ok(labels)
    }
}

/// Drops the points a [`StemClassifier`] labels as stem.
pub struct StemRemoval {
    classifier: Arc<dyn StemClassifier>,
}

impl StemRemoval {
    pub fn new(classifier: Arc<dyn StemClassifier>) -> Self {
        Self { classifier }
    }
}

impl Transform for StemRemoval {
    fn name(&self) -> &'static str {
        "stem removal"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        let labels = self.classifier.classify(&point_cloud)?;
        if labels.len() != point_cloud.len() {
            return Err(TransformError::Classification(format!(
                "classifier returned {} labels for {} points",
                labels.len(),
                point_cloud.len()
            )));
        }

        let points = point_cloud
            .points
            .iter()
            .zip(&labels)
            .filter(|&(_, &is_stem)| !is_stem)
            .map(|(point, _)| {
                let mut point = point.clone();
                point.attributes.stem = Some(false);
                point
            })
            .collect();

        Ok(point_cloud.derive(points))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    /// A 0.15 radius trunk up to 6 units, topped by a 3 unit wide crown.
    fn synthetic_tree() -> (PointCloud, usize) {
        let mut points = Vec::new();
        for level in 0..120 {
            let z = level as f64 * 0.05;
            for k in 0..12 {
                let angle = k as f64 / 12.0 * 2.0 * PI;
                points.push(Point::new(0.15 * angle.cos(), 0.15 * angle.sin(), z));
            }
        }
        let trunk_count = points.len();

        for level in 0..40 {
            let z = 6.0 + level as f64 * 0.1;
            for k in 0..24 {
                let angle = k as f64 / 24.0 * 2.0 * PI;
                for r in [0.9, 1.5] {
                    points.push(Point::new(r * angle.cos(), r * angle.sin(), z));
                }
            }
        }
        (PointCloud::new(points), trunk_count)
    }

    #[test]
    fn trunk_points_are_labelled() {
        let (pc, trunk_count) = synthetic_tree();
        let labels = SliceStemClassifier::default().classify(&pc).unwrap();

        assert_eq!(labels.len(), pc.len());
        assert!(labels[..trunk_count].iter().all(|&l| l));
        assert!(labels[trunk_count..].iter().all(|&l| !l));
    }

    #[test]
    fn far_height_outlier_does_not_disturb_tracking() {
        let (mut pc, trunk_count) = synthetic_tree();
        pc.points.push(Point::new(3.0, 3.0, 1e300));
        pc.points.push(Point::new(-3.0, 3.0, 1e8));

        let labels = SliceStemClassifier::default().classify(&pc).unwrap();
        assert_eq!(labels.len(), pc.len());
        assert!(labels[..trunk_count].iter().all(|&l| l));
        assert!(labels[trunk_count..].iter().all(|&l| !l));
    }

    #[test]
    fn non_positive_slice_height_is_rejected() {
        let (pc, _) = synthetic_tree();
        for slice_height in [0.0, -0.5, f64::NAN] {
            let classifier = SliceStemClassifier::new(StemClassifierConfig {
                slice_height,
                ..Default::default()
            });
            assert!(matches!(
                classifier.classify(&pc),
                Err(TransformError::Classification(_))
            ));
        }
    }

    #[test]
    fn sparse_base_is_a_classification_error() {
        let pc = PointCloud::new(vec![Point::new(0.0, 0.0, 1.5); 5]);
        let result = SliceStemClassifier::default().classify(&pc);
        assert!(matches!(result, Err(TransformError::Classification(_))));
    }

    #[test]
    fn wrong_label_count_is_rejected() {
        struct Short;
        impl StemClassifier for Short {
            fn classify(&self, _: &PointCloud) -> Result<Vec<bool>, TransformError> {
                Ok(vec![true])
            }
        }

        let pc = PointCloud::new(vec![Point::new(0.0, 0.0, 0.0); 3]);
        let result = StemRemoval::new(Arc::new(Short)).transform(pc);
        assert!(matches!(result, Err(TransformError::Classification(_))));
    }
}
