use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointAttributes {
    pub intensity: Option<u16>,
    /// Calibrated reflectance in dB, attached by the reflectance calibration step.
    pub reflectance: Option<f64>,
    /// Stem membership as labelled by a stem classifier.
    pub stem: Option<bool>,
    pub return_number: Option<u8>,
    pub classification: Option<String>,
    pub gps_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub attributes: PointAttributes,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point {
            x,
            y,
            z,
            attributes: PointAttributes::default(),
        }
    }

    pub fn with_intensity(mut self, intensity: u16) -> Self {
        self.attributes.intensity = Some(intensity);
        self
    }

    pub fn with_reflectance(mut self, reflectance: f64) -> Self {
        self.attributes.reflectance = Some(reflectance);
        self
    }

    pub fn horizontal_distance(&self, center: (f64, f64)) -> f64 {
        ((self.x - center.0).powi(2) + (self.y - center.1).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub metadata: Metadata,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        let metadata = Metadata {
            point_count: points.len(),
            bounding_volume: BoundingVolume::from_points(&points),
            ..Default::default()
        };

        PointCloud { points, metadata }
    }

    /// Builds a new cloud from `points` while keeping the derived metadata
    /// (ground offset, crown flag, extra entries) of `self`.
    pub fn derive(&self, points: Vec<Point>) -> Self {
        let metadata = Metadata {
            point_count: points.len(),
            bounding_volume: BoundingVolume::from_points(&points),
            ground_offset: self.metadata.ground_offset,
            crown_only: self.metadata.crown_only,
            other: self.metadata.other.clone(),
        };

        PointCloud { points, metadata }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64, &Point)> {
        self.points
            .iter()
            .map(|point| (point.x, point.y, point.z, point))
    }

    pub fn heights(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.z).collect()
    }

    pub fn has_intensity(&self) -> bool {
        self.points.iter().all(|p| p.attributes.intensity.is_some())
    }

    // An empty cloud carries nothing to calibrate, so it counts as calibrated.
    pub fn has_reflectance(&self) -> bool {
        self.points.iter().all(|p| p.attributes.reflectance.is_some())
    }

    pub fn reflectance(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|p| p.attributes.reflectance)
    }
}

// This represents the maximum and minimum values of the coordinates in the cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingVolume {
    pub fn from_points(points: &[Point]) -> Self {
        if points.is_empty() {
            return BoundingVolume::default();
        }

        let mut bounding_volume = BoundingVolume {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        };
        for point in points {
            bounding_volume.max[0] = bounding_volume.max[0].max(point.x);
            bounding_volume.max[1] = bounding_volume.max[1].max(point.y);
            bounding_volume.max[2] = bounding_volume.max[2].max(point.z);
            bounding_volume.min[0] = bounding_volume.min[0].min(point.x);
            bounding_volume.min[1] = bounding_volume.min[1].min(point.y);
            bounding_volume.min[2] = bounding_volume.min[2].min(point.z);
        }
        bounding_volume
    }

    pub fn height(&self) -> f64 {
        self.max[2] - self.min[2]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub point_count: usize,
    pub bounding_volume: BoundingVolume,
    /// Height that was subtracted from every z by ground normalization.
    pub ground_offset: Option<f64>,
    /// Set once stem and near-ground points have been removed.
    pub crown_only: bool,
    pub other: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_volume_tracks_extremes() {
        let pc = PointCloud::new(vec![
            Point::new(1.0, -2.0, 3.0),
            Point::new(-1.0, 4.0, 0.5),
        ]);
        assert_eq!(pc.metadata.point_count, 2);
        assert_eq!(pc.metadata.bounding_volume.min, [-1.0, -2.0, 0.5]);
        assert_eq!(pc.metadata.bounding_volume.max, [1.0, 4.0, 3.0]);
        assert_eq!(pc.metadata.bounding_volume.height(), 2.5);
    }

    #[test]
    fn empty_cloud_has_default_bounds() {
        let pc = PointCloud::new(vec![]);
        assert!(pc.is_empty());
        assert_eq!(pc.metadata.bounding_volume, BoundingVolume::default());
        assert!(pc.has_reflectance());
    }

    #[test]
    fn derive_keeps_pipeline_metadata() {
        let mut pc = PointCloud::new(vec![Point::new(0.0, 0.0, 1.0), Point::new(0.0, 0.0, 5.0)]);
        pc.metadata.ground_offset = Some(12.0);
        pc.metadata.crown_only = true;

        let derived = pc.derive(vec![Point::new(0.0, 0.0, 5.0)]);
        assert_eq!(derived.metadata.point_count, 1);
        assert_eq!(derived.metadata.ground_offset, Some(12.0));
        assert!(derived.metadata.crown_only);
        assert_eq!(derived.metadata.bounding_volume.min[2], 5.0);
    }

    #[test]
    fn reflectance_presence_requires_every_point() {
        let pc = PointCloud::new(vec![
            Point::new(0.0, 0.0, 0.0).with_reflectance(-10.0),
            Point::new(0.0, 0.0, 0.0),
        ]);
        assert!(!pc.has_reflectance());

        let pc = PointCloud::new(vec![Point::new(0.0, 0.0, 0.0).with_intensity(10)]);
        assert!(pc.has_intensity());
        assert!(!pc.has_reflectance());
    }

    #[test]
    fn horizontal_distance_ignores_height() {
        let p = Point::new(3.0, 4.0, 100.0);
        assert_eq!(p.horizontal_distance((0.0, 0.0)), 5.0);
    }
}
