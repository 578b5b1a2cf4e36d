use pcd_core::pointcloud::point::{Point, PointCloud};
use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};
use serde::{Deserialize, Serialize};

use super::Transform;
use crate::error::TransformError;

/// Linear mapping from raw 16-bit intensity to reflectance in dB:
/// `reflectance = offset + gain * intensity`.
///
/// The defaults map the full 16-bit range onto roughly -25..+5 dB and belong
/// to the scanner the bundled scorch model was trained with. Data from any
/// other scanner needs its own constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    pub offset: f64,
    pub gain: f64,
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            offset: -25.0,
            gain: 4.577804e-4,
        }
    }
}

impl CalibrationConstants {
    pub fn reflectance(&self, intensity: u16) -> f64 {
        self.offset + self.gain * intensity as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReflectanceCalibration {
    pub constants: CalibrationConstants,
}

impl ReflectanceCalibration {
    pub fn new(constants: CalibrationConstants) -> Self {
        Self { constants }
    }
}

impl Transform for ReflectanceCalibration {
    fn name(&self) -> &'static str {
        "reflectance calibration"
    }

    fn transform(&self, point_cloud: PointCloud) -> Result<PointCloud, TransformError> {
        if point_cloud.has_reflectance() {
            log::debug!("reflectance already present, skipping calibration");
            return Ok(point_cloud);
        }

        let constants = self.constants;
        let points = point_cloud
            .points
            .clone()
            .into_par_iter()
            .map(|mut point| -> Result<Point, TransformError> {
                if point.attributes.reflectance.is_none() {
                    let intensity =
                        point
                            .attributes
                            .intensity
                            .ok_or(TransformError::MissingAttribute {
                                attribute: "intensity",
                                remedy: "the input must carry the raw Intensity attribute",
                            })?;
                    point.attributes.reflectance = Some(constants.reflectance(intensity));
                }
                Ok(point)
            })
            .collect::<Result<Vec<_>, TransformError>>()?;

        Ok(point_cloud.derive(points))
    }
}
