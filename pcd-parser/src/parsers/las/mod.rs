use std::path::PathBuf;

use las::Reader;

use pcd_core::pointcloud::point::{Point, PointAttributes, PointCloud};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

pub struct LasParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for LasParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(LasParser {
            filenames: self.filenames.clone(),
        })
    }
}

pub struct LasParser {
    pub filenames: Vec<PathBuf>,
}

impl LasParser {
    fn convert_las_point(las_point: las::Point) -> Point {
        let attributes = PointAttributes {
            intensity: Some(las_point.intensity),
            reflectance: None,
            stem: None,
            return_number: Some(las_point.return_number),
            classification: Some(format!("{:?}", las_point.classification)),
            gps_time: las_point.gps_time,
        };

        Point {
            x: las_point.x,
            y: las_point.y,
            z: las_point.z,
            attributes,
        }
    }
}

impl Parser for LasParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        if self.filenames.is_empty() {
            return Err(ParseError::NoInput);
        }

        let mut points = Vec::new();
        for filename in &self.filenames {
            let start = std::time::Instant::now();
            let mut reader = Reader::from_path(filename).map_err(|source| ParseError::Las {
                path: filename.clone(),
                source,
            })?;
            points.reserve(reader.header().number_of_points() as usize);

            for las_point in reader.points() {
                let las_point = las_point.map_err(|source| ParseError::Las {
                    path: filename.clone(),
                    source,
                })?;
                points.push(Self::convert_las_point(las_point));
            }
            log::debug!("read {:?} in {:?}", filename, start.elapsed());
        }

        Ok(PointCloud::new(points))
    }
}
