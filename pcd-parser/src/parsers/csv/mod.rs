use std::{collections::HashMap, path::Path, path::PathBuf};

use csv::ReaderBuilder;
use pcd_core::pointcloud::point::{Point, PointAttributes, PointCloud};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

const ATTRIBUTE_NAMES: [&str; 7] = [
    "x",
    "y",
    "z",
    "intensity",
    "reflectance",
    "return_number",
    "gps_time",
];

pub struct CsvParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for CsvParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(CsvParser {
            filenames: self.filenames.clone(),
        })
    }
}

/// Reads delimited text point clouds. Columns are matched by header name,
/// ignoring case, `_` and `-`; without a header row the column order of
/// `ATTRIBUTE_NAMES` is assumed. Comma, semicolon, tab and space delimiters
/// are detected from the first line.
pub struct CsvParser {
    pub filenames: Vec<PathBuf>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '-'], "")
}

fn detect_delimiter(first_line: &str) -> u8 {
    for delimiter in [b',', b';', b'\t'] {
        if first_line.as_bytes().contains(&delimiter) {
            return delimiter;
        }
    }
    b' '
}

/// Space-delimited exports often align columns with runs of blanks.
fn collapse_whitespace(content: &str) -> String {
    content
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn create_field_mapping(
    headers: &csv::StringRecord,
    path: &Path,
) -> Result<(HashMap<&'static str, usize>, bool), ParseError> {
    let has_headers = headers
        .iter()
        .any(|h| !h.trim().is_empty() && h.trim().parse::<f64>().is_err());

    let mut mapping = HashMap::new();
    if has_headers {
        for (index, header) in headers.iter().enumerate() {
            let normalized_header = normalize(header);
            if let Some(attr_name) = ATTRIBUTE_NAMES
                .iter()
                .find(|attr| normalize(attr) == normalized_header)
            {
                mapping.insert(*attr_name, index);
            }
        }
    } else {
        for (index, attr_name) in ATTRIBUTE_NAMES.iter().take(headers.len()).enumerate() {
            mapping.insert(*attr_name, index);
        }
    }

    for attr_name in ["x", "y", "z"] {
        if !mapping.contains_key(attr_name) {
            return Err(ParseError::MissingField {
                path: path.to_path_buf(),
                field: attr_name.to_string(),
            });
        }
    }

    Ok((mapping, has_headers))
}

struct RecordParser<'a> {
    path: &'a Path,
    mapping: &'a HashMap<&'static str, usize>,
}

impl RecordParser<'_> {
    fn field<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.mapping
            .get(name)
            .and_then(|&index| record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn parse<T: std::str::FromStr>(
        &self,
        record: &csv::StringRecord,
        name: &str,
    ) -> Result<Option<T>, ParseError> {
        match self.field(record, name) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| ParseError::InvalidValue {
                    path: self.path.to_path_buf(),
                    field: name.to_string(),
                    value: value.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn required(&self, record: &csv::StringRecord, name: &str) -> Result<f64, ParseError> {
        self.parse::<f64>(record, name)?
            .ok_or_else(|| ParseError::MissingField {
                path: self.path.to_path_buf(),
                field: name.to_string(),
            })
    }

    fn point(&self, record: &csv::StringRecord) -> Result<Point, ParseError> {
        // Intensity may be written as a float by some exporters.
        let intensity = self
            .parse::<f64>(record, "intensity")?
            .map(|v| v.round().clamp(0.0, u16::MAX as f64) as u16);

        let attributes = PointAttributes {
            intensity,
            reflectance: self.parse::<f64>(record, "reflectance")?,
            stem: None,
            return_number: self.parse::<u8>(record, "return_number")?,
            classification: None,
            gps_time: self.parse::<f64>(record, "gps_time")?,
        };

        Ok(Point {
            x: self.required(record, "x")?,
            y: self.required(record, "y")?,
            z: self.required(record, "z")?,
            attributes,
        })
    }
}

impl CsvParser {
    fn parse_file(&self, path: &Path, points: &mut Vec<Point>) -> Result<(), ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let delimiter = detect_delimiter(content.lines().next().unwrap_or_default());
        let content = if delimiter == b' ' {
            collapse_whitespace(&content)
        } else {
            content
        };

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let csv_error = |source: csv::Error| ParseError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut records = rdr.records();
        let first = match records.next() {
            Some(record) => record.map_err(csv_error)?,
            None => return Ok(()),
        };

        let (mapping, has_headers) = create_field_mapping(&first, path)?;
        let parser = RecordParser {
            path,
            mapping: &mapping,
        };

        if !has_headers {
            points.push(parser.point(&first)?);
        }
        for record in records {
            let record = record.map_err(csv_error)?;
            points.push(parser.point(&record)?);
        }

        Ok(())
    }
}

impl Parser for CsvParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        if self.filenames.is_empty() {
            return Err(ParseError::NoInput);
        }

        let mut points = Vec::new();
        for filename in &self.filenames {
            self.parse_file(filename, &mut points)?;
        }

        Ok(PointCloud::new(points))
    }
}
