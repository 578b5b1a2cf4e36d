use std::path::{Path, PathBuf};

use pcd_core::pointcloud::point::PointCloud;

use crate::error::ParseError;

pub mod csv;
pub mod las;

pub trait ParserProvider {
    fn get_parser(&self) -> Box<dyn Parser>;
}

pub trait Parser {
    fn parse(&self) -> Result<PointCloud, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Las,
    Laz,
    Csv,
    Txt,
}

impl Extension {
    pub const ALL: [&'static str; 4] = ["las", "laz", "csv", "txt"];
}

pub fn get_extension(extension: &str) -> Result<Extension, ParseError> {
    match extension.to_ascii_lowercase().as_str() {
        "las" => Ok(Extension::Las),
        "laz" => Ok(Extension::Laz),
        "csv" => Ok(Extension::Csv),
        "txt" => Ok(Extension::Txt),
        other => Err(ParseError::UnsupportedExtension(other.to_string())),
    }
}

pub fn extension_of(path: &Path) -> Result<Extension, ParseError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| ParseError::UnsupportedExtension(path.display().to_string()))?;
    get_extension(extension)
}

/// Picks the parser matching the extension of `path`.
pub fn parser_for(path: &Path) -> Result<Box<dyn Parser>, ParseError> {
    let filenames = vec![PathBuf::from(path)];
    let parser = match extension_of(path)? {
        Extension::Las | Extension::Laz => las::LasParserProvider { filenames }.get_parser(),
        Extension::Csv | Extension::Txt => csv::CsvParserProvider { filenames }.get_parser(),
    };
    Ok(parser)
}

pub fn read_point_cloud(path: &Path) -> Result<PointCloud, ParseError> {
    parser_for(path)?.parse()
}
