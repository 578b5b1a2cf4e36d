use std::path::PathBuf;

use pcd_parser::parsers::read_point_cloud;
use pcd_scorch::{add_reflectance, get_histogram, ScorchError};

fn main() -> Result<(), ScorchError> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("crown.csv"));

    let point_cloud = read_point_cloud(&path)?;
    println!("{:?}: {} points", path, point_cloud.len());

    let calibrated = add_reflectance(point_cloud)?;
    let histogram = get_histogram(&calibrated, None)?;
    println!(
        "{} points binned, {} outside [-20, 0] dB",
        histogram.retained, histogram.excluded
    );

    for bin in histogram.bins.iter().filter(|bin| bin.count > 0) {
        println!(
            "({:6.1}, {:6.1}]  {:6}  {:.4}",
            bin.lower, bin.upper, bin.count, bin.density
        );
    }

    Ok(())
}
