use std::path::Path;

use plotters::prelude::*;

use crate::{error::ScorchError, histogram::Histogram};

fn plot_error<E: std::fmt::Display>(error: E) -> ScorchError {
    ScorchError::Plot(error.to_string())
}

/// Renders density against reflectance as a PNG bar chart.
pub fn render_histogram(histogram: &Histogram, path: &Path, title: &str) -> Result<(), ScorchError> {
    let (Some(first), Some(last)) = (histogram.bins.first(), histogram.bins.last()) else {
        return Err(ScorchError::Plot("histogram has no bins".to_string()));
    };
    let max_density = histogram
        .bins
        .iter()
        .map(|bin| bin.density)
        .fold(0.0_f64, f64::max);
    let y_max = if max_density > 0.0 { max_density * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(first.lower..last.upper, 0.0..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("reflectance (dB)")
        .y_desc("density")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(histogram.bins.iter().map(|bin| {
            Rectangle::new(
                [(bin.lower, 0.0), (bin.upper, bin.density)],
                RGBColor(178, 34, 34).mix(0.7).filled(),
            )
        }))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    log::info!("wrote histogram plot {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::BinEdges;

    #[test]
    fn renders_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree_histogram.png");
        let histogram = Histogram::from_values([-10.05, -9.95, -3.0], &BinEdges::default());

        render_histogram(&histogram, &path, "tree").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn empty_histogram_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let histogram = Histogram::from_values(std::iter::empty(), &BinEdges::default());

        render_histogram(&histogram, &path, "empty").unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn unwritable_path_is_a_plot_error() {
        let histogram = Histogram::from_values([-5.0], &BinEdges::default());
        let result = render_histogram(&histogram, Path::new("/nonexistent/dir/plot.png"), "t");
        assert!(matches!(result, Err(ScorchError::Plot(_))));
    }
}
