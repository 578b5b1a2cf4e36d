use pcd_core::pointcloud::point::PointCloud;
use serde::Serialize;

use crate::error::ScorchError;

/// Strictly increasing histogram breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub const DEFAULT_MIN: f64 = -20.0;
    pub const DEFAULT_MAX: f64 = 0.0;
    pub const DEFAULT_STEP: f64 = 0.2;

    pub fn new(edges: Vec<f64>) -> Result<Self, ScorchError> {
        if edges.len() < 2 {
            return Err(ScorchError::InvalidBinEdges(format!(
                "at least 2 edges are required, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(ScorchError::InvalidBinEdges(
                "edges must be finite".to_string(),
            ));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ScorchError::InvalidBinEdges(
                "edges must be strictly increasing".to_string(),
            ));
        }
        Ok(Self(edges))
    }

    /// Equal-width edges from `min` to `max` inclusive. Each edge is
    /// computed as `min + i * step` so rounding error does not accumulate.
    pub fn regular(min: f64, max: f64, step: f64) -> Result<Self, ScorchError> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) || step <= 0.0 || max <= min
        {
            return Err(ScorchError::InvalidBinEdges(format!(
                "cannot build bins from {min} to {max} with step {step}"
            )));
        }

        let bins = ((max - min) / step).round();
        if (min + bins * step - max).abs() > step * 1e-6 {
            return Err(ScorchError::InvalidBinEdges(format!(
                "range {min}..{max} is not a multiple of step {step}"
            )));
        }

        Ok(Self::regular_unchecked(min, max, step, bins as usize))
    }

    fn regular_unchecked(min: f64, max: f64, step: f64, bins: usize) -> Self {
        let edges = (0..=bins)
            .map(|i| if i == bins { max } else { min + i as f64 * step })
            .collect();
        Self(edges)
    }

    pub fn edges(&self) -> &[f64] {
        &self.0
    }

    pub fn min(&self) -> f64 {
        self.0[0]
    }

    pub fn max(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn bin_count(&self) -> usize {
        self.0.len() - 1
    }

    /// Bins are right-closed, `(e[i], e[i + 1]]`. Values at or beyond the
    /// outermost edges belong to no bin.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !(value > self.min() && value < self.max()) {
            return None;
        }
        Some(self.0.partition_point(|&edge| edge < value) - 1)
    }
}

impl Default for BinEdges {
    /// -20 to 0 dB in 0.2 dB steps: 101 edges, 100 bins.
    fn default() -> Self {
        Self::regular_unchecked(Self::DEFAULT_MIN, Self::DEFAULT_MAX, Self::DEFAULT_STEP, 100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub midpoint: f64,
    pub count: usize,
    pub density: f64,
}

impl HistogramBin {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    /// Values that fell inside the outermost edges.
    pub retained: usize,
    pub excluded: usize,
}

impl Histogram {
    /// Bins `values` over `edges`. Densities are normalised by the number of
    /// retained values, so they integrate to 1 whenever anything is retained
    /// and are all zero otherwise.
    pub fn from_values(values: impl IntoIterator<Item = f64>, edges: &BinEdges) -> Self {
        let mut counts = vec![0usize; edges.bin_count()];
        let mut excluded = 0;
        for value in values {
            match edges.bin_index(value) {
                Some(index) => counts[index] += 1,
                None => excluded += 1,
            }
        }

        let retained: usize = counts.iter().sum();
        let bins = edges
            .edges()
            .windows(2)
            .zip(counts)
            .map(|(w, count)| {
                let width = w[1] - w[0];
                let density = if retained == 0 {
                    0.0
                } else {
                    count as f64 / (retained as f64 * width)
                };
                HistogramBin {
                    lower: w[0],
                    upper: w[1],
                    midpoint: (w[0] + w[1]) / 2.0,
                    count,
                    density,
                }
            })
            .collect();

        Histogram {
            bins,
            retained,
            excluded,
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// `(midpoint, density)` pairs in ascending bin order.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.bins.iter().map(|bin| (bin.midpoint, bin.density))
    }

    pub fn area(&self) -> f64 {
        self.bins.iter().map(|bin| bin.density * bin.width()).sum()
    }
}

/// Histogram of the calibrated reflectance of every point in `point_cloud`.
pub fn build_histogram(
    point_cloud: &PointCloud,
    edges: &BinEdges,
) -> Result<Histogram, ScorchError> {
    let values = point_cloud
        .reflectance()
        .collect::<Option<Vec<f64>>>()
        .ok_or(ScorchError::MissingAttribute {
            attribute: "reflectance",
            remedy: "call add_reflectance first",
        })?;

    let histogram = Histogram::from_values(values, edges);
    log::debug!(
        "histogram: {} values binned, {} outside {}..{}",
        histogram.retained,
        histogram.excluded,
        edges.min(),
        edges.max()
    );
    Ok(histogram)
}
