use std::collections::HashMap;

use serde::Serialize;

use crate::{error::ScorchError, histogram::Histogram};

pub const FEATURE_PREFIX: &str = "intensity_";

/// Single-row model input: histogram densities keyed by column name, in
/// ascending bin order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self, ScorchError> {
        if names.len() != values.len() {
            return Err(ScorchError::FeatureLength {
                names: names.len(),
                values: values.len(),
            });
        }
        Ok(Self { names, values })
    }

    pub fn from_histogram(histogram: &Histogram) -> Self {
        let (names, values) = histogram
            .pairs()
            .map(|(midpoint, density)| (Self::feature_name(midpoint), density))
            .unzip();
        Self { names, values }
    }

    /// Column name for a bin midpoint, rounded to one decimal place the way
    /// the training data was keyed (`-19.9` becomes `intensity_-19.9`).
    pub fn feature_name(midpoint: f64) -> String {
        let rounded = (midpoint * 10.0).round() / 10.0;
        // Avoid "-0.0" for midpoints that round to zero.
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        format!("{FEATURE_PREFIX}{rounded:.1}")
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| self.values[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn index(&self) -> HashMap<&str, usize> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::BinEdges;

    #[test]
    fn names_follow_rounded_midpoints() {
        assert_eq!(FeatureVector::feature_name(-19.900000000000002), "intensity_-19.9");
        assert_eq!(FeatureVector::feature_name(-0.09999999999999964), "intensity_-0.1");
        assert_eq!(FeatureVector::feature_name(-10.1), "intensity_-10.1");
        assert_eq!(FeatureVector::feature_name(-0.04), "intensity_0.0");
        assert_eq!(FeatureVector::feature_name(2.25), "intensity_2.3");
    }

    #[test]
    fn default_histogram_yields_hundred_ordered_columns() {
        let histogram = Histogram::from_values([-10.05, -10.05, -0.15], &BinEdges::default());
        let features = FeatureVector::from_histogram(&histogram);

        assert_eq!(features.len(), 100);
        assert_eq!(features.names()[0], "intensity_-19.9");
        assert_eq!(features.names()[49], "intensity_-10.1");
        assert_eq!(features.names()[99], "intensity_-0.1");

        let mut unique = features.names().to_vec();
        unique.dedup();
        assert_eq!(unique.len(), 100);

        let density = 2.0 / (3.0 * 0.2);
        assert!((features.get("intensity_-10.1").unwrap() - density).abs() < 1e-9);
        assert_eq!(features.get("intensity_-5.1"), Some(0.0));
        assert_eq!(features.get("intensity_3.0"), None);
    }

    #[test]
    fn index_maps_names_to_positions() {
        let features = FeatureVector::new(vec!["a".into(), "b".into()], vec![1.0, 2.0]).unwrap();
        let index = features.index();
        assert_eq!(index["b"], 1);
        assert_eq!(features.iter().collect::<Vec<_>>(), vec![("a", 1.0), ("b", 2.0)]);
    }

    #[test]
    fn unequal_lengths_are_rejected() {
        let result = FeatureVector::new(vec!["a".into(), "b".into()], vec![1.0]);
        assert!(matches!(
            result,
            Err(ScorchError::FeatureLength {
                names: 2,
                values: 1
            })
        ));
    }
}
