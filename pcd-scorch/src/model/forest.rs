use serde::{Deserialize, Serialize};

use super::ScorchModel;
use crate::{error::ScorchError, features::FeatureVector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Goes to `left` when the feature value is `<= threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn evaluate(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Ensemble of regression trees; the prediction is the mean over trees.
///
/// Split features index into `feature_names`. Children always come after
/// their parent in `nodes`, which `from_json` checks, so evaluation
/// terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    #[serde(default)]
    pub description: String,
    pub feature_names: Vec<String>,
    pub trees: Vec<Tree>,
}

impl ForestModel {
    pub fn from_json(content: &str) -> Result<Self, ScorchError> {
        let model: ForestModel =
            serde_json::from_str(content).map_err(|e| ScorchError::InvalidModel(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), ScorchError> {
        if self.trees.is_empty() {
            return Err(ScorchError::InvalidModel("model has no trees".to_string()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ScorchError::InvalidModel(format!("tree {t} has no nodes")));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                if let Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } = *node
                {
                    if feature >= self.feature_names.len() {
                        return Err(ScorchError::InvalidModel(format!(
                            "tree {t} node {n} splits on unknown feature {feature}"
                        )));
                    }
                    for child in [left, right] {
                        if child <= n || child >= tree.nodes.len() {
                            return Err(ScorchError::InvalidModel(format!(
                                "tree {t} node {n} has invalid child {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Reorders `features` into the model's column order.
    fn row(&self, features: &FeatureVector) -> Result<Vec<f64>, ScorchError> {
        let index = features.index();
        let mut missing = Vec::new();
        let row: Vec<f64> = self
            .feature_names
            .iter()
            .map(|name| match index.get(name.as_str()) {
                Some(&i) => features.values()[i],
                None => {
                    missing.push(name.clone());
                    f64::NAN
                }
            })
            .collect();

        if missing.is_empty() {
            Ok(row)
        } else {
            Err(ScorchError::FeatureMismatch { missing })
        }
    }
}

impl ScorchModel for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ScorchError> {
        let row = self.row(features)?;
        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(&row)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}
