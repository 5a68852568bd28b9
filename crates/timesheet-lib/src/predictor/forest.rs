//! Random forest evaluation from an exported tree dump
//!
//! Each tree is stored as parallel node arrays (`children_left`,
//! `children_right`, `feature`, `threshold`, `value`), the layout tree
//! ensembles are commonly exported in. Leaves have both children set to -1.

use super::Classifier;
use crate::error::PredictorError;
use crate::models::{Classification, FeatureVector, NUM_FEATURES};
use serde::Deserialize;

const LEAF: i64 = -1;

/// One exported decision tree
#[derive(Debug, Clone, Deserialize)]
pub struct TreeDump {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions)
    pub value: Vec<Vec<f64>>,
}

/// Exported forest weights file
#[derive(Debug, Clone, Deserialize)]
pub struct ForestDump {
    #[serde(default = "default_n_classes")]
    pub n_classes: usize,
    pub trees: Vec<TreeDump>,
}

fn default_n_classes() -> usize {
    2
}

#[derive(Debug, Clone)]
struct Node {
    left: usize,
    right: usize,
    feature: usize,
    threshold: f64,
    /// Normalized class distribution, only meaningful at leaves
    distribution: Vec<f64>,
    is_leaf: bool,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_dump(index: usize, dump: TreeDump, n_classes: usize) -> Result<Self, PredictorError> {
        let malformed = |msg: String| PredictorError::MalformedModel(format!("tree {}: {}", index, msg));

        let len = dump.children_left.len();
        if len == 0 {
            return Err(malformed("no nodes".to_string()));
        }
        if [
            dump.children_right.len(),
            dump.feature.len(),
            dump.threshold.len(),
            dump.value.len(),
        ]
        .iter()
        .any(|&l| l != len)
        {
            return Err(malformed("node arrays differ in length".to_string()));
        }

        let mut nodes = Vec::with_capacity(len);
        for i in 0..len {
            let (left, right) = (dump.children_left[i], dump.children_right[i]);
            let weights = &dump.value[i];
            if weights.len() != n_classes {
                return Err(malformed(format!(
                    "node {} has {} class weights, expected {}",
                    i,
                    weights.len(),
                    n_classes
                )));
            }

            if left == LEAF && right == LEAF {
                let total: f64 = weights.iter().sum();
                if !(total.is_finite() && total > 0.0) || weights.iter().any(|w| *w < 0.0) {
                    return Err(malformed(format!("leaf {} has no usable class weights", i)));
                }
                nodes.push(Node {
                    left: 0,
                    right: 0,
                    feature: 0,
                    threshold: 0.0,
                    distribution: weights.iter().map(|w| w / total).collect(),
                    is_leaf: true,
                });
                continue;
            }

            // Children always come after their parent, which also rules out cycles
            let in_range = |c: i64| c > i as i64 && (c as usize) < len;
            if !in_range(left) || !in_range(right) {
                return Err(malformed(format!("node {} has invalid children", i)));
            }
            let feature = dump.feature[i];
            if feature < 0 || feature as usize >= NUM_FEATURES {
                return Err(malformed(format!("node {} splits on feature {}", i, feature)));
            }
            if dump.threshold[i].is_nan() {
                return Err(malformed(format!("node {} has NaN threshold", i)));
            }

            nodes.push(Node {
                left: left as usize,
                right: right as usize,
                feature: feature as usize,
                threshold: dump.threshold[i],
                distribution: Vec::new(),
                is_leaf: false,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_distribution(&self, row: &[f32; NUM_FEATURES]) -> &[f64] {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf {
                return &node.distribution;
            }
            idx = if row[node.feature] as f64 <= node.threshold {
                node.left
            } else {
                node.right
            };
        }
    }
}

/// Random forest binary classifier
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    trees: Vec<Tree>,
    n_classes: usize,
}

impl ForestClassifier {
    pub fn from_dump(dump: ForestDump) -> Result<Self, PredictorError> {
        if dump.n_classes != 2 {
            return Err(PredictorError::MalformedModel(format!(
                "expected a binary classifier, got {} classes",
                dump.n_classes
            )));
        }
        if dump.trees.is_empty() {
            return Err(PredictorError::MalformedModel("forest has no trees".to_string()));
        }
        let n_classes = dump.n_classes;
        let trees = dump
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_dump(i, t, n_classes))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { trees, n_classes })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, PredictorError> {
        let dump: ForestDump = serde_json::from_slice(bytes)
            .map_err(|e| PredictorError::MalformedModel(format!("invalid forest weights: {}", e)))?;
        Self::from_dump(dump)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest root-to-leaf path, counted in edges
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(tree_depth).max().unwrap_or(0)
    }

    fn class_probabilities(&self, row: &[f32; NUM_FEATURES]) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (sum, p) in sums.iter_mut().zip(tree.leaf_distribution(row)) {
                *sum += p;
            }
        }
        let n = self.trees.len() as f64;
        sums.iter_mut().for_each(|s| *s /= n);
        sums
    }
}

fn tree_depth(tree: &Tree) -> usize {
    let mut depths = vec![0usize; tree.nodes.len()];
    let mut deepest = 0;
    for (i, node) in tree.nodes.iter().enumerate() {
        if !node.is_leaf {
            depths[node.left] = depths[i] + 1;
            depths[node.right] = depths[i] + 1;
        }
        deepest = deepest.max(depths[i]);
    }
    deepest
}

impl Classifier for ForestClassifier {
    fn classify(&self, batch: &[FeatureVector]) -> Result<Vec<Classification>, PredictorError> {
        Ok(batch
            .iter()
            .map(|features| {
                let probs = self.class_probabilities(&features.to_f32_row());
                // First arg-max, so an exact tie goes to class 0
                let label = u8::from(probs[1] > probs[0]);
                Classification {
                    label,
                    probability: probs[1],
                }
            })
            .collect())
    }
}
