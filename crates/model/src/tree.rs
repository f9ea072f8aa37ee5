//! Regression trees fitted to gradient statistics, grown leaf-wise.

use crate::binning::BinnedMatrix;
use serde::{Deserialize, Serialize};

/// Growth limits and regularisation for one tree.
#[derive(Debug, Clone)]
pub struct TreeParams {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    /// Minimum hessian sum on each side of a split.
    pub min_child_weight: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    /// Shrinkage applied to leaf outputs.
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// `x[feature] <= threshold` goes to `left`.
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

/// Tree stored as a node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    #[must_use]
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    #[must_use]
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Checks child links and feature indices after deserialisation.
    pub(crate) fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    *feature < n_features
                        && (i + 1..self.nodes.len()).contains(left)
                        && (i + 1..self.nodes.len()).contains(right)
                }
            })
    }
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    threshold: f64,
    gain: f64,
    left_grad: f64,
    left_hess: f64,
}

#[derive(Debug)]
struct OpenLeaf {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
    sum_grad: f64,
    sum_hess: f64,
    split: Option<SplitCandidate>,
}

/// L1 soft-thresholding of a gradient sum.
fn threshold_l1(g: f64, alpha: f64) -> f64 {
    g.signum() * (g.abs() - alpha).max(0.0)
}

fn leaf_objective(g: f64, h: f64, params: &TreeParams) -> f64 {
    let t = threshold_l1(g, params.reg_alpha);
    0.5 * t * t / (h + params.reg_lambda)
}

fn leaf_output(g: f64, h: f64, params: &TreeParams) -> f64 {
    let denom = h + params.reg_lambda;
    if denom <= 0.0 {
        return 0.0;
    }
    -threshold_l1(g, params.reg_alpha) / denom
}

fn can_split(depth: usize, params: &TreeParams) -> bool {
    params.max_depth.map_or(true, |max| depth < max)
}

#[allow(clippy::too_many_arguments)]
fn best_split(
    matrix: &BinnedMatrix,
    grad: &[f64],
    hess: &[f64],
    samples: &[usize],
    sum_grad: f64,
    sum_hess: f64,
    features: &[usize],
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let n = samples.len();
    let min_child = params.min_child_samples.max(1);
    if n < 2 * min_child {
        return None;
    }

    let parent = leaf_objective(sum_grad, sum_hess, params);
    let mut best: Option<SplitCandidate> = None;

    for &feature in features {
        let bins = matrix.feature_bins(feature);
        let n_bins = bins.n_bins();
        if n_bins < 2 {
            continue;
        }

        let column = matrix.column(feature);
        let mut hist = vec![(0.0_f64, 0.0_f64, 0_usize); n_bins];
        for &i in samples {
            let slot = &mut hist[column[i] as usize];
            slot.0 += grad[i];
            slot.1 += hess[i];
            slot.2 += 1;
        }

        let (mut gl, mut hl, mut cl) = (0.0, 0.0, 0);
        for (bin, &(g, h, c)) in hist.iter().enumerate().take(n_bins - 1) {
            gl += g;
            hl += h;
            cl += c;
            if cl < min_child {
                continue;
            }
            if n - cl < min_child {
                break;
            }
            let (gr, hr) = (sum_grad - gl, sum_hess - hl);
            if hl < params.min_child_weight || hr < params.min_child_weight {
                continue;
            }

            let gain = leaf_objective(gl, hl, params) + leaf_objective(gr, hr, params) - parent;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    bin,
                    threshold: bins.threshold(bin),
                    gain,
                    left_grad: gl,
                    left_hess: hl,
                });
            }
        }
    }

    best
}

/// Grows one tree on `samples`, considering only `features`.
///
/// The leaf with the largest gain is split next until `num_leaves` is reached
/// or no leaf has a positive-gain split.
#[must_use]
pub fn grow_tree(
    matrix: &BinnedMatrix,
    grad: &[f64],
    hess: &[f64],
    samples: Vec<usize>,
    features: &[usize],
    params: &TreeParams,
) -> Tree {
    let sum_grad: f64 = samples.iter().map(|&i| grad[i]).sum();
    let sum_hess: f64 = samples.iter().map(|&i| hess[i]).sum();

    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let root_split = if can_split(0, params) && params.num_leaves > 1 {
        best_split(matrix, grad, hess, &samples, sum_grad, sum_hess, features, params)
    } else {
        None
    };
    let mut leaves = vec![OpenLeaf {
        node: 0,
        samples,
        depth: 0,
        sum_grad,
        sum_hess,
        split: root_split,
    }];

    while leaves.len() < params.num_leaves {
        let next = leaves
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| leaf.split.as_ref().map(|s| (i, s.gain)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((pos, _)) = next else {
            break;
        };

        let leaf = leaves.swap_remove(pos);
        let Some(split) = leaf.split else {
            break;
        };

        let column = matrix.column(split.feature);
        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = leaf
            .samples
            .iter()
            .partition(|&&i| (column[i] as usize) <= split.bin);

        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf { value: 0.0 });
        nodes.push(Node::Leaf { value: 0.0 });
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };

        let depth = leaf.depth + 1;
        let children = [
            (left, left_samples, split.left_grad, split.left_hess),
            (
                right,
                right_samples,
                leaf.sum_grad - split.left_grad,
                leaf.sum_hess - split.left_hess,
            ),
        ];
        for (node, samples, g, h) in children {
            let split = if can_split(depth, params) {
                best_split(matrix, grad, hess, &samples, g, h, features, params)
            } else {
                None
            };
            leaves.push(OpenLeaf {
                node,
                samples,
                depth,
                sum_grad: g,
                sum_hess: h,
                split,
            });
        }
    }

    for leaf in &leaves {
        nodes[leaf.node] = Node::Leaf {
            value: leaf_output(leaf.sum_grad, leaf.sum_hess, params) * params.learning_rate,
        };
    }

    Tree { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TreeParams {
        TreeParams {
            num_leaves: 8,
            max_depth: None,
            min_child_samples: 1,
            min_child_weight: 1e-3,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
            learning_rate: 1.0,
        }
    }

    /// Squared-error gradients at a zero prediction: g = -y, h = 1.
    fn fit(rows: &[Vec<f64>], y: &[f64], params: &TreeParams) -> Tree {
        let matrix = BinnedMatrix::from_rows(rows, rows[0].len(), 255);
        let grad: Vec<f64> = y.iter().map(|v| -v).collect();
        let hess = vec![1.0; y.len()];
        let features: Vec<usize> = (0..rows[0].len()).collect();
        grow_tree(&matrix, &grad, &hess, (0..y.len()).collect(), &features, params)
    }

    #[test]
    fn test_step_function_is_recovered() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { -1.0 } else { 1.0 }).collect();
        let tree = fit(&rows, &y, &params());

        assert!((tree.predict(&[3.0]) + 1.0).abs() < 1e-12);
        assert!((tree.predict(&[15.0]) - 1.0).abs() < 1e-12);
        match &tree.nodes()[0] {
            Node::Split { threshold, .. } => assert!((threshold - 9.5).abs() < 1e-12),
            Node::Leaf { .. } => panic!("root should split"),
        }
    }

    #[test]
    fn test_num_leaves_bound() {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..64).map(|i| f64::from(i % 8)).collect();
        let mut p = params();
        p.num_leaves = 4;
        assert!(fit(&rows, &y, &p).n_leaves() <= 4);
    }

    #[test]
    fn test_max_depth_bound() {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..64).map(|i| f64::from(i % 8)).collect();
        let mut p = params();
        p.num_leaves = 64;
        p.max_depth = Some(1);
        assert_eq!(fit(&rows, &y, &p).n_leaves(), 2);
    }

    #[test]
    fn test_min_child_samples_blocks_split() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { -1.0 } else { 1.0 }).collect();
        let mut p = params();
        p.min_child_samples = 6;
        let tree = fit(&rows, &y, &p);
        assert_eq!(tree.n_leaves(), 1);
        assert!(tree.predict(&[0.0]).abs() < 1e-12);
    }

    #[test]
    fn test_regularised_leaf_output() {
        let p = TreeParams {
            reg_alpha: 1.0,
            reg_lambda: 2.0,
            ..params()
        };
        // -(sign(g) * (|g| - alpha)) / (h + lambda)
        assert!((leaf_output(-5.0, 2.0, &p) - 1.0).abs() < 1e-12);
        assert_eq!(leaf_output(0.5, 2.0, &p), 0.0);
    }

    #[test]
    fn test_learning_rate_shrinks_leaves() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let y = vec![2.0; 20];
        let mut p = params();
        p.learning_rate = 0.1;
        let tree = fit(&rows, &y, &p);
        assert_eq!(tree.n_leaves(), 1);
        assert!((tree.predict(&[0.0]) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_well_formed_check() {
        assert!(Tree::leaf(0.1).is_well_formed(3));
        let bad = Tree {
            nodes: vec![Node::Split {
                feature: 5,
                threshold: 0.0,
                left: 1,
                right: 2,
            }],
        };
        assert!(!bad.is_well_formed(3));
    }
}
