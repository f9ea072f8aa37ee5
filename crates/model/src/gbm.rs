//! Multiclass gradient boosting with softmax loss.

use crate::binning::{BinnedMatrix, MAX_BINS};
use crate::error::{ModelError, Result};
use crate::tree::{grow_tree, Tree, TreeParams};
use fx_algo_core::{DirectionModel, TrainingConfig};
use fx_algo_features::Dataset;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minimum hessian sum per child.
const MIN_CHILD_WEIGHT: f64 = 1e-3;

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    /// Number of boosting iterations; each adds one tree per class.
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// `None` leaves depth unbounded.
    pub max_depth: Option<usize>,
    pub num_leaves: usize,
    /// Row fraction drawn for bagging.
    pub subsample: f64,
    /// Redraw the bag every this many iterations; 0 disables bagging.
    pub subsample_freq: usize,
    /// Column fraction drawn for each tree.
    pub colsample_bytree: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_samples: usize,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for GbmParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            num_leaves: config.num_leaves,
            subsample: config.subsample,
            subsample_freq: config.subsample_freq,
            colsample_bytree: config.colsample_bytree,
            reg_alpha: config.reg_alpha,
            reg_lambda: config.reg_lambda,
            min_child_samples: config.min_child_samples,
            max_bins: MAX_BINS,
            seed: config.seed,
        }
    }
}

impl GbmParams {
    /// # Errors
    /// Returns [`ModelError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        if !(self.learning_rate > 0.0) {
            return Err(ModelError::InvalidParams(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(ModelError::InvalidParams(format!(
                "num_leaves must be at least 2, got {}",
                self.num_leaves
            )));
        }
        if !fraction(self.subsample) {
            return Err(ModelError::InvalidParams(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        if !fraction(self.colsample_bytree) {
            return Err(ModelError::InvalidParams(format!(
                "colsample_bytree must be in (0, 1], got {}",
                self.colsample_bytree
            )));
        }
        if self.reg_alpha < 0.0 || self.reg_lambda < 0.0 {
            return Err(ModelError::InvalidParams(
                "reg_alpha and reg_lambda must be non-negative".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidParams(
                "max_depth must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    const fn bagging_enabled(&self) -> bool {
        self.subsample_freq > 0 && self.subsample < 1.0
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            num_leaves: self.num_leaves,
            max_depth: self.max_depth,
            min_child_samples: self.min_child_samples,
            min_child_weight: MIN_CHILD_WEIGHT,
            reg_alpha: self.reg_alpha,
            reg_lambda: self.reg_lambda,
            learning_rate: self.learning_rate,
        }
    }
}

/// Gradient-boosted trees over the sorted distinct labels of the training set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmClassifier {
    params: GbmParams,
    classes: Vec<i8>,
    feature_names: Vec<String>,
    /// Log prior of each class.
    init_scores: Vec<f64>,
    /// `trees[iteration][class]`
    trees: Vec<Vec<Tree>>,
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl GbmClassifier {
    /// Fits the model to every row of `dataset`.
    ///
    /// # Errors
    /// Returns error on invalid parameters, an empty dataset, ragged rows,
    /// or fewer than two distinct labels.
    pub fn fit(dataset: &Dataset, params: GbmParams) -> Result<Self> {
        params.validate()?;

        let n = dataset.len();
        let d = dataset.n_features();
        if n == 0 {
            return Err(ModelError::InvalidData("dataset is empty".to_string()));
        }
        dataset
            .validate()
            .map_err(|e| ModelError::InvalidData(e.to_string()))?;
        if let Some(row) = dataset.features.iter().find(|r| r.len() != d) {
            return Err(ModelError::FeatureMismatch {
                expected: d,
                got: row.len(),
            });
        }

        let mut classes = dataset.labels.clone();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ModelError::InvalidData(format!(
                "need at least two classes, found {classes:?}"
            )));
        }
        let k = classes.len();
        let targets: Vec<usize> = dataset
            .labels
            .iter()
            .map(|y| classes.binary_search(y).unwrap_or_default())
            .collect();

        let mut counts = vec![0usize; k];
        for &t in &targets {
            counts[t] += 1;
        }
        let init_scores: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).max(1e-15).ln())
            .collect();

        info!(
            rows = n,
            features = d,
            classes = ?classes,
            n_estimators = params.n_estimators,
            "Training gradient boosting classifier"
        );

        let matrix = BinnedMatrix::from_rows(&dataset.features, d, params.max_bins);
        let tree_params = params.tree_params();
        let factor = k as f64 / (k as f64 - 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

        let mut scores: Vec<Vec<f64>> = vec![init_scores.clone(); n];
        let mut bag: Vec<usize> = (0..n).collect();
        let mut trees: Vec<Vec<Tree>> = Vec::with_capacity(params.n_estimators);

        for iteration in 0..params.n_estimators {
            if params.bagging_enabled() && iteration % params.subsample_freq == 0 {
                let size = ((params.subsample * n as f64).round() as usize).clamp(1, n);
                bag = index::sample(&mut rng, n, size).into_vec();
                bag.sort_unstable();
            }

            let probs: Vec<Vec<f64>> = scores.iter().map(|s| softmax(s)).collect();
            let mut round = Vec::with_capacity(k);
            for class in 0..k {
                let mut grad = Vec::with_capacity(n);
                let mut hess = Vec::with_capacity(n);
                for (p, &t) in probs.iter().zip(&targets) {
                    let p = p[class];
                    let y = if t == class { 1.0 } else { 0.0 };
                    grad.push(p - y);
                    hess.push((factor * p * (1.0 - p)).max(1e-16));
                }

                let n_cols =
                    ((params.colsample_bytree * d as f64).round() as usize).clamp(1, d.max(1));
                let mut features = index::sample(&mut rng, d, n_cols.min(d)).into_vec();
                features.sort_unstable();

                round.push(grow_tree(&matrix, &grad, &hess, bag.clone(), &features, &tree_params));
            }

            if round.iter().all(|t| t.n_leaves() == 1) {
                info!(iteration, "No further splits meet the requirements, stopping early");
                break;
            }

            for (row, score) in dataset.features.iter().zip(scores.iter_mut()) {
                for (s, tree) in score.iter_mut().zip(&round) {
                    *s += tree.predict(row);
                }
            }
            trees.push(round);

            if (iteration + 1) % 50 == 0 {
                let log_loss = probs
                    .iter()
                    .zip(&targets)
                    .map(|(p, &t)| -p[t].max(1e-15).ln())
                    .sum::<f64>()
                    / n as f64;
                debug!(iteration = iteration + 1, log_loss, "Boosting progress");
            }
        }

        info!(iterations = trees.len(), "Training complete");

        Ok(Self {
            params,
            classes,
            feature_names: dataset.feature_names.clone(),
            init_scores,
            trees,
        })
    }

    #[must_use]
    pub fn classes(&self) -> &[i8] {
        &self.classes
    }

    #[must_use]
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    #[must_use]
    pub fn n_iterations(&self) -> usize {
        self.trees.len()
    }

    fn check_row(&self, row: &[f64]) -> Result<()> {
        if row.len() == self.feature_names.len() {
            Ok(())
        } else {
            Err(ModelError::FeatureMismatch {
                expected: self.feature_names.len(),
                got: row.len(),
            })
        }
    }

    /// Raw additive scores, one per class.
    ///
    /// # Errors
    /// Returns [`ModelError::FeatureMismatch`] if the row has the wrong width.
    pub fn predict_raw(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_row(row)?;
        let mut scores = self.init_scores.clone();
        for round in &self.trees {
            for (s, tree) in scores.iter_mut().zip(round) {
                *s += tree.predict(row);
            }
        }
        Ok(scores)
    }

    /// Class probabilities in [`classes`](Self::classes) order.
    ///
    /// # Errors
    /// Returns [`ModelError::FeatureMismatch`] if the row has the wrong width.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        Ok(softmax(&self.predict_raw(row)?))
    }

    /// Most probable class; ties go to the smaller label.
    ///
    /// # Errors
    /// Returns [`ModelError::FeatureMismatch`] if the row has the wrong width.
    pub fn predict(&self, row: &[f64]) -> Result<i8> {
        let probs = self.predict_proba(row)?;
        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        Ok(self.classes[best])
    }

    /// Probability of `class`, 0 when the model never saw it.
    ///
    /// # Errors
    /// Returns [`ModelError::FeatureMismatch`] if the row has the wrong width.
    pub fn class_probability(&self, row: &[f64], class: i8) -> Result<f64> {
        let probs = self.predict_proba(row)?;
        Ok(self
            .classes
            .iter()
            .position(|c| *c == class)
            .map_or(0.0, |i| probs[i]))
    }

    /// Split counts per feature, highest first.
    #[must_use]
    pub fn feature_importance(&self) -> Vec<(String, usize)> {
        let mut counts = vec![0usize; self.feature_names.len()];
        for tree in self.trees.iter().flatten() {
            for node in tree.nodes() {
                if let crate::tree::Node::Split { feature, .. } = node {
                    counts[*feature] += 1;
                }
            }
        }
        let mut ranked: Vec<(String, usize)> =
            self.feature_names.iter().cloned().zip(counts).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Structural checks for a model read from disk.
    pub(crate) fn validate_loaded(&self) -> Result<()> {
        let k = self.classes.len();
        if k < 2 || self.init_scores.len() != k {
            return Err(ModelError::InvalidData(format!(
                "model has {} classes and {} initial scores",
                k,
                self.init_scores.len()
            )));
        }
        let d = self.feature_names.len();
        for round in &self.trees {
            if round.len() != k || !round.iter().all(|t| t.is_well_formed(d)) {
                return Err(ModelError::InvalidData(
                    "model contains a malformed tree".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl DirectionModel for GbmClassifier {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn prob_long(&self, features: &[f64]) -> anyhow::Result<f64> {
        Ok(self.class_probability(features, 1)?)
    }
}
