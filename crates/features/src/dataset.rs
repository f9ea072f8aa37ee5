//! Feature rows joined with labels, ready for training.

use crate::frame::FeatureFrame;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<i8>,
    pub times: Vec<DateTime<Utc>>,
    /// Source bar position of each row.
    pub bar_indices: Vec<usize>,
}

impl Dataset {
    /// Keeps the feature rows whose bar has a defined label.
    ///
    /// `labels` is indexed by bar position, one entry per input bar.
    ///
    /// # Errors
    /// Returns error if a feature row points past the end of `labels`.
    pub fn from_frame(frame: &FeatureFrame, labels: &[Option<i8>]) -> Result<Self> {
        let mut dataset = Self {
            feature_names: frame.columns().to_vec(),
            ..Self::default()
        };

        for row in frame.rows() {
            let Some(label) = labels.get(row.index) else {
                bail!(
                    "feature row at bar {} has no label entry ({} labels)",
                    row.index,
                    labels.len()
                );
            };
            if let Some(label) = label {
                dataset.features.push(row.values.clone());
                dataset.labels.push(*label);
                dataset.times.push(row.time);
                dataset.bar_indices.push(row.index);
            }
        }

        tracing::debug!(
            rows = dataset.len(),
            dropped = frame.len() - dataset.len(),
            "Built dataset"
        );
        Ok(dataset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Checks that every per-row column has one entry per label.
    ///
    /// # Errors
    /// Returns error naming the first column whose length differs.
    pub fn validate(&self) -> Result<()> {
        let n = self.labels.len();
        for (column, len) in [
            ("features", self.features.len()),
            ("times", self.times.len()),
            ("bar_indices", self.bar_indices.len()),
        ] {
            if len != n {
                bail!("dataset has {len} {column} entries for {n} labels");
            }
        }
        Ok(())
    }

    /// Chronological split without shuffling: the last `ceil(test_size * n)`
    /// rows become the test set.
    ///
    /// # Errors
    /// Returns error if the columns differ in length, `test_size` is outside
    /// `(0, 1)`, or either side would be empty.
    pub fn train_test_split(&self, test_size: f64) -> Result<(Self, Self)> {
        self.validate()?;
        if !(test_size > 0.0 && test_size < 1.0) {
            bail!("test_size must be in (0, 1), got {test_size}");
        }

        let n = self.len();
        let n_test = (test_size * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            bail!("cannot split {n} rows with test_size {test_size}");
        }
        let n_train = n - n_test;

        Ok((self.slice(0, n_train), self.slice(n_train, n)))
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features[start..end].to_vec(),
            labels: self.labels[start..end].to_vec(),
            times: self.times[start..end].to_vec(),
            bar_indices: self.bar_indices[start..end].to_vec(),
        }
    }
}
