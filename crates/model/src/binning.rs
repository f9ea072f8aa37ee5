//! Histogram binning of feature columns.
//!
//! Each feature gets at most `max_bins` bins described by ascending upper
//! bounds; a value falls in the first bin whose bound is `>=` it. The last
//! bound is `+inf`, so every finite value has a bin.

/// Hard ceiling that keeps bin indices in a `u8`.
pub const MAX_BINS: usize = 255;

#[derive(Debug, Clone)]
pub struct FeatureBins {
    upper_bounds: Vec<f64>,
}

impl FeatureBins {
    /// Builds bin bounds from a column of training values.
    ///
    /// Columns with few distinct values get one bin per value, split halfway
    /// between neighbours. Wider columns are cut at quantiles.
    #[must_use]
    pub fn fit(values: &[f64], max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MAX_BINS);

        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);
        let mut distinct = sorted.clone();
        distinct.dedup();

        let mut upper_bounds = Vec::new();
        if distinct.len() <= max_bins {
            for pair in distinct.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let mid = a / 2.0 + b / 2.0;
                upper_bounds.push(if mid < b { mid } else { a });
            }
        } else {
            let max_value = sorted[sorted.len() - 1];
            for k in 1..max_bins {
                let q = sorted[k * sorted.len() / max_bins];
                if q < max_value && upper_bounds.last().map_or(true, |last| q > *last) {
                    upper_bounds.push(q);
                }
            }
        }
        upper_bounds.push(f64::INFINITY);

        Self { upper_bounds }
    }

    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    #[must_use]
    pub fn bin(&self, value: f64) -> u8 {
        let idx = self.upper_bounds.partition_point(|bound| *bound < value);
        idx.min(self.n_bins() - 1) as u8
    }

    /// Split threshold that sends bins `0..=bin` left.
    #[must_use]
    pub fn threshold(&self, bin: usize) -> f64 {
        self.upper_bounds[bin]
    }
}

/// Column-major bin indices for a whole training matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    bins: Vec<FeatureBins>,
    columns: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>], n_features: usize, max_bins: usize) -> Self {
        let mut bins = Vec::with_capacity(n_features);
        let mut columns = Vec::with_capacity(n_features);

        for f in 0..n_features {
            let values: Vec<f64> = rows.iter().map(|r| r[f]).collect();
            let fb = FeatureBins::fit(&values, max_bins);
            columns.push(values.iter().map(|v| fb.bin(*v)).collect());
            bins.push(fb);
        }

        Self { bins, columns }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.bins.len()
    }

    #[must_use]
    pub fn column(&self, feature: usize) -> &[u8] {
        &self.columns[feature]
    }

    #[must_use]
    pub fn feature_bins(&self, feature: usize) -> &FeatureBins {
        &self.bins[feature]
    }
}
