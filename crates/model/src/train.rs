use crate::error::{ModelError, Result};
use crate::gbm::{GbmClassifier, GbmParams};
use crate::report::ClassificationReport;
use fx_algo_features::Dataset;
use tracing::info;

/// Fits on the first part of `dataset` and reports on the held-out tail.
///
/// The split is chronological; the last `ceil(test_size * n)` rows are held out.
///
/// # Errors
/// Returns error if the split is impossible or training fails.
pub fn train_classifier(
    dataset: &Dataset,
    test_size: f64,
    params: GbmParams,
) -> Result<(GbmClassifier, ClassificationReport)> {
    let (train, validation) = dataset
        .train_test_split(test_size)
        .map_err(|e| ModelError::InvalidData(e.to_string()))?;

    info!(
        train_rows = train.len(),
        validation_rows = validation.len(),
        "Split dataset"
    );

    let model = GbmClassifier::fit(&train, params)?;

    let predictions = validation
        .features
        .iter()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<i8>>>()?;
    let report = ClassificationReport::from_predictions(&validation.labels, &predictions);

    info!(accuracy = report.accuracy, "Validation complete");
    Ok((model, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::tests::{separable_dataset, small_params};

    #[test]
    fn test_train_and_validate() {
        let data = separable_dataset(300);
        let (model, report) = train_classifier(&data, 0.2, small_params()).unwrap();

        assert_eq!(model.classes(), &[-1, 0, 1]);
        assert_eq!(report.macro_avg.support, 60);
        assert!(report.accuracy > 0.9, "accuracy = {}", report.accuracy);
    }

    #[test]
    fn test_ragged_dataset_is_invalid_data() {
        let mut data = separable_dataset(100);
        data.times.clear();
        assert!(matches!(
            train_classifier(&data, 0.2, small_params()),
            Err(ModelError::InvalidData(_))
        ));

        let mut data = separable_dataset(100);
        data.bar_indices.truncate(10);
        assert!(matches!(
            GbmClassifier::fit(&data, small_params()),
            Err(ModelError::InvalidData(_))
        ));
    }

    #[test]
    fn test_bad_split_is_invalid_data() {
        let data = separable_dataset(10);
        assert!(matches!(
            train_classifier(&data, 0.0, small_params()),
            Err(ModelError::InvalidData(_))
        ));
    }
}
