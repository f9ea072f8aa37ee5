use chrono::{Duration, TimeZone, Utc};
use fx_algo_backtest::{backtest_model, MetricsCalculator, ReportFormatter, ThresholdParams};
use fx_algo_core::{Bar, DirectionModel};
use fx_algo_data::CsvStorage;
use fx_algo_features::{forward_return_labels, make_features, Dataset, FEATURE_COLUMNS};
use fx_algo_model::{load_model, save_model, train_classifier, GbmParams};

fn synthetic_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 1.0850 + (t * 0.15).sin() * 0.0030 + (t * 0.041).cos() * 0.0012;
            Bar {
                time: start + Duration::minutes(5 * i as i64),
                open: close - 0.0002,
                high: close + 0.0005,
                low: close - 0.0006,
                close,
                tick_volume: 80.0 + (i % 11) as f64,
                spread: 8.0 + (i % 4) as f64,
                real_volume: 0.0,
            }
        })
        .collect()
}

#[test]
fn test_csv_train_backtest_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("data").join("eurusd_m5.csv");
    let model_path = dir.path().join("models").join("model.json");
    let equity_path = dir.path().join("equity.csv");

    CsvStorage::write_bars(&data_path, &synthetic_bars(600)).unwrap();
    let bars = CsvStorage::read_bars(&data_path).unwrap();
    assert_eq!(bars.len(), 600);

    let frame = make_features(&bars);
    let labels = forward_return_labels(&bars, 6);
    let dataset = Dataset::from_frame(&frame, &labels).unwrap();
    assert_eq!(dataset.n_features(), FEATURE_COLUMNS.len());

    let params = GbmParams {
        n_estimators: 30,
        num_leaves: 8,
        min_child_samples: 10,
        learning_rate: 0.1,
        ..GbmParams::default()
    };
    let (model, report) = train_classifier(&dataset, 0.2, params).unwrap();
    assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);

    save_model(&model, &model_path).unwrap();
    let loaded = load_model(&model_path).unwrap();
    let row = &frame.rows()[0].values;
    assert!((model.prob_long(row).unwrap() - loaded.prob_long(row).unwrap()).abs() < 1e-12);

    let bt = ThresholdParams::default();
    let curve = backtest_model(&bars, &loaded, &bt).unwrap();
    assert_eq!(curve.len(), frame.len() - 1);

    let summary = MetricsCalculator::from_curve(&curve, bt.pip_value).calculate();
    assert_eq!(summary.bars, curve.len());
    assert!((summary.total_pnl - curve.final_equity()).abs() < 1e-9);
    assert!(summary.max_drawdown >= 0.0);
    assert!(ReportFormatter::format(&summary).contains("THRESHOLD BACKTEST RESULTS"));

    curve.write_csv(&equity_path).unwrap();
    let written = std::fs::read_to_string(&equity_path).unwrap();
    assert!(written.starts_with("time,direction,pnl,equity"));
    assert_eq!(written.lines().count(), curve.len() + 1);
}
