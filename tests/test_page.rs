//! Integration tests for the page: guard, halts, evaluation output and caching

use knn_explorer::prelude::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

const N_ROWS: usize = 1000;
const N_CLASSES: usize = 5;

/// 1000 rows, five balanced `mood` classes separable on the time features
fn write_dataset(dir: &Path) -> PathBuf {
    let mut csv = String::from("time_hour,time_day,mood,weather,sup_a,sup_b,sup_c,sup_d,sup_e\n");
    for i in 0..N_ROWS {
        let class = i % N_CLASSES + 1;
        let jitter = ((i * 37) % 100) as f64 / 100.0;
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{}",
            class as f64 * 3.0 + jitter,
            class as f64 * 2.0 - jitter,
            class,
            i % 3 + 1,
            jitter,
            (i % 7) as f64,
            (i % 11) as f64 * 0.5,
            class as f64 + jitter * 4.0,
            (i % 5) as f64
        );
    }
    let path = dir.join("main_data.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn catalog() -> VariableCatalog {
    VariableCatalog::new(
        vec!["time_hour".into(), "time_day".into()],
        vec!["mood".into(), "weather".into()],
        vec!["sup_a".into(), "sup_b".into(), "sup_c".into(), "sup_d".into(), "sup_e".into()],
    )
}

fn logged_in_page() -> KnnPage {
    KnnPage::new(Arc::new(InMemorySession::with_user("ana")))
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_balanced_dataset_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_dataset(dir.path()))
        .with_target("mood")
        .with_train_fraction(0.75)
        .with_neighbors(Some(3))
        .with_weights(WeightScheme::Uniform);

    let outcome = logged_in_page().render(&config, &catalog()).unwrap();
    let report = outcome.report().expect("page should render");

    assert_eq!(report.user, "ana");
    assert_eq!(report.n_test, 250);
    assert_eq!(report.n_train, 750);
    assert_eq!(report.confusion.n_classes(), 5);
    assert_eq!(report.confusion.total(), 250);
    assert_eq!(report.confusion.labels(), &[1, 2, 3, 4, 5]);

    let acc = report.accuracy_percent;
    assert!((0.0..=100.0).contains(&acc));
    assert!(((acc * 100.0).round() - acc * 100.0).abs() < 1e-6);
}

#[test]
fn test_separable_features_classify_well() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_dataset(dir.path()))
        .with_features(FeatureSelection {
            time: vec!["time_hour".into(), "time_day".into()],
            ..FeatureSelection::default()
        });

    let outcome = logged_in_page().render(&config, &catalog()).unwrap();
    let acc = outcome.report().unwrap().accuracy_percent;
    assert!(acc > 90.0, "accuracy {} too low", acc);
}

#[test]
fn test_default_features_exclude_target() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new().with_dataset(write_dataset(dir.path()));

    let outcome = logged_in_page().render(&config, &catalog()).unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.target, "mood");
    assert_eq!(
        report.features,
        vec!["time_hour", "time_day", "weather", "sup_b", "sup_c", "sup_d"]
    );
}

#[test]
fn test_target_cannot_be_a_feature() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_dataset(dir.path()))
        .with_target("weather")
        .with_features(FeatureSelection {
            time: vec!["time_hour".into()],
            categorical: vec!["weather".into(), "mood".into()],
            supplemental: vec![],
        });

    let outcome = logged_in_page().render(&config, &catalog()).unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.features, vec!["time_hour", "mood"]);
    assert_eq!(report.confusion.n_classes(), 3);
}

#[test]
fn test_missing_neighbors_halts_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let page = logged_in_page();

    for k in [None, Some(0)] {
        let config = PageConfig::new()
            .with_dataset(write_dataset(dir.path()))
            .with_neighbors(k);
        let outcome = page.render(&config, &catalog()).unwrap();
        assert_eq!(outcome.halt(), Some(&Halt::MissingNeighbors));
        assert!(outcome.report().is_none());
    }
    assert_eq!(page.model_cache_stats().entries, 0);
}

#[test]
fn test_out_of_range_neighbors_warn_and_recover() {
    let dir = tempfile::tempdir().unwrap();
    let page = logged_in_page();
    let base = PageConfig::new().with_dataset(write_dataset(dir.path()));

    for k in [1, 11] {
        let outcome = page.render(&base.clone().with_neighbors(Some(k)), &catalog()).unwrap();
        assert_eq!(outcome.halt(), Some(&Halt::InvalidNeighbors { value: k }));
        assert!(!outcome.halt().unwrap().is_retryable());
    }
    assert_eq!(page.model_cache_stats().entries, 0);

    // Correcting the input renders normally
    let outcome = page.render(&base.with_neighbors(Some(10)), &catalog()).unwrap();
    assert_eq!(outcome.report().unwrap().n_neighbors, 10);
}

#[test]
fn test_empty_features_offer_retry() {
    let dir = tempfile::tempdir().unwrap();
    let page = logged_in_page();
    let empty = PageConfig::new()
        .with_dataset(write_dataset(dir.path()))
        .with_features(FeatureSelection::default());

    let outcome = page.render(&empty, &catalog()).unwrap();
    match outcome.halt() {
        Some(halt @ Halt::ModelUnavailable { .. }) => assert!(halt.is_retryable()),
        other => panic!("expected retry halt, got {:?}", other),
    }
    // Failed fits are not memoized
    assert_eq!(page.model_cache_stats().entries, 0);

    let fixed = empty.with_features(FeatureSelection {
        time: vec!["time_hour".into()],
        ..FeatureSelection::default()
    });
    assert!(page.render(&fixed, &catalog()).unwrap().report().is_some());
}

#[test]
fn test_not_logged_in() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new().with_dataset(write_dataset(dir.path()));

    for session in [InMemorySession::new(), InMemorySession::with_user("  ")] {
        let page = KnnPage::new(Arc::new(session));
        let outcome = page.render(&config, &catalog()).unwrap();
        assert_eq!(outcome.halt(), Some(&Halt::NotLoggedIn));
        assert_eq!(page.dataset_cache_stats().misses, 0);
    }
}

#[test]
fn test_missing_dataset_is_fatal() {
    let config = PageConfig::new().with_dataset("/no/such/dir/main_data.csv");
    let result = logged_in_page().render(&config, &catalog());
    assert!(matches!(result, Err(ExplorerError::DataError(_))));
}

#[test]
fn test_invalid_widget_value_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_dataset(dir.path()))
        .with_train_fraction(0.95);
    let result = logged_in_page().render(&config, &catalog());
    assert!(matches!(result, Err(ExplorerError::InvalidParameter { .. })));
}

// ============================================================================
// Column types
// ============================================================================

/// 60 rows with a text `weather` column that follows `time_hour`
fn write_text_dataset(dir: &Path, blank_row: Option<usize>) -> PathBuf {
    let names = ["cloudy", "rainy", "sunny"];
    let mut csv = String::from("time_hour,mood,weather\n");
    for i in 0..60 {
        let class = i % 3;
        let hour = if blank_row == Some(i) {
            String::new()
        } else {
            format!("{}", class as f64 * 5.0 + (i % 4) as f64 * 0.1)
        };
        let _ = writeln!(csv, "{},{},{}", hour, i % 2 + 1, names[class]);
    }
    let path = dir.join("text_data.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn text_catalog() -> VariableCatalog {
    VariableCatalog::new(vec!["time_hour".into()], vec!["mood".into(), "weather".into()], vec![])
}

#[test]
fn test_text_feature_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_text_dataset(dir.path(), None))
        .with_target("mood")
        .with_features(FeatureSelection {
            time: vec!["time_hour".into()],
            categorical: vec!["weather".into()],
            ..FeatureSelection::default()
        });
    let result = logged_in_page().render(&config, &text_catalog());
    assert!(matches!(result, Err(ExplorerError::DataError(_))));
}

#[test]
fn test_text_target_is_encoded() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_text_dataset(dir.path(), None))
        .with_target("weather")
        .with_features(FeatureSelection {
            time: vec!["time_hour".into()],
            ..FeatureSelection::default()
        });
    let outcome = logged_in_page().render(&config, &text_catalog()).unwrap();
    let report = outcome.report().unwrap();
    assert!(report.confusion.labels().iter().all(|l| (1..=3).contains(l)));
    assert_eq!(
        report.class_names.as_deref(),
        Some(&["cloudy".to_string(), "rainy".to_string(), "sunny".to_string()][..])
    );
    assert!((report.accuracy_percent - 100.0).abs() < 1e-9);
}

#[test]
fn test_missing_feature_value_offers_retry() {
    let dir = tempfile::tempdir().unwrap();
    let config = PageConfig::new()
        .with_dataset(write_text_dataset(dir.path(), Some(7)))
        .with_target("weather")
        .with_features(FeatureSelection {
            time: vec!["time_hour".into()],
            ..FeatureSelection::default()
        });
    let outcome = logged_in_page().render(&config, &text_catalog()).unwrap();
    assert!(matches!(outcome.halt(), Some(Halt::ModelUnavailable { .. })));
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn test_rerender_reuses_dataset_and_model() {
    let dir = tempfile::tempdir().unwrap();
    let page = logged_in_page();
    let config = PageConfig::new().with_dataset(write_dataset(dir.path()));

    let first = page.render(&config, &catalog()).unwrap();
    let second = page.render(&config, &catalog()).unwrap();

    assert!(!first.report().unwrap().model_from_cache);
    assert!(second.report().unwrap().model_from_cache);
    assert_eq!(
        first.report().unwrap().accuracy_percent,
        second.report().unwrap().accuracy_percent
    );

    let datasets = page.dataset_cache_stats();
    assert_eq!(datasets.misses, 1);
    assert_eq!(datasets.hits, 1);
}

#[test]
fn test_changed_widgets_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let page = logged_in_page();
    let base = PageConfig::new().with_dataset(write_dataset(dir.path()));

    page.render(&base, &catalog()).unwrap();

    let changes = [
        base.clone().with_neighbors(Some(5)),
        base.clone().with_weights(WeightScheme::Distance),
        base.clone().with_train_fraction(0.6),
        base.clone().with_target("weather"),
        base.clone().with_scaling(ScalingMode::PerPartition),
    ];
    for config in &changes {
        let outcome = page.render(config, &catalog()).unwrap();
        assert!(!outcome.report().unwrap().model_from_cache, "{:?} served stale model", config);
    }
    assert_eq!(page.model_cache_stats().entries, 1 + changes.len());

    page.clear_caches();
    let outcome = page.render(&base, &catalog()).unwrap();
    assert!(!outcome.report().unwrap().model_from_cache);
}
