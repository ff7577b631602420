//! The k-NN explorer page
//!
//! One call to [`KnnPage::render`] is one full top-to-bottom execution of the
//! page: session guard, dataset load, target/feature selection, split and
//! scale, model fit, evaluation. The page either produces a [`PageReport`] or
//! stops at one of the [`Halt`] gates. Dataset loads, fitted models and their
//! evaluations are memoized across renders.

use crate::cache::{CacheKey, CacheStats, MemoCache};
use crate::config::{PageConfig, VariableCatalog, NEIGHBORS_MAX, NEIGHBORS_MIN};
use crate::data::{column_to_labels, columns_to_array2, DatasetLoader};
use crate::error::{ExplorerError, Result};
use crate::evaluation::{evaluate, ConfusionMatrix, Evaluation};
use crate::preprocessing::{scale_partitions, train_test_split};
use crate::selection::{FeatureSelector, ResolvedSelection};
use crate::session::{require_logged_user, SessionStore};
use crate::training::{DistanceMetric, KNNClassifier, KNNConfig};
use polars::prelude::DataFrame;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Label of the manual retry control shown after a failed fit
pub const RETRY_LABEL: &str = "Click here to run the algorithm and create a model";

const DATASET_CACHE_SIZE: usize = 4;
const MODEL_CACHE_SIZE: usize = 32;

/// Why a render stopped before producing results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// No logged-in user in the session
    NotLoggedIn,
    /// Neighbor count left empty or zero
    MissingNeighbors,
    /// Neighbor count outside the accepted range
    InvalidNeighbors { value: usize },
    /// Fitting the model failed; the user may retry
    ModelUnavailable { reason: String },
}

impl Halt {
    /// Short message shown to the user
    pub fn message(&self) -> &str {
        match self {
            Halt::NotLoggedIn => "You must be logged in to access this page",
            Halt::MissingNeighbors => "Please enter the number of neighbors",
            Halt::InvalidNeighbors { .. } => "Please enter a number of neighbors between 2 and 10",
            Halt::ModelUnavailable { .. } => "The model could not be created",
        }
    }

    /// Whether the page offers a retry control
    pub fn is_retryable(&self) -> bool {
        matches!(self, Halt::ModelUnavailable { .. })
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::ModelUnavailable { reason } => write!(f, "{}: {}", self.message(), reason),
            Halt::InvalidNeighbors { value } => write!(f, "{} (got {})", self.message(), value),
            _ => write!(f, "{}", self.message()),
        }
    }
}

/// Everything a successful render displays
#[derive(Debug, Clone)]
pub struct PageReport {
    pub user: String,
    pub target: String,
    pub features: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub n_neighbors: usize,
    pub accuracy_percent: f64,
    pub confusion: ConfusionMatrix,
    /// Names of the class codes when the target column holds text
    pub class_names: Option<Vec<String>>,
    pub model_from_cache: bool,
}

/// Result of one render
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Rendered(PageReport),
    Halted(Halt),
}

impl PageOutcome {
    pub fn report(&self) -> Option<&PageReport> {
        match self {
            PageOutcome::Rendered(report) => Some(report),
            PageOutcome::Halted(_) => None,
        }
    }

    pub fn halt(&self) -> Option<&Halt> {
        match self {
            PageOutcome::Rendered(_) => None,
            PageOutcome::Halted(halt) => Some(halt),
        }
    }
}

/// A fitted model and its test-partition evaluation
#[derive(Debug)]
struct FittedModel {
    model: KNNClassifier,
    evaluation: Evaluation,
}

/// The page with its per-session caches
pub struct KnnPage {
    session: Arc<dyn SessionStore>,
    loader: DatasetLoader,
    datasets: MemoCache<PathBuf, Arc<DataFrame>>,
    models: MemoCache<CacheKey, Arc<FittedModel>>,
}

impl KnnPage {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self::with_loader(session, DatasetLoader::new())
    }

    pub fn with_loader(session: Arc<dyn SessionStore>, loader: DatasetLoader) -> Self {
        Self {
            session,
            loader,
            datasets: MemoCache::new(DATASET_CACHE_SIZE),
            models: MemoCache::new(MODEL_CACHE_SIZE),
        }
    }

    /// Run the page once.
    ///
    /// Halts are returned as [`PageOutcome::Halted`]. Invalid configuration
    /// and dataset failures are errors.
    pub fn render(&self, config: &PageConfig, catalog: &VariableCatalog) -> Result<PageOutcome> {
        let start = Instant::now();

        let user = match require_logged_user(self.session.as_ref()) {
            Ok(user) => user,
            Err(ExplorerError::NotLoggedIn) => return Ok(PageOutcome::Halted(Halt::NotLoggedIn)),
            Err(e) => return Err(e),
        };

        config.validate()?;
        let df = self.dataset(config)?;
        let selection = FeatureSelector::new(catalog).resolve(config)?;
        debug!(target_column = %selection.target, features = ?selection.features, "selection resolved");

        let x = columns_to_array2(&df, &selection.features)?;
        let labels = column_to_labels(&df, &selection.target)?;
        let split = train_test_split(
            &x,
            &labels.codes,
            config.split.test_fraction(),
            Some(config.split.random_state),
        )?;
        let (x_train, x_test) = scale_partitions(config.split.scaling, &split.x_train, &split.x_test)?;
        info!(
            train_rows = split.n_train(),
            test_rows = split.n_test(),
            scaling = %config.split.scaling,
            "data split"
        );

        let k = match config.knn.n_neighbors {
            Some(k) if (NEIGHBORS_MIN..=NEIGHBORS_MAX).contains(&k) => k,
            None | Some(0) => {
                warn!("neighbor count missing, model not trained");
                return Ok(PageOutcome::Halted(Halt::MissingNeighbors));
            }
            Some(value) => {
                warn!(value, "neighbor count out of range, model not trained");
                return Ok(PageOutcome::Halted(Halt::InvalidNeighbors { value }));
            }
        };

        let key = model_key(config, &selection, k);
        let fitted = self.models.get_or_try_insert_with(key, || {
            let mut model = KNNClassifier::new(KNNConfig {
                n_neighbors: k,
                metric: DistanceMetric::minkowski(config.knn.p),
                weights: config.knn.weights,
            });
            model.fit(&x_train, &split.y_train)?;
            let evaluation = evaluate(&model, &x_test, &split.y_test)?;
            info!(%key, k, weights = %config.knn.weights, train_rows = x_train.nrows(), "model fitted");
            Ok::<_, ExplorerError>(Arc::new(FittedModel { model, evaluation }))
        });

        let (fitted, model_from_cache) = match fitted {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "model construction failed");
                return Ok(PageOutcome::Halted(Halt::ModelUnavailable {
                    reason: e.to_string(),
                }));
            }
        };
        debug!(%key, classes = ?fitted.model.classes(), cached = model_from_cache, "model ready");

        let evaluation = &fitted.evaluation;
        info!(
            accuracy = evaluation.accuracy_percent,
            n_test = evaluation.n_test,
            elapsed = ?start.elapsed(),
            "page rendered"
        );

        Ok(PageOutcome::Rendered(PageReport {
            user,
            target: selection.target,
            features: selection.features,
            n_train: split.n_train(),
            n_test: evaluation.n_test,
            n_neighbors: k,
            accuracy_percent: evaluation.accuracy_percent,
            confusion: evaluation.confusion.clone(),
            class_names: labels.names,
            model_from_cache,
        }))
    }

    /// Load the configured dataset, reusing an earlier load of the same path
    pub fn dataset(&self, config: &PageConfig) -> Result<Arc<DataFrame>> {
        let path = config.dataset_path.clone();
        let (df, cached) = self
            .datasets
            .get_or_try_insert_with(path, || self.loader.load(&config.dataset_path).map(Arc::new))?;
        debug!(path = %config.dataset_path.display(), cached, "dataset ready");
        Ok(df)
    }

    pub fn dataset_cache_stats(&self) -> CacheStats {
        self.datasets.stats()
    }

    pub fn model_cache_stats(&self) -> CacheStats {
        self.models.stats()
    }

    /// Forget every memoized dataset and model
    pub fn clear_caches(&self) {
        self.datasets.clear();
        self.models.clear();
    }
}

/// Hash of every input that affects the fitted model
fn model_key(config: &PageConfig, selection: &ResolvedSelection, k: usize) -> CacheKey {
    CacheKey::builder()
        .str(&config.dataset_path.to_string_lossy())
        .strs(&selection.features)
        .str(&selection.target)
        .f64(config.split.train_fraction)
        .u64(config.split.random_state)
        .str(&config.split.scaling.to_string())
        .u64(k as u64)
        .str(&config.knn.weights.to_string())
        .f64(config.knn.p)
        .finish()
}
