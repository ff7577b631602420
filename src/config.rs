//! Page configuration
//!
//! Every widget value the page reads lives in [`PageConfig`], which is passed
//! by value through the pipeline stages. [`VariableCatalog`] holds the fixed
//! column groups a dataset exposes.

use crate::error::{ExplorerError, Result};
use crate::preprocessing::ScalingMode;
use crate::training::WeightScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dataset read when no path is configured
pub const DEFAULT_DATASET_PATH: &str = "datasets/main_data/main_data.csv";

pub const TRAIN_FRACTION_MIN: f64 = 0.5;
pub const TRAIN_FRACTION_MAX: f64 = 0.9;
pub const TRAIN_FRACTION_STEP: f64 = 0.05;
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.75;

pub const NEIGHBORS_MIN: usize = 2;
pub const NEIGHBORS_MAX: usize = 10;
pub const DEFAULT_NEIGHBORS: usize = 3;

/// Seed used for the train/test shuffle
pub const DEFAULT_RANDOM_STATE: u64 = 30;

// Tolerance for float comparisons against the widget bounds
const RANGE_EPS: f64 = 1e-9;

/// Train/test split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows used for training
    pub train_fraction: f64,
    /// Seed for the shuffle
    pub random_state: u64,
    /// How the test partition is standardized
    pub scaling: ScalingMode,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: DEFAULT_TRAIN_FRACTION,
            random_state: DEFAULT_RANDOM_STATE,
            scaling: ScalingMode::default(),
        }
    }
}

impl SplitConfig {
    /// Fraction of rows held out for evaluation
    pub fn test_fraction(&self) -> f64 {
        1.0 - self.train_fraction
    }
}

/// Classifier settings exposed on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNSettings {
    /// Number of neighbors; `None` means the input was left empty
    pub n_neighbors: Option<usize>,
    /// Weighting of neighbor votes
    pub weights: WeightScheme,
    /// Minkowski power (2 = Euclidean)
    pub p: f64,
}

impl Default for KNNSettings {
    fn default() -> Self {
        Self {
            n_neighbors: Some(DEFAULT_NEIGHBORS),
            weights: WeightScheme::Uniform,
            p: 2.0,
        }
    }
}

/// User-selected feature columns, one list per catalog group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelection {
    pub time: Vec<String>,
    pub categorical: Vec<String>,
    pub supplemental: Vec<String>,
}

/// Full configuration of one page render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Dataset location
    pub dataset_path: PathBuf,
    /// Column to predict; defaults to the first categorical variable
    #[serde(default)]
    pub target: Option<String>,
    /// Selected features; `None` uses the page defaults
    #[serde(default)]
    pub features: Option<FeatureSelection>,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub knn: KNNSettings,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            target: None,
            features: None,
            split: SplitConfig::default(),
            knn: KNNSettings::default(),
        }
    }
}

impl PageConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_features(mut self, features: FeatureSelection) -> Self {
        self.features = Some(features);
        self
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.split.train_fraction = fraction;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingMode) -> Self {
        self.split.scaling = scaling;
        self
    }

    pub fn with_neighbors(mut self, n_neighbors: Option<usize>) -> Self {
        self.knn.n_neighbors = n_neighbors;
        self
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.knn.weights = weights;
        self
    }

    /// Check widget values against their input bounds.
    ///
    /// The neighbor count is not checked here; the page turns an empty or
    /// out-of-range count into a warning.
    pub fn validate(&self) -> Result<()> {
        let ts = self.split.train_fraction;
        if !ts.is_finite()
            || ts < TRAIN_FRACTION_MIN - RANGE_EPS
            || ts > TRAIN_FRACTION_MAX + RANGE_EPS
        {
            return Err(ExplorerError::InvalidParameter {
                name: "train_fraction".to_string(),
                value: ts.to_string(),
                reason: format!(
                    "must be between {} and {}",
                    TRAIN_FRACTION_MIN, TRAIN_FRACTION_MAX
                ),
            });
        }

        if self.knn.p.is_nan() || self.knn.p < 1.0 {
            return Err(ExplorerError::InvalidParameter {
                name: "p".to_string(),
                value: self.knn.p.to_string(),
                reason: "Minkowski power must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn default_supplemental_range() -> [usize; 2] {
    [1, 4]
}

/// The three fixed column groups of a dataset.
///
/// Every categorical variable can also be chosen as the prediction target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCatalog {
    pub time: Vec<String>,
    pub categorical: Vec<String>,
    pub supplemental: Vec<String>,
    /// Half-open index range of supplemental variables selected by default
    #[serde(default = "default_supplemental_range")]
    pub supplemental_default_range: [usize; 2],
}

impl VariableCatalog {
    pub const TIME_PREFIX: &'static str = "time_";
    pub const SUPPLEMENTAL_PREFIX: &'static str = "sup_";

    pub fn new(time: Vec<String>, categorical: Vec<String>, supplemental: Vec<String>) -> Self {
        Self {
            time,
            categorical,
            supplemental,
            supplemental_default_range: default_supplemental_range(),
        }
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog: Self = serde_json::from_str(&json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Group dataset columns by name prefix.
    ///
    /// `time_*` columns are time variables, `sup_*` supplemental ones and
    /// everything else is categorical.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut time = Vec::new();
        let mut categorical = Vec::new();
        let mut supplemental = Vec::new();
        for name in columns {
            let name = name.as_ref();
            if name.starts_with(Self::TIME_PREFIX) {
                time.push(name.to_string());
            } else if name.starts_with(Self::SUPPLEMENTAL_PREFIX) {
                supplemental.push(name.to_string());
            } else {
                categorical.push(name.to_string());
            }
        }
        Self::new(time, categorical, supplemental)
    }

    /// Variables that can serve as the prediction target
    pub fn targets(&self) -> &[String] {
        &self.categorical
    }

    /// Supplemental variables selected by default
    pub fn default_supplemental(&self) -> Vec<String> {
        let len = self.supplemental.len();
        let start = self.supplemental_default_range[0].min(len);
        let end = self.supplemental_default_range[1].clamp(start, len);
        self.supplemental[start..end].to_vec()
    }

    /// Every column name mentioned by the catalog
    pub fn all_columns(&self) -> impl Iterator<Item = &String> {
        self.time
            .iter()
            .chain(self.categorical.iter())
            .chain(self.supplemental.iter())
    }

    pub fn validate(&self) -> Result<()> {
        if self.categorical.is_empty() {
            return Err(ExplorerError::ConfigError(
                "catalog needs at least one categorical variable to predict".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for name in self.all_columns() {
            if !seen.insert(name.as_str()) {
                return Err(ExplorerError::ConfigError(format!(
                    "column '{}' appears in more than one catalog group",
                    name
                )));
            }
        }
        Ok(())
    }
}
