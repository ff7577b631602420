//! Target and feature selection
//!
//! The target is one categorical variable; it is removed from the
//! categorical feature choices so it can never be both target and feature.

use crate::config::{FeatureSelection, PageConfig, VariableCatalog};
use crate::error::{ExplorerError, Result};
use std::collections::HashSet;

/// Categorical variables that may be used as features for `target`
pub fn available_categorical(catalog: &VariableCatalog, target: &str) -> Vec<String> {
    catalog
        .categorical
        .iter()
        .filter(|name| name.as_str() != target)
        .cloned()
        .collect()
}

impl FeatureSelection {
    /// Widget defaults: all time and categorical variables, and the
    /// catalog's supplemental subrange
    pub fn defaults(catalog: &VariableCatalog, target: &str) -> Self {
        Self {
            time: catalog.time.clone(),
            categorical: available_categorical(catalog, target),
            supplemental: catalog.default_supplemental(),
        }
    }

    /// Switch the target column.
    ///
    /// The categorical choices change with the target, so the categorical
    /// selection resets to every variable still available.
    pub fn retarget(&mut self, catalog: &VariableCatalog, new_target: &str) {
        self.categorical = available_categorical(catalog, new_target);
    }

    /// Concatenate the groups in time, categorical, supplemental order.
    ///
    /// Later duplicates are dropped. An empty result is returned as-is.
    pub fn feature_list(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.time
            .iter()
            .chain(self.categorical.iter())
            .chain(self.supplemental.iter())
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty() && self.categorical.is_empty() && self.supplemental.is_empty()
    }
}

/// Target column and ordered feature list for one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub target: String,
    pub features: Vec<String>,
}

/// Resolve the configured target and features against a catalog
pub struct FeatureSelector<'a> {
    catalog: &'a VariableCatalog,
}

impl<'a> FeatureSelector<'a> {
    pub fn new(catalog: &'a VariableCatalog) -> Self {
        Self { catalog }
    }

    /// Choices for the target select box
    pub fn targets(&self) -> &[String] {
        self.catalog.targets()
    }

    /// Pick the target (first categorical variable when unset) and the
    /// feature list. Selections outside their group's choices are dropped.
    pub fn resolve(&self, config: &PageConfig) -> Result<ResolvedSelection> {
        let target = match &config.target {
            Some(t) => {
                if !self.catalog.categorical.contains(t) {
                    return Err(ExplorerError::InvalidParameter {
                        name: "target".to_string(),
                        value: t.clone(),
                        reason: "not a categorical variable".to_string(),
                    });
                }
                t.clone()
            }
            None => self
                .catalog
                .categorical
                .first()
                .cloned()
                .ok_or_else(|| ExplorerError::ConfigError("no categorical variables".to_string()))?,
        };

        let selection = match &config.features {
            Some(sel) => self.restrict(sel, &target),
            None => FeatureSelection::defaults(self.catalog, &target),
        };

        Ok(ResolvedSelection {
            features: selection.feature_list(),
            target,
        })
    }

    fn restrict(&self, selection: &FeatureSelection, target: &str) -> FeatureSelection {
        let categorical = available_categorical(self.catalog, target);
        let keep = |chosen: &[String], allowed: &[String]| -> Vec<String> {
            chosen.iter().filter(|c| allowed.contains(c)).cloned().collect()
        };
        FeatureSelection {
            time: keep(&selection.time, &self.catalog.time),
            categorical: keep(&selection.categorical, &categorical),
            supplemental: keep(&selection.supplemental, &self.catalog.supplemental),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> VariableCatalog {
        VariableCatalog::new(
            vec!["time_hour".into(), "time_day".into()],
            vec!["mood".into(), "weather".into(), "activity".into()],
            vec!["sup_a".into(), "sup_b".into(), "sup_c".into(), "sup_d".into(), "sup_e".into()],
        )
    }

    #[test]
    fn test_target_removed_from_choices() {
        let cat = catalog();
        assert_eq!(available_categorical(&cat, "weather"), vec!["mood", "activity"]);
    }

    #[test]
    fn test_defaults_order() {
        let cat = catalog();
        let config = PageConfig::new();
        let resolved = FeatureSelector::new(&cat).resolve(&config).unwrap();
        assert_eq!(resolved.target, "mood");
        assert_eq!(
            resolved.features,
            vec!["time_hour", "time_day", "weather", "activity", "sup_b", "sup_c", "sup_d"]
        );
    }

    #[test]
    fn test_target_cannot_be_feature() {
        let cat = catalog();
        let config = PageConfig::new()
            .with_target("weather")
            .with_features(FeatureSelection {
                time: vec![],
                categorical: vec!["weather".into(), "mood".into()],
                supplemental: vec![],
            });
        let resolved = FeatureSelector::new(&cat).resolve(&config).unwrap();
        assert_eq!(resolved.features, vec!["mood"]);
    }

    #[test]
    fn test_retarget_restores_previous_target() {
        let catalog = catalog();
        let mut features = FeatureSelection::defaults(&catalog, "mood");
        features.time = vec!["time_day".into()];
        assert_eq!(features.categorical, vec!["weather", "activity"]);

        features.retarget(&catalog, "weather");
        assert_eq!(features.categorical, vec!["mood", "activity"]);
        assert_eq!(features.time, vec!["time_day"]);
    }

    #[test]
    fn test_feature_list_dedupes() {
        let sel = FeatureSelection {
            time: vec!["a".into(), "b".into()],
            categorical: vec!["b".into(), "c".into()],
            supplemental: vec!["a".into(), "d".into()],
        };
        assert_eq!(sel.feature_list(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_selection_passes_through() {
        let cat = catalog();
        let config = PageConfig::new().with_features(FeatureSelection::default());
        let resolved = FeatureSelector::new(&cat).resolve(&config).unwrap();
        assert!(resolved.features.is_empty());
    }

    #[test]
    fn test_unknown_target() {
        let cat = catalog();
        let config = PageConfig::new().with_target("time_hour");
        assert!(FeatureSelector::new(&cat).resolve(&config).is_err());
    }
}
