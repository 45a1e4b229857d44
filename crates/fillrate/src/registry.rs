//! View registry for discovery and introspection.
//!
//! The registry provides a centralized way to discover, instantiate, and
//! run aggregation views. It supports grouping by category (the dashboard
//! sections) and bulk computation of every view in one category.

use std::collections::HashMap;
use std::sync::Arc;

use polars::prelude::*;

use crate::error::{FillRateError, Result};
use crate::filter::FilteredTables;
use crate::traits::{View, ViewCategory};
use crate::views;

/// Metadata for view introspection.
#[derive(Debug, Clone)]
pub struct ViewInfo {
    /// View name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// View category
    pub category: ViewCategory,
    /// Columns of the emitted table, in order
    pub output_columns: Vec<String>,
}

/// Registry for view discovery and instantiation.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: HashMap<String, Arc<dyn View>>,
}

impl ViewRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            views: HashMap::new(),
        }
    }

    /// Register all standard views.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Overview
        registry.register(Arc::new(views::OverallFillRate::default()));
        registry.register(Arc::new(views::FillRateByDimension::shift_number()));
        registry.register(Arc::new(views::FillRateByDimension::shift_region()));
        registry.register(Arc::new(views::WeeklyFillRate::default()));

        // Shift characteristics
        registry.register(Arc::new(views::FillRateByDimension::task_group()));
        registry.register(Arc::new(views::FillRateByDimension::task_type()));
        registry.register(Arc::new(views::DurationFillRate::default()));

        // Worker profile
        registry.register(Arc::new(views::ExperienceEffect::default()));
        registry.register(Arc::new(views::FlagImpact::marketing()));
        registry.register(Arc::new(views::FlagImpact::profile()));
        registry.register(Arc::new(views::MetricBuckets::serp_frequency()));
        registry.register(Arc::new(views::MetricBuckets::item_view_frequency()));
        registry.register(Arc::new(views::MetricBuckets::quantity_responses()));

        // Retention
        registry.register(Arc::new(views::CohortRetention::default()));
        registry.register(Arc::new(views::SurvivalCurve::default()));

        registry
    }

    /// Register a view in the registry.
    pub fn register(&mut self, view: Arc<dyn View>) {
        self.views.insert(view.name().to_string(), view);
    }

    /// Get a view by name.
    pub fn get(&self, name: &str) -> Option<&dyn View> {
        self.views.get(name).map(|v| v.as_ref())
    }

    /// Get views by category.
    pub fn by_category(&self, category: ViewCategory) -> Vec<&dyn View> {
        self.views
            .values()
            .filter(|v| v.category() == category)
            .map(|v| v.as_ref())
            .collect()
    }

    /// Get all view metadata.
    pub fn all_info(&self) -> Vec<ViewInfo> {
        self.views
            .values()
            .map(|v| ViewInfo {
                name: v.name().to_string(),
                description: v.description().to_string(),
                category: v.category(),
                output_columns: v.output_columns().iter().map(|s| s.to_string()).collect(),
            })
            .collect()
    }

    /// Get all view names.
    pub fn names(&self) -> Vec<&str> {
        self.views.keys().map(|s| s.as_str()).collect()
    }

    /// Compute one view by name.
    pub fn compute(&self, name: &str, tables: &FilteredTables) -> Result<DataFrame> {
        self.get(name)
            .ok_or_else(|| FillRateError::NotFound(name.to_string()))?
            .compute(tables)
    }

    /// Compute every view in one category.
    ///
    /// Returns `(name, table)` pairs sorted by view name.
    pub fn compute_category(
        &self,
        category: ViewCategory,
        tables: &FilteredTables,
    ) -> Result<Vec<(String, DataFrame)>> {
        let mut results = Vec::new();
        for view in self.by_category(category) {
            results.push((view.name().to_string(), view.compute(tables)?));
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }

    /// Number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_category() {
        let registry = ViewRegistry::with_defaults();
        assert_eq!(registry.len(), 15);

        for category in [
            ViewCategory::Overview,
            ViewCategory::Shifts,
            ViewCategory::Workers,
            ViewCategory::Retention,
        ] {
            assert!(!registry.by_category(category).is_empty());
        }
    }

    #[test]
    fn test_all_views_have_info() {
        let registry = ViewRegistry::with_defaults();
        let all_info = registry.all_info();

        assert_eq!(all_info.len(), registry.len());
        for info in all_info {
            assert!(!info.name.is_empty());
            assert!(!info.description.is_empty());
            assert!(!info.output_columns.is_empty());
        }
    }

    #[test]
    fn test_compute_unknown_view_is_not_found() {
        let registry = ViewRegistry::with_defaults();
        let tables = FilteredTables {
            workers: df!["user_id" => [0u32], "user_avg_fr" => [1.0]].unwrap(),
            shifts: df!["user_id" => [0u32], "job_done" => [1.0]].unwrap(),
        };

        let result = registry.compute("no_such_view", &tables);
        assert!(matches!(result, Err(FillRateError::NotFound(_))));
    }

    #[test]
    fn test_every_default_view_handles_minimal_tables() {
        let registry = ViewRegistry::with_defaults();
        let tables = FilteredTables {
            workers: df!["user_id" => [0u32], "user_avg_fr" => [1.0]].unwrap(),
            shifts: df!["user_id" => [0u32], "job_done" => [1.0], "shift_number" => [1i32]]
                .unwrap(),
        };

        // Missing optional columns degrade to empty tables, never errors.
        for name in registry.names() {
            let result = registry.compute(name, &tables);
            assert!(result.is_ok(), "view {name} failed: {result:?}");
        }
    }
}
