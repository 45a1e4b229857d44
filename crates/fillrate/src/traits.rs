//! Core trait definitions for aggregation views.
//!
//! All aggregation views implement the [`View`] trait, which provides a
//! unified interface for turning the filtered worker/shift tables into a
//! small structured output table. Views never render anything; a
//! presentation layer consumes the emitted rows.

use derive_more::Display;
use polars::prelude::*;

use crate::Result;
use crate::filter::FilteredTables;

/// Dashboard section a view belongs to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewCategory {
    /// Platform health: overall and per-slot fill rate, weekly dynamics
    Overview,
    /// Shift characteristics: task groups, task types, duration
    Shifts,
    /// Worker profile: experience, flags, activity buckets
    Workers,
    /// Retention: cohorts and survival
    Retention,
}

/// An aggregation view over the filtered tables.
///
/// Each view is a pure function of `(FinalWorkers, FinalShifts)`,
/// independent of every other view. The caller guarantees the tables are
/// non-empty (the empty case never reaches a view); a view may still return
/// a zero-row table when its inputs are structurally empty, e.g. a missing
/// optional column or no joinable rows.
pub trait View: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this view.
    ///
    /// Should be snake_case and stable across versions.
    fn name(&self) -> &str;

    /// Human-readable description of what this view measures.
    fn description(&self) -> &str;

    /// View category for grouping.
    fn category(&self) -> ViewCategory;

    /// Columns of the emitted table, in order.
    fn output_columns(&self) -> &[&str];

    /// Compute the view's output table.
    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame>;
}

/// Marker trait for view configuration types.
///
/// All config types should implement Default, Clone, Send, Sync, and Debug.
pub trait ViewConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// A view that supports runtime configuration.
///
/// Extends [`View`] to allow customization of top-N truncation, bucket
/// edges, flag groups, and other parameters.
pub trait ConfigurableView: View {
    /// Configuration type for this view.
    type Config: ViewConfig;

    /// Create a new view with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}

/// Blanket implementation for any type that satisfies the trait bounds.
impl<T: Default + Clone + Send + Sync + std::fmt::Debug> ViewConfig for T {}
