//! Overall fill rate across every surviving shift.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::JOB_DONE,
    traits::{ConfigurableView, View, ViewCategory},
};

/// Configuration for the overall fill-rate view.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct OverallFillRateConfig {}

/// Headline platform-health metrics.
///
/// Emits one row: booked-shift count, completed-shift count, and their
/// ratio (the overall fill rate).
#[derive(Debug, Clone, Default)]
pub struct OverallFillRate {
    config: OverallFillRateConfig,
}

impl View for OverallFillRate {
    fn name(&self) -> &str {
        "overall_fill_rate"
    }

    fn description(&self) -> &str {
        "Overall fill rate - completed shifts over booked shifts"
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Overview
    }

    fn output_columns(&self) -> &[&str] {
        &["booked", "done", "fill_rate"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        let result = tables
            .shifts
            .clone()
            .lazy()
            .select([
                len().alias("booked"),
                col(JOB_DONE).sum().alias("done"),
                col(JOB_DONE).mean().alias("fill_rate"),
            ])
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for OverallFillRate {
    type Config = OverallFillRateConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
