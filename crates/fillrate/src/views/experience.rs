//! Experience effect: outcome of the first shift vs. the second.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{JOB_DONE, SHIFT_NUMBER, USER_ID},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
};

/// Configuration for the experience-effect view.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ExperienceEffectConfig {}

/// Second-shift fill rate conditioned on the first-shift outcome.
///
/// Inner-joins each worker's slot-1 and slot-2 completion flags, then
/// groups by the slot-1 outcome. Returns a zero-row table when no worker
/// has both a slot-1 and a slot-2 shift surviving the filters.
#[derive(Debug, Clone, Default)]
pub struct ExperienceEffect {
    config: ExperienceEffectConfig,
}

impl View for ExperienceEffect {
    fn name(&self) -> &str {
        "experience_effect"
    }

    fn description(&self) -> &str {
        "Second-shift fill rate grouped by first-shift outcome"
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Workers
    }

    fn output_columns(&self) -> &[&str] {
        &["first_outcome", "fill_rate", "workers"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        if !has_column(&tables.shifts, SHIFT_NUMBER) {
            return Ok(DataFrame::new(vec![
                Column::new_empty("first_outcome".into(), &DataType::Float64),
                Column::new_empty("fill_rate".into(), &DataType::Float64),
                Column::new_empty("workers".into(), &DataType::UInt32),
            ])?);
        }

        let slot = |number: i32, outcome: &str| {
            tables
                .shifts
                .clone()
                .lazy()
                .filter(col(SHIFT_NUMBER).eq(lit(number)))
                .select([col(USER_ID), col(JOB_DONE).alias(outcome)])
        };

        let result = slot(1, "first_outcome")
            .join(
                slot(2, "second_outcome"),
                [col(USER_ID)],
                [col(USER_ID)],
                JoinArgs::new(JoinType::Inner),
            )
            .group_by([col("first_outcome")])
            .agg([
                col("second_outcome").mean().alias("fill_rate"),
                len().alias("workers"),
            ])
            .sort(["first_outcome"], SortMultipleOptions::default())
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for ExperienceEffect {
    type Config = ExperienceEffectConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
