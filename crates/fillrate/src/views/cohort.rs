//! Weekly cohort retention matrix, long format.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{SLOT_COLUMNS, USER_ID, slot_source},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
    views::{week_index, week_start},
};

/// Configuration for the cohort-retention view.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CohortRetentionConfig {
    /// Keep only the N most recent cohorts.
    pub max_cohorts: usize,
    /// Keep only week offsets `0..max_offsets`.
    pub max_offsets: i32,
}

impl Default for CohortRetentionConfig {
    fn default() -> Self {
        Self {
            max_cohorts: 15,
            max_offsets: 12,
        }
    }
}

/// Fraction of each weekly cohort rebooking k weeks after its 1st booking.
///
/// A cohort is the set of workers whose 1st booking falls in the same
/// Monday-anchored calendar week. For each cohort and integer week offset
/// k >= 0, the view emits the fraction of the cohort whose 2nd booking fell
/// exactly k weeks later. Workers with no 2nd booking contribute to no
/// offset, which is what makes retention decay. Output is long-format:
/// one row per (cohort, offset) with at least one return, restricted to
/// the most recent cohorts and the first offsets for display.
#[derive(Debug, Clone, Default)]
pub struct CohortRetention {
    config: CohortRetentionConfig,
}

impl CohortRetention {
    fn empty_output() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new_empty("cohort_week".into(), &DataType::Date),
            Column::new_empty("week_offset".into(), &DataType::Int32),
            Column::new_empty("cohort_size".into(), &DataType::UInt32),
            Column::new_empty("returned".into(), &DataType::UInt32),
            Column::new_empty("retention".into(), &DataType::Float64),
        ])?)
    }
}

impl View for CohortRetention {
    fn name(&self) -> &str {
        "cohort_retention"
    }

    fn description(&self) -> &str {
        "Weekly cohorts - fraction rebooking k weeks after the 1st booking"
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Retention
    }

    fn output_columns(&self) -> &[&str] {
        &[
            "cohort_week",
            "week_offset",
            "cohort_size",
            "returned",
            "retention",
        ]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        let booked_stem = SLOT_COLUMNS[0].stem;
        let first = slot_source(booked_stem, 1);
        let second = slot_source(booked_stem, 2);
        if !has_column(&tables.workers, &first) || !has_column(&tables.workers, &second) {
            tracing::debug!("cohort view needs slot-1 and slot-2 booked timestamps, empty view");
            return Self::empty_output();
        }

        let base = tables
            .workers
            .clone()
            .lazy()
            .filter(col(first.as_str()).is_not_null())
            .select([
                col(USER_ID),
                week_start(col(first.as_str())).alias("cohort_week"),
                (week_index(col(second.as_str())) - week_index(col(first.as_str())))
                    .alias("week_offset"),
            ]);

        let sizes = base
            .clone()
            .group_by([col("cohort_week")])
            .agg([len().alias("cohort_size")]);

        let returned = base
            .filter(
                col("week_offset")
                    .is_not_null()
                    .and(col("week_offset").gt_eq(lit(0)))
                    .and(col("week_offset").lt(lit(self.config.max_offsets))),
            )
            .group_by([col("cohort_week"), col("week_offset")])
            .agg([len().alias("returned")]);

        // Display restriction: most recent cohorts among those with a return.
        let recent = returned
            .clone()
            .group_by([col("cohort_week")])
            .agg(Vec::<Expr>::new())
            .sort(
                ["cohort_week"],
                SortMultipleOptions::default().with_order_descending(true),
            )
            .limit(self.config.max_cohorts as IdxSize);

        let result = returned
            .join(
                recent,
                [col("cohort_week")],
                [col("cohort_week")],
                JoinArgs::new(JoinType::Inner),
            )
            .join(
                sizes,
                [col("cohort_week")],
                [col("cohort_week")],
                JoinArgs::new(JoinType::Inner),
            )
            .with_column(
                (col("returned").cast(DataType::Float64)
                    / col("cohort_size").cast(DataType::Float64))
                .alias("retention"),
            )
            .sort(["cohort_week", "week_offset"], SortMultipleOptions::default())
            .select([
                col("cohort_week"),
                col("week_offset"),
                col("cohort_size"),
                col("returned"),
                col("retention"),
            ])
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for CohortRetention {
    type Config = CohortRetentionConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
