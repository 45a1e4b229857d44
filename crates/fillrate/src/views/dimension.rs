//! Fill rate grouped by one shift dimension, ranked.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{JOB_DONE, SHIFT_NUMBER, SHIFT_REGION, TASK_GROUP, TASK_TYPE},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
};

/// Configuration for a by-dimension fill-rate view.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FillRateByDimensionConfig {
    /// Shift-table column to group by.
    pub dimension: String,
    /// Keep only the N groups with the most booked shifts (None keeps all).
    pub top_n: Option<usize>,
}

impl Default for FillRateByDimensionConfig {
    fn default() -> Self {
        Self {
            dimension: SHIFT_REGION.to_string(),
            top_n: Some(15),
        }
    }
}

/// Fill rate per group of one shift dimension.
///
/// Groups the shift table by the configured dimension, computes the mean
/// completion flag plus booked and done counts per group, optionally
/// truncates to the top-N groups by booked count, and sorts by fill rate
/// descending. Null group values are dropped. The group value is emitted
/// under the uniform column name `group`, as a string.
///
/// Returns an empty table when the dimension column is absent from the
/// loaded data.
#[derive(Debug, Clone)]
pub struct FillRateByDimension {
    name: String,
    description: String,
    config: FillRateByDimensionConfig,
}

impl Default for FillRateByDimension {
    fn default() -> Self {
        Self::with_config(FillRateByDimensionConfig::default())
    }
}

impl FillRateByDimension {
    /// Fill rate by slot index (1st vs 2nd vs 3rd shift), untruncated.
    pub fn shift_number() -> Self {
        Self::with_config(FillRateByDimensionConfig {
            dimension: SHIFT_NUMBER.to_string(),
            top_n: None,
        })
    }

    /// Fill rate by shift region, top 15 by booked count.
    pub fn shift_region() -> Self {
        Self::default()
    }

    /// Fill rate by task group, top 15 by booked count.
    pub fn task_group() -> Self {
        Self::with_config(FillRateByDimensionConfig {
            dimension: TASK_GROUP.to_string(),
            top_n: Some(15),
        })
    }

    /// Fill rate by task type, top 15 by booked count.
    pub fn task_type() -> Self {
        Self::with_config(FillRateByDimensionConfig {
            dimension: TASK_TYPE.to_string(),
            top_n: Some(15),
        })
    }

    fn empty_output() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new_empty("group".into(), &DataType::String),
            Column::new_empty("fill_rate".into(), &DataType::Float64),
            Column::new_empty("booked".into(), &DataType::UInt32),
            Column::new_empty("done".into(), &DataType::Float64),
        ])?)
    }
}

impl View for FillRateByDimension {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> ViewCategory {
        match self.config.dimension.as_str() {
            TASK_GROUP | TASK_TYPE => ViewCategory::Shifts,
            _ => ViewCategory::Overview,
        }
    }

    fn output_columns(&self) -> &[&str] {
        &["group", "fill_rate", "booked", "done"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        let dimension = self.config.dimension.as_str();
        if !has_column(&tables.shifts, dimension) {
            tracing::debug!(column = dimension, "dimension column absent, empty view");
            return Self::empty_output();
        }

        let mut grouped = tables
            .shifts
            .clone()
            .lazy()
            .filter(col(dimension).is_not_null())
            .group_by([col(dimension)])
            .agg([
                col(JOB_DONE).mean().alias("fill_rate"),
                len().alias("booked"),
                col(JOB_DONE).sum().alias("done"),
            ]);

        if let Some(n) = self.config.top_n {
            grouped = grouped
                .sort(
                    ["booked"],
                    SortMultipleOptions::default().with_order_descending(true),
                )
                .limit(n as IdxSize);
        }

        let result = grouped
            .sort(
                ["fill_rate"],
                SortMultipleOptions::default().with_order_descending(true),
            )
            .select([
                col(dimension).cast(DataType::String).alias("group"),
                col("fill_rate"),
                col("booked"),
                col("done"),
            ])
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for FillRateByDimension {
    type Config = FillRateByDimensionConfig;

    fn with_config(config: Self::Config) -> Self {
        Self {
            name: format!("fill_rate_by_{}", config.dimension),
            description: format!(
                "Fill rate, booked and done counts per {} group",
                config.dimension
            ),
            config,
        }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> FilteredTables {
        let workers = df![
            "user_id" => [0u32, 1u32, 2u32],
            "user_avg_fr" => [1.0, 0.5, 0.0],
        ]
        .unwrap();
        let shifts = df![
            "user_id" => [0u32, 0u32, 1u32, 1u32, 2u32],
            "shift_number" => [1i32, 2, 1, 2, 1],
            "job_done" => [1.0, 1.0, 1.0, 0.0, 0.0],
            "shift_region" => [Some("North"), Some("North"), Some("South"), Some("South"), None],
        ]
        .unwrap();
        FilteredTables { workers, shifts }
    }

    #[test]
    fn test_group_means_and_null_groups_dropped() {
        let view = FillRateByDimension::shift_region();
        let result = view.compute(&tables()).unwrap();

        // The null-region shift contributes to no group.
        assert_eq!(result.height(), 2);

        let groups = result.column("group").unwrap().str().unwrap();
        let rates = result.column("fill_rate").unwrap().f64().unwrap();
        // Sorted by fill rate descending: North 1.0, South 0.5.
        assert_eq!(groups.get(0), Some("North"));
        assert!((rates.get(0).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(groups.get(1), Some("South"));
        assert!((rates.get(1).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_top_n_truncates_by_booked_count() {
        let view = FillRateByDimension::with_config(FillRateByDimensionConfig {
            dimension: SHIFT_REGION.to_string(),
            top_n: Some(1),
        });
        let result = view.compute(&tables()).unwrap();

        // Ties on booked count keep exactly one group.
        assert_eq!(result.height(), 1);
    }

    #[test]
    fn test_by_shift_number_groups_slots() {
        let view = FillRateByDimension::shift_number();
        let result = view.compute(&tables()).unwrap();

        assert_eq!(result.height(), 2);
        let booked = result.column("booked").unwrap().u32().unwrap();
        let total: u32 = booked.into_no_null_iter().sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_absent_dimension_is_empty_view() {
        let view = FillRateByDimension::task_group();
        let result = view.compute(&tables()).unwrap();

        assert_eq!(result.height(), 0);
        let names: Vec<&str> = result.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["group", "fill_rate", "booked", "done"]);
    }

    #[test]
    fn test_metadata_names_follow_dimension() {
        assert_eq!(
            FillRateByDimension::shift_number().name(),
            "fill_rate_by_shift_number"
        );
        assert_eq!(
            FillRateByDimension::task_type().category(),
            ViewCategory::Shifts
        );
        assert_eq!(
            FillRateByDimension::shift_region().category(),
            ViewCategory::Overview
        );
    }
}
