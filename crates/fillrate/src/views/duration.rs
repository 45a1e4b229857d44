//! Fill rate by shift duration bucket.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{DURATION, JOB_DONE},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
    views::buckets::{bucket_index, bucket_label},
};

/// Configuration for the duration fill-rate view.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DurationFillRateConfig {
    /// Bucket edges in hours; bucket i covers `[edges[i], edges[i+1])`.
    pub edges: Vec<f64>,
    /// One label per bucket.
    pub labels: Vec<String>,
}

impl Default for DurationFillRateConfig {
    fn default() -> Self {
        Self {
            edges: vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 24.0],
            labels: ["0-2h", "2-4h", "4-6h", "6-8h", "8-10h", "10-12h", "12+h"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Mean completion per shift-duration bucket.
///
/// Shifts with a null duration, or a duration outside the edges, fall in
/// no bucket and are dropped.
#[derive(Debug, Clone, Default)]
pub struct DurationFillRate {
    config: DurationFillRateConfig,
}

impl View for DurationFillRate {
    fn name(&self) -> &str {
        "duration_fill_rate"
    }

    fn description(&self) -> &str {
        "Fill rate per shift-duration bucket (hours)"
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Shifts
    }

    fn output_columns(&self) -> &[&str] {
        &["bucket", "fill_rate", "booked"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        if !has_column(&tables.shifts, DURATION) {
            return Ok(DataFrame::new(vec![
                Column::new_empty("bucket".into(), &DataType::String),
                Column::new_empty("fill_rate".into(), &DataType::Float64),
                Column::new_empty("booked".into(), &DataType::UInt32),
            ])?);
        }

        let result = tables
            .shifts
            .clone()
            .lazy()
            .with_columns([
                bucket_index(DURATION, &self.config.edges).alias("bucket_idx"),
                bucket_label(DURATION, &self.config.edges, &self.config.labels).alias("bucket"),
            ])
            .filter(col("bucket").is_not_null())
            .group_by([col("bucket_idx"), col("bucket")])
            .agg([
                col(JOB_DONE).mean().alias("fill_rate"),
                len().alias("booked"),
            ])
            .sort(["bucket_idx"], SortMultipleOptions::default())
            .select([col("bucket"), col("fill_rate"), col("booked")])
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for DurationFillRate {
    type Config = DurationFillRateConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
