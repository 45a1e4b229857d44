//! Generic numeric bucketer over a worker metric.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{QUANTITY_RESPONSES, USER_AVG_FR},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
};

/// Bucket label for `column` given half-open edges `[e_i, e_{i+1})`.
///
/// Values outside every bucket (including nulls) map to null.
pub(crate) fn bucket_label(column: &str, edges: &[f64], labels: &[String]) -> Expr {
    let mut acc = lit(NULL).cast(DataType::String);
    for (i, label) in labels.iter().enumerate().rev() {
        let value = col(column);
        let cond = value
            .clone()
            .gt_eq(lit(edges[i]))
            .and(value.lt(lit(edges[i + 1])));
        acc = when(cond).then(lit(label.as_str())).otherwise(acc);
    }
    acc
}

/// Ordinal of the bucket `column` falls into, for stable output ordering.
pub(crate) fn bucket_index(column: &str, edges: &[f64]) -> Expr {
    let mut acc = lit(NULL).cast(DataType::Int32);
    for i in (0..edges.len() - 1).rev() {
        let value = col(column);
        let cond = value
            .clone()
            .gt_eq(lit(edges[i]))
            .and(value.lt(lit(edges[i + 1])));
        acc = when(cond).then(lit(i as i32)).otherwise(acc);
    }
    acc
}

/// Configuration for a metric-bucket view.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricBucketsConfig {
    /// Worker-table column to bucket.
    pub column: String,
    /// Bucket edges; bucket i covers `[edges[i], edges[i+1])`.
    pub edges: Vec<f64>,
    /// One label per bucket; `edges.len() == labels.len() + 1`.
    pub labels: Vec<String>,
}

impl Default for MetricBucketsConfig {
    fn default() -> Self {
        Self {
            column: QUANTITY_RESPONSES.to_string(),
            edges: vec![f64::NEG_INFINITY, 1.0, 5.0, 10.0, 20.0, 50.0, f64::INFINITY],
            labels: ["0", "1-4", "5-9", "10-19", "20-49", "50+"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Mean worker fill rate per bucket of one numeric worker metric.
///
/// Bins the configured column into half-open buckets, then emits the mean
/// `user_avg_fr` and worker count per bucket, in edge order. Returns an
/// empty table when the column is absent from the loaded data.
#[derive(Debug, Clone)]
pub struct MetricBuckets {
    name: String,
    description: String,
    config: MetricBucketsConfig,
}

impl Default for MetricBuckets {
    fn default() -> Self {
        Self::with_config(MetricBucketsConfig::default())
    }
}

impl MetricBuckets {
    fn activity(column: &str, edges: Vec<f64>, labels: &[&str]) -> Self {
        Self::with_config(MetricBucketsConfig {
            column: column.to_string(),
            edges,
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        })
    }

    /// Search-result view frequency buckets.
    pub fn serp_frequency() -> Self {
        Self::activity(
            "serp_frequency",
            vec![f64::NEG_INFINITY, 1.0, 5.0, 10.0, 20.0, f64::INFINITY],
            &["0", "1-4", "5-9", "10-19", "20+"],
        )
    }

    /// Item view frequency buckets.
    pub fn item_view_frequency() -> Self {
        Self::activity(
            "item_view_frequency",
            vec![f64::NEG_INFINITY, 1.0, 5.0, 10.0, 20.0, f64::INFINITY],
            &["0", "1-4", "5-9", "10-19", "20+"],
        )
    }

    /// Vacancy response count buckets.
    pub fn quantity_responses() -> Self {
        Self::default()
    }

    fn empty_output() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new_empty("bucket".into(), &DataType::String),
            Column::new_empty("fill_rate".into(), &DataType::Float64),
            Column::new_empty("workers".into(), &DataType::UInt32),
        ])?)
    }
}

impl View for MetricBuckets {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Workers
    }

    fn output_columns(&self) -> &[&str] {
        &["bucket", "fill_rate", "workers"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        let column = self.config.column.as_str();
        if !has_column(&tables.workers, column) {
            tracing::debug!(column, "bucket column absent, empty view");
            return Self::empty_output();
        }

        let result = tables
            .workers
            .clone()
            .lazy()
            .with_columns([
                bucket_index(column, &self.config.edges).alias("bucket_idx"),
                bucket_label(column, &self.config.edges, &self.config.labels).alias("bucket"),
            ])
            .filter(col("bucket").is_not_null())
            .group_by([col("bucket_idx"), col("bucket")])
            .agg([
                col(USER_AVG_FR).mean().alias("fill_rate"),
                len().alias("workers"),
            ])
            .sort(["bucket_idx"], SortMultipleOptions::default())
            .select([col("bucket"), col("fill_rate"), col("workers")])
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for MetricBuckets {
    type Config = MetricBucketsConfig;

    fn with_config(config: Self::Config) -> Self {
        Self {
            name: format!("{}_buckets", config.column),
            description: format!("Mean worker fill rate per {} bucket", config.column),
            config,
        }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
