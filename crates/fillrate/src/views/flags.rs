//! Impact of binary worker flags on the mean worker fill rate.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{MARKETING_FLAGS, PROFILE_FLAGS, USER_AVG_FR},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
};

/// Configuration for a flag-impact view: `(column, display label)` pairs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FlagImpactConfig {
    /// Flag columns with display labels.
    pub flags: Vec<(String, String)>,
}

impl Default for FlagImpactConfig {
    fn default() -> Self {
        Self {
            flags: labeled(MARKETING_FLAGS),
        }
    }
}

fn labeled(flags: &[(&str, &str)]) -> Vec<(String, String)> {
    flags
        .iter()
        .map(|(column, label)| ((*column).to_string(), (*label).to_string()))
        .collect()
}

/// Mean worker fill rate per (flag, flag value).
///
/// For every named binary worker flag, emits one row per observed flag
/// value with the mean `user_avg_fr` and worker count. Rows with a null
/// flag value are dropped; flags absent from the loaded data are skipped.
#[derive(Debug, Clone)]
pub struct FlagImpact {
    name: String,
    description: String,
    config: FlagImpactConfig,
}

impl Default for FlagImpact {
    fn default() -> Self {
        Self::marketing()
    }
}

impl FlagImpact {
    /// Marketing-touch flags (ad clicks, pushes, stories, call centre).
    pub fn marketing() -> Self {
        Self::named(
            "marketing_flag_impact",
            "Mean worker fill rate per marketing-touch flag",
            labeled(MARKETING_FLAGS),
        )
    }

    /// Worker-profile flags (verification, CVs, applications).
    pub fn profile() -> Self {
        Self::named(
            "profile_flag_impact",
            "Mean worker fill rate per profile flag",
            labeled(PROFILE_FLAGS),
        )
    }

    fn named(name: &str, description: &str, flags: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            config: FlagImpactConfig { flags },
        }
    }

    fn empty_output() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new_empty("flag".into(), &DataType::String),
            Column::new_empty("value".into(), &DataType::Float64),
            Column::new_empty("fill_rate".into(), &DataType::Float64),
            Column::new_empty("workers".into(), &DataType::UInt32),
        ])?)
    }
}

impl View for FlagImpact {
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
        &["flag", "value", "fill_rate", "workers"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        let mut parts = Vec::new();

        for (column, label) in &self.config.flags {
            if !has_column(&tables.workers, column) {
                tracing::debug!(column = column.as_str(), "flag column absent, skipping");
                continue;
            }
            parts.push(
                tables
                    .workers
                    .clone()
                    .lazy()
                    .filter(col(column.as_str()).is_not_null())
                    .group_by([col(column.as_str())])
                    .agg([
                        col(USER_AVG_FR).mean().alias("fill_rate"),
                        len().alias("workers"),
                    ])
                    .select([
                        lit(label.clone()).alias("flag"),
                        col(column.as_str()).cast(DataType::Float64).alias("value"),
                        col("fill_rate"),
                        col("workers"),
                    ]),
            );
        }

        if parts.is_empty() {
            return Self::empty_output();
        }

        let result = concat(parts, UnionArgs::default())?
            .sort(["flag", "value"], SortMultipleOptions::default())
            .collect()?;
        Ok(result)
    }
}

impl ConfigurableView for FlagImpact {
    type Config = FlagImpactConfig;

    fn with_config(config: Self::Config) -> Self {
        Self::named(
            "flag_impact",
            "Mean worker fill rate per flag",
            config.flags,
        )
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
