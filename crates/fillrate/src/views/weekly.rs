//! Weekly fill-rate time series.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{JOB_DONE, SHIFT_START_TIME},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
    views::week_start,
};

/// Configuration for the weekly fill-rate view.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct WeeklyFillRateConfig {}

/// Mean completion per calendar week of shift start, chronological.
///
/// Weeks are Monday-anchored; each week is labeled by its Monday. Shifts
/// with no start timestamp contribute to no week.
#[derive(Debug, Clone, Default)]
pub struct WeeklyFillRate {
    config: WeeklyFillRateConfig,
}

impl View for WeeklyFillRate {
    fn name(&self) -> &str {
        "weekly_fill_rate"
    }

    fn description(&self) -> &str {
        "Fill-rate dynamics - mean completion per calendar week of shift start"
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Overview
    }

    fn output_columns(&self) -> &[&str] {
        &["week", "fill_rate", "booked"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        if !has_column(&tables.shifts, SHIFT_START_TIME) {
            return Ok(DataFrame::new(vec![
                Column::new_empty("week".into(), &DataType::Date),
                Column::new_empty("fill_rate".into(), &DataType::Float64),
                Column::new_empty("booked".into(), &DataType::UInt32),
            ])?);
        }

        let result = tables
            .shifts
            .clone()
            .lazy()
            .filter(col(SHIFT_START_TIME).is_not_null())
            .with_column(week_start(col(SHIFT_START_TIME)).alias("week"))
            .group_by([col("week")])
            .agg([
                col(JOB_DONE).mean().alias("fill_rate"),
                len().alias("booked"),
            ])
            .sort(["week"], SortMultipleOptions::default())
            .collect()?;

        Ok(result)
    }
}

impl ConfigurableView for WeeklyFillRate {
    type Config = WeeklyFillRateConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tables() -> FilteredTables {
        let workers = df![
            "user_id" => [0u32],
            "user_avg_fr" => [0.5],
        ]
        .unwrap();
        let shifts = df![
            "user_id" => [0u32, 0u32, 0u32, 0u32],
            "job_done" => [1.0, 0.0, 1.0, 1.0],
            // Two shifts in the week of Jan 1, one in the week of Jan 8,
            // one with no start timestamp.
            "shift_start_time" => [
                Some("2024-01-02 09:00:00"),
                Some("2024-01-05 10:00:00"),
                Some("2024-01-10 09:00:00"),
                None,
            ],
        ]
        .unwrap();
        let shifts = shifts
            .lazy()
            .with_column(
                col(SHIFT_START_TIME)
                    .str()
                    .to_datetime(
                        Some(TimeUnit::Microseconds),
                        None,
                        StrptimeOptions {
                            strict: false,
                            ..Default::default()
                        },
                        lit("raise"),
                    )
                    .alias(SHIFT_START_TIME),
            )
            .collect()
            .unwrap();
        FilteredTables { workers, shifts }
    }

    #[test]
    fn test_weekly_series_chronological() {
        let view = WeeklyFillRate::default();
        let result = view.compute(&tables()).unwrap();

        assert_eq!(result.height(), 2);

        let weeks = result.column("week").unwrap().date().unwrap();
        let mondays: Vec<_> = weeks.as_date_iter().flatten().collect();
        assert_eq!(
            mondays,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            ]
        );

        let rates = result.column("fill_rate").unwrap().f64().unwrap();
        assert!((rates.get(0).unwrap() - 0.5).abs() < 1e-12);
        assert!((rates.get(1).unwrap() - 1.0).abs() < 1e-12);

        // The start-less shift lands in no week.
        let booked = result.column("booked").unwrap().u32().unwrap();
        let total: u32 = booked.into_no_null_iter().sum();
        assert_eq!(total, 3);
    }
}
