//! Survival curve: fraction of workers not yet rebooked by day N.

use polars::prelude::*;

use crate::{
    Result,
    filter::FilteredTables,
    schema::{MIN_RETURN_DAYS, SLOT_COLUMNS, slot_source},
    traits::{ConfigurableView, View, ViewCategory},
    transform::has_column,
};

/// Configuration for the survival-curve view.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SurvivalCurveConfig {
    /// Last day offset emitted (inclusive).
    pub horizon_days: i64,
}

impl Default for SurvivalCurveConfig {
    fn default() -> Self {
        Self { horizon_days: 90 }
    }
}

/// Classic retention curve over `min_return_days`.
///
/// The population is every filtered worker with a 1st booking. For each
/// day offset d, a worker still "survives" when their `min_return_days`
/// is null (never rebooked) or greater than d. The curve is monotonically
/// non-increasing by construction and starts at 1.0 unless someone
/// rebooked on day 0.
#[derive(Debug, Clone, Default)]
pub struct SurvivalCurve {
    config: SurvivalCurveConfig,
}

impl SurvivalCurve {
    fn empty_output() -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new_empty("day".into(), &DataType::Int64),
            Column::new_empty("remaining".into(), &DataType::UInt32),
            Column::new_empty("retention".into(), &DataType::Float64),
        ])?)
    }
}

impl View for SurvivalCurve {
    fn name(&self) -> &str {
        "survival_curve"
    }

    fn description(&self) -> &str {
        "Fraction of workers not yet rebooked by day N after the 1st booking"
    }

    fn category(&self) -> ViewCategory {
        ViewCategory::Retention
    }

    fn output_columns(&self) -> &[&str] {
        &["day", "remaining", "retention"]
    }

    fn compute(&self, tables: &FilteredTables) -> Result<DataFrame> {
        let first = slot_source(SLOT_COLUMNS[0].stem, 1);
        if !has_column(&tables.workers, &first) {
            tracing::debug!("survival curve needs the slot-1 booked timestamp, empty view");
            return Self::empty_output();
        }

        let base = tables
            .workers
            .clone()
            .lazy()
            .filter(col(first.as_str()).is_not_null())
            .select([col(MIN_RETURN_DAYS)])
            .collect()?;

        let total = base.height();
        if total == 0 {
            return Self::empty_output();
        }

        let return_days: Vec<Option<i64>> = base
            .column(MIN_RETURN_DAYS)?
            .i64()?
            .into_iter()
            .collect();

        let mut days = Vec::with_capacity(self.config.horizon_days as usize + 1);
        let mut remaining = Vec::with_capacity(days.capacity());
        let mut retention = Vec::with_capacity(days.capacity());
        for day in 0..=self.config.horizon_days {
            let alive = return_days
                .iter()
                .filter(|value| match value {
                    None => true,
                    Some(returned) => *returned > day,
                })
                .count();
            days.push(day);
            remaining.push(alive as u32);
            retention.push(alive as f64 / total as f64);
        }

        Ok(df![
            "day" => days,
            "remaining" => remaining,
            "retention" => retention,
        ]?)
    }
}

impl ConfigurableView for SurvivalCurve {
    type Config = SurvivalCurveConfig;

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

    fn tables(min_return_days: Vec<Option<i64>>) -> FilteredTables {
        let n = min_return_days.len();
        let booked: Vec<Option<&str>> = (0..n).map(|_| Some("2024-01-01 09:00:00")).collect();
        let workers = df![
            "user_id" => (0..n as u32).collect::<Vec<_>>(),
            "user_avg_fr" => vec![0.5; n],
            "min_return_days" => min_return_days,
        ]
        .unwrap();
        let workers = workers
            .lazy()
            .with_column(
                lit(Series::new("shift_booked_time_1".into(), booked))
                    .str()
                    .to_datetime(
                        Some(TimeUnit::Microseconds),
                        None,
                        StrptimeOptions::default(),
                        lit("raise"),
                    )
                    .alias("shift_booked_time_1"),
            )
            .collect()
            .unwrap();
        let shifts = df![
            "user_id" => (0..n as u32).collect::<Vec<_>>(),
            "job_done" => vec![1.0; n],
        ]
        .unwrap();
        FilteredTables { workers, shifts }
    }

    #[test]
    fn test_curve_starts_at_one_and_decays() {
        // Returns on days 7 and 30; one worker never returns.
        let tables = tables(vec![Some(7), Some(30), None]);
        let result = SurvivalCurve::default().compute(&tables).unwrap();

        assert_eq!(result.height(), 91);
        let retention = result.column("retention").unwrap().f64().unwrap();

        assert!((retention.get(0).unwrap() - 1.0).abs() < 1e-12);
        // Day 7: the first worker has rebooked.
        assert!((retention.get(7).unwrap() - 2.0 / 3.0).abs() < 1e-12);
        // Day 90: only the never-returning worker survives.
        assert!((retention.get(90).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_curve_is_non_increasing() {
        let tables = tables(vec![Some(0), Some(3), Some(3), Some(45), None, None]);
        let result = SurvivalCurve::default().compute(&tables).unwrap();

        let retention = result.column("retention").unwrap().f64().unwrap();
        let values: Vec<f64> = retention.into_no_null_iter().collect();
        for pair in values.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }

        // A same-day return already dents day 0.
        assert!((values[0] - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_first_booking_column_is_empty_view() {
        let workers = df![
            "user_id" => [0u32],
            "user_avg_fr" => [1.0],
            "min_return_days" => [Some(3i64)],
        ]
        .unwrap();
        let shifts = df![
            "user_id" => [0u32],
            "job_done" => [1.0],
        ]
        .unwrap();
        let tables = FilteredTables { workers, shifts };

        let result = SurvivalCurve::default().compute(&tables).unwrap();
        assert_eq!(result.height(), 0);
    }
}
