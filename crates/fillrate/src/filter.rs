//! Composable predicate filters and the worker/shift consistency protocol.
//!
//! Each filter is a predicate over one column; filters compose by logical
//! AND. Worker-level and shift-level filters are applied independently, then
//! the two tables are synchronized so that a worker appears in the final
//! worker view iff at least one of its shifts survives the shift-level
//! filters. A filter over a column absent from the loaded data is a no-op,
//! never an error.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::Result;
use crate::schema::USER_ID;
use crate::transform::{DerivedTables, has_column};

/// The predicate kinds a filter can apply to one column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Membership in an allowed set of categorical values.
    AnyOf(Vec<String>),
    /// Membership in an allowed set of numeric values (flag columns).
    AnyOfNumeric(Vec<f64>),
    /// Inclusive numeric range.
    Between {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Inclusive calendar-date range over a timestamp column.
    DateBetween {
        /// First date kept.
        start: NaiveDate,
        /// Last date kept.
        end: NaiveDate,
    },
}

/// One predicate over one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column the predicate applies to.
    pub column: String,
    /// Predicate kind and parameters.
    pub kind: FilterKind,
}

impl Filter {
    /// Keep rows whose `column` value is in `values`.
    pub fn any_of(column: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            column: column.into(),
            kind: FilterKind::AnyOf(values),
        }
    }

    /// Keep rows whose numeric `column` value is in `values`.
    pub fn any_of_numeric(column: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            column: column.into(),
            kind: FilterKind::AnyOfNumeric(values),
        }
    }

    /// Keep rows with `min <= column <= max`.
    pub fn between(column: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            column: column.into(),
            kind: FilterKind::Between { min, max },
        }
    }

    /// Keep rows whose timestamp `column` falls on `start..=end`.
    pub fn date_between(column: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            column: column.into(),
            kind: FilterKind::DateBetween { start, end },
        }
    }

    /// Lower the filter to a polars predicate expression.
    fn predicate(&self) -> Expr {
        let column = col(self.column.as_str());
        match &self.kind {
            FilterKind::AnyOf(values) => {
                let allowed = Series::new("allowed".into(), values.clone());
                column.cast(DataType::String).is_in(lit(allowed))
            }
            FilterKind::AnyOfNumeric(values) => {
                let allowed = Series::new("allowed".into(), values.clone());
                column.cast(DataType::Float64).is_in(lit(allowed))
            }
            FilterKind::Between { min, max } => column
                .clone()
                .gt_eq(lit(*min))
                .and(column.lt_eq(lit(*max))),
            FilterKind::DateBetween { start, end } => {
                let date = column.dt().date();
                date.clone().gt_eq(lit(*start)).and(date.lt_eq(lit(*end)))
            }
        }
    }
}

/// The mutually consistent filtered sub-views of the derived tables.
///
/// Invariant: the `user_id` sets of `workers` and `shifts` are equal, and
/// both tables are non-empty.
#[derive(Debug, Clone)]
pub struct FilteredTables {
    /// Workers surviving both filter stages.
    pub workers: DataFrame,
    /// Shifts of surviving workers that pass the shift-level filters.
    pub shifts: DataFrame,
}

impl FilteredTables {
    /// Whether the worker and shift tables reference the same id set.
    pub fn is_consistent(&self) -> Result<bool> {
        let worker_ids = sorted_ids(&self.workers)?;
        let shift_ids = sorted_ids(&self.shifts)?;
        Ok(worker_ids == shift_ids)
    }
}

/// Worker-level and shift-level filters, applied together.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    /// Filters over the worker table (demographics, behavior, counters).
    pub workers: Vec<Filter>,
    /// Filters over the shift table (start date, shift region, task group).
    pub shifts: Vec<Filter>,
}

impl FilterSet {
    /// Apply all filters and synchronize the two tables.
    ///
    /// Returns `None` when either table ends up empty: the explicit
    /// empty-result state. Downstream views must not run on it.
    pub fn apply(&self, tables: &DerivedTables) -> Result<Option<FilteredTables>> {
        let workers = apply_filters(&tables.workers, &self.workers)?;
        if workers.height() == 0 {
            return Ok(None);
        }

        let (workers, shifts) = synchronize(workers, &tables.shifts, &self.shifts)?;
        if workers.height() == 0 || shifts.height() == 0 {
            return Ok(None);
        }

        let filtered = FilteredTables { workers, shifts };
        debug_assert!(filtered.is_consistent()?);
        Ok(Some(filtered))
    }
}

/// AND-fold `filters` over `df`, skipping filters on absent columns.
fn apply_filters(df: &DataFrame, filters: &[Filter]) -> Result<DataFrame> {
    let mut lf = df.clone().lazy();
    for filter in filters {
        if !has_column(df, &filter.column) {
            tracing::debug!(column = %filter.column, "filter column absent, skipping");
            continue;
        }
        lf = lf.filter(filter.predicate());
    }
    Ok(lf.collect()?)
}

/// The two-stage consistency fix-point.
///
/// 1. Restrict shifts to workers that passed the worker-level filters.
/// 2. Apply the shift-level filters.
/// 3. Restrict the workers again to ids still present among the shifts,
///    so a worker whose remaining shifts were all excluded disappears.
///
/// Post-condition: the returned tables reference identical id sets.
fn synchronize(
    workers: DataFrame,
    shifts: &DataFrame,
    shift_filters: &[Filter],
) -> Result<(DataFrame, DataFrame)> {
    let kept = id_series(&workers)?;
    let shifts = shifts
        .clone()
        .lazy()
        .filter(col(USER_ID).is_in(lit(kept)))
        .collect()?;
    let shifts = apply_filters(&shifts, shift_filters)?;

    let surviving = id_series(&shifts)?;
    let workers = workers
        .lazy()
        .filter(col(USER_ID).is_in(lit(surviving)))
        .collect()?;

    Ok((workers, shifts))
}

fn id_series(df: &DataFrame) -> Result<Series> {
    Ok(df.column(USER_ID)?.as_materialized_series().unique()?)
}

fn sorted_ids(df: &DataFrame) -> Result<Vec<u32>> {
    let mut ids: Vec<u32> = df
        .column(USER_ID)?
        .u32()?
        .into_no_null_iter()
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}
