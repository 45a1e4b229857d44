//! The reshape-and-derive transform.
//!
//! Converts one wide record-per-worker table into (a) a normalized long
//! table with one row per *booked* shift and (b) an enriched worker table
//! carrying derived per-worker metrics. Both tables are derived once per
//! upload and are immutable afterwards; everything downstream (filters,
//! aggregation views) is a transient view over them.
//!
//! A shift slot is real iff its booked timestamp is present. An absent
//! booked timestamp means the worker never had that Nth shift: the slot is
//! excluded from the long table entirely, not treated as a failed shift.
//! A booked shift whose completion flag is missing counts as a failure.

use polars::prelude::*;

use crate::error::{FillRateError, Result};
use crate::schema::{
    CARRY_COLUMNS, ColumnKind, DELTA_1_2, DELTA_1_3, JOB_DONE, MIN_RETURN_DAYS, SHIFT_BOOKED_TIME,
    SHIFT_NUMBER, SHIFT_SLOTS, SLOT_COLUMNS, USER_AVG_FR, USER_ID, column_specs, slot_source,
};

/// The two tables derived once per uploaded file.
///
/// `workers` is the wide input augmented with `user_id` and the derived
/// per-worker metrics; `shifts` is the long table with one row per booked
/// shift. Every `user_id` in `shifts` exists in `workers`.
#[derive(Debug, Clone)]
pub struct DerivedTables {
    /// One row per worker, with derived metrics joined on.
    pub workers: DataFrame,
    /// One row per booked shift, slot-agnostic column names.
    pub shifts: DataFrame,
}

/// Whether `df` contains a column named `name`.
pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Run the full reshape-and-derive transform on one wide input table.
///
/// Fails with [`FillRateError::NoShiftData`] when no slot yields a single
/// booked shift: a dataset with no bookings anywhere is unusable.
pub fn derive_tables(df: DataFrame) -> Result<DerivedTables> {
    let coerced = coerce_columns(df)?;

    // Row position is the join key used throughout one load.
    let workers = coerced
        .lazy()
        .with_row_index(USER_ID, None)
        .collect()?;

    let shifts = reshape_long(&workers)?;
    if shifts.height() == 0 {
        return Err(FillRateError::NoShiftData);
    }

    let workers = join_user_avg_fr(workers, &shifts)?;
    let workers = derive_return_metrics(workers)?;

    tracing::debug!(
        workers = workers.height(),
        shifts = shifts.height(),
        "derived tables"
    );
    Ok(DerivedTables { workers, shifts })
}

/// Apply the typed-column coercion policy uniformly.
///
/// Timestamps parse permissively to datetime (unparseable becomes null),
/// numeric columns cast permissively to f64, and flag/frequency/quantity
/// columns additionally zero-fill nulls. Columns absent from the input are
/// skipped.
fn coerce_columns(df: DataFrame) -> Result<DataFrame> {
    let mut exprs = Vec::new();

    for spec in column_specs() {
        let Ok(column) = df.column(&spec.name) else {
            continue;
        };
        let expr = match spec.kind {
            ColumnKind::Temporal => temporal_expr(&spec.name, column.dtype()),
            ColumnKind::Numeric => col(spec.name.as_str()).cast(DataType::Float64),
            ColumnKind::ZeroFilledNumeric => col(spec.name.as_str())
                .cast(DataType::Float64)
                .fill_null(lit(0.0)),
            ColumnKind::Text => continue,
        };
        exprs.push(expr.alias(spec.name.as_str()));
    }

    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Permissive timestamp parse for one column.
fn temporal_expr(name: &str, dtype: &DataType) -> Expr {
    let target = DataType::Datetime(TimeUnit::Microseconds, None);
    match dtype {
        DataType::String => col(name).str().to_datetime(
            Some(TimeUnit::Microseconds),
            None,
            StrptimeOptions {
                strict: false,
                ..Default::default()
            },
            lit("raise"),
        ),
        _ => col(name).cast(target),
    }
}

/// Un-pivot the shift slots into the long table.
///
/// Each slot projects the carried worker attributes plus its column family
/// under canonical names, keeps only rows with a booked timestamp, and tags
/// them with the slot index. A slot whose booked-timestamp column is absent
/// from the input is skipped entirely. Missing optional slot columns become
/// typed null columns so the per-slot frames share one schema.
fn reshape_long(workers: &DataFrame) -> Result<DataFrame> {
    let booked_stem = SLOT_COLUMNS[0].stem;
    let carry: Vec<&str> = CARRY_COLUMNS
        .iter()
        .copied()
        .filter(|c| has_column(workers, c))
        .collect();

    let mut slot_frames = Vec::new();
    for slot in 1..=SHIFT_SLOTS {
        let booked_src = slot_source(booked_stem, slot);
        if !has_column(workers, &booked_src) {
            tracing::warn!(slot, column = %booked_src, "booked-timestamp column absent, skipping slot");
            continue;
        }

        let mut columns: Vec<Expr> = vec![col(USER_ID)];
        columns.extend(carry.iter().map(|c| col(*c)));
        for slot_col in SLOT_COLUMNS {
            let src = slot_source(slot_col.stem, slot);
            let expr = if has_column(workers, &src) {
                match slot_col.kind {
                    // Text dtypes can differ between slots after inference.
                    ColumnKind::Text => col(src.as_str()).cast(DataType::String),
                    _ => col(src.as_str()),
                }
            } else {
                lit(NULL).cast(slot_col.kind.null_dtype())
            };
            columns.push(expr.alias(slot_col.canonical));
        }
        columns.push(lit(slot as i32).alias(SHIFT_NUMBER));

        slot_frames.push(
            workers
                .clone()
                .lazy()
                .select(columns)
                .filter(col(SHIFT_BOOKED_TIME).is_not_null()),
        );
    }

    if slot_frames.is_empty() {
        return Err(FillRateError::NoShiftData);
    }

    // Booked-but-outcome-unknown counts as a fill-rate failure.
    let long = concat(slot_frames, UnionArgs::default())?
        .with_column(col(JOB_DONE).fill_null(lit(0.0)))
        .collect()?;
    Ok(long)
}

/// Mean completion flag per worker, left-joined onto the worker table.
///
/// Workers with zero booked shifts get `user_avg_fr = 0`.
fn join_user_avg_fr(workers: DataFrame, shifts: &DataFrame) -> Result<DataFrame> {
    let per_user = shifts
        .clone()
        .lazy()
        .group_by([col(USER_ID)])
        .agg([col(JOB_DONE).mean().alias(USER_AVG_FR)]);

    Ok(workers
        .lazy()
        .join(
            per_user,
            [col(USER_ID)],
            [col(USER_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(col(USER_AVG_FR).fill_null(lit(0.0)))
        .collect()?)
}

/// Calendar-day gaps from the slot-1 booking, and their null-safe minimum.
///
/// Computed on the original wide booked timestamps, not the long table.
/// Negative gaps (a later slot booked before slot 1) pass through unclamped.
fn derive_return_metrics(workers: DataFrame) -> Result<DataFrame> {
    let booked_stem = SLOT_COLUMNS[0].stem;
    let first = slot_source(booked_stem, 1);
    let have_first = has_column(&workers, &first);

    let delta = |slot: usize, name: &'static str| -> Expr {
        let later = slot_source(booked_stem, slot);
        if have_first && has_column(&workers, &later) {
            (col(later.as_str()) - col(first.as_str()))
                .dt()
                .total_days()
                .alias(name)
        } else {
            lit(NULL).cast(DataType::Int64).alias(name)
        }
    };
    let deltas = [delta(2, DELTA_1_2), delta(3, DELTA_1_3)];

    Ok(workers
        .lazy()
        .with_columns(deltas)
        .with_column(min_horizontal([col(DELTA_1_2), col(DELTA_1_3)])?.alias(MIN_RETURN_DAYS))
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DURATION, SHIFT_REGION, TASK_GROUP};

    /// Two workers from the worked examples:
    /// A books slot 1 (done) and slot 2 (failed); B books only slot 1 with
    /// an unknown outcome.
    fn example_wide() -> DataFrame {
        df![
            "region" => ["North", "South"],
            "platform" => ["ios", "android"],
            "shift_booked_time_1" => ["2024-01-01 09:00:00", "2024-01-05 12:00:00"],
            "shift_start_time_1" => ["2024-01-02 09:00:00", "2024-01-06 12:00:00"],
            "job_done_1" => [Some(1i64), None],
            "shift_duration_1" => [Some(4.0), Some(8.0)],
            "shift_price_per_hour_1" => [Some(300.0), Some(450.0)],
            "task_type_1" => ["picker", "courier"],
            "task_group_1" => ["warehouse", "delivery"],
            "shift_region_1" => ["North", "South"],
            "shift_booked_time_2" => [Some("2024-01-08 09:00:00"), None],
            "shift_start_time_2" => [Some("2024-01-09 09:00:00"), None],
            "job_done_2" => [Some(0i64), None],
            "shift_duration_2" => [Some(6.0), None],
            "shift_price_per_hour_2" => [Some(350.0), None],
            "task_type_2" => [Some("picker"), None],
            "task_group_2" => [Some("warehouse"), None],
            "shift_region_2" => [Some("North"), None],
            "opened_push_flg" => [Some(1i64), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_shift_rows_match_booked_slots() {
        let tables = derive_tables(example_wide()).unwrap();

        // Worker 0 booked two slots, worker 1 booked one; slot 3 is absent.
        assert_eq!(tables.shifts.height(), 3);
        let ids = tables.shifts.column(USER_ID).unwrap().u32().unwrap();
        let count_for = |id: u32| ids.into_iter().filter(|v| *v == Some(id)).count();
        assert_eq!(count_for(0), 2);
        assert_eq!(count_for(1), 1);
    }

    #[test]
    fn test_job_done_never_null_after_reshape() {
        let tables = derive_tables(example_wide()).unwrap();
        let done = tables.shifts.column(JOB_DONE).unwrap().f64().unwrap();

        assert_eq!(done.null_count(), 0);
        for value in done.into_no_null_iter() {
            assert!(value == 0.0 || value == 1.0);
        }
    }

    #[test]
    fn test_user_avg_fr_and_return_metrics() {
        let tables = derive_tables(example_wide()).unwrap();
        let workers = &tables.workers;

        let fr = workers.column(USER_AVG_FR).unwrap().f64().unwrap();
        // Worker A: (1 + 0) / 2; worker B: unknown outcome coerced to 0.
        assert!((fr.get(0).unwrap() - 0.5).abs() < 1e-12);
        assert!((fr.get(1).unwrap() - 0.0).abs() < 1e-12);

        let d12 = workers.column(DELTA_1_2).unwrap().i64().unwrap();
        assert_eq!(d12.get(0), Some(7));
        assert_eq!(d12.get(1), None);

        let min_return = workers.column(MIN_RETURN_DAYS).unwrap().i64().unwrap();
        assert_eq!(min_return.get(0), Some(7));
        assert_eq!(min_return.get(1), None);
    }

    #[test]
    fn test_zero_filled_flag_coercion() {
        let tables = derive_tables(example_wide()).unwrap();
        let flag = tables
            .workers
            .column("opened_push_flg")
            .unwrap()
            .f64()
            .unwrap();

        assert_eq!(flag.get(0), Some(1.0));
        assert_eq!(flag.get(1), Some(0.0));
    }

    #[test]
    fn test_missing_slot_columns_become_typed_nulls() {
        // Slot 2 has a booking but no duration/task columns at all.
        let df = df![
            "shift_booked_time_1" => ["2024-01-01 09:00:00"],
            "job_done_1" => [1i64],
            "shift_duration_1" => [4.0],
            "task_group_1" => ["warehouse"],
            "shift_region_1" => ["North"],
            "shift_booked_time_2" => ["2024-01-08 09:00:00"],
        ]
        .unwrap();

        let tables = derive_tables(df).unwrap();
        assert_eq!(tables.shifts.height(), 2);

        let duration = tables.shifts.column(DURATION).unwrap().f64().unwrap();
        assert_eq!(duration.get(0), Some(4.0));
        assert_eq!(duration.get(1), None);

        let group = tables.shifts.column(TASK_GROUP).unwrap().str().unwrap();
        assert_eq!(group.get(1), None);
        let region = tables.shifts.column(SHIFT_REGION).unwrap().str().unwrap();
        assert_eq!(region.get(0), Some("North"));
    }

    #[test]
    fn test_unparseable_timestamp_becomes_null_row_dropped() {
        let df = df![
            "shift_booked_time_1" => ["2024-01-01 09:00:00", "not a date"],
            "job_done_1" => [1i64, 1i64],
        ]
        .unwrap();

        let tables = derive_tables(df).unwrap();
        // The unparseable booking coerces to null and the slot row is dropped.
        assert_eq!(tables.shifts.height(), 1);

        let fr = tables.workers.column(USER_AVG_FR).unwrap().f64().unwrap();
        assert_eq!(fr.get(1), Some(0.0));
    }

    #[test]
    fn test_no_bookings_anywhere_is_no_shift_data() {
        let df = df![
            "region" => ["North"],
            "job_done_1" => [1i64],
        ]
        .unwrap();
        assert!(matches!(
            derive_tables(df),
            Err(FillRateError::NoShiftData)
        ));

        let df = df![
            "shift_booked_time_1" => [None::<&str>],
            "job_done_1" => [1i64],
        ]
        .unwrap();
        assert!(matches!(
            derive_tables(df),
            Err(FillRateError::NoShiftData)
        ));
    }
}
