//! Aggregation views over the filtered tables.
//!
//! Each view is an independent, pure recipe: group, aggregate, and emit a
//! small structured table. One file per view, mirroring the glossary:
//! overall fill rate, fill rate by dimension, weekly dynamics, duration
//! buckets, the experience effect, flag impact, generic metric buckets,
//! cohort retention, and the survival curve.

pub mod buckets;
pub mod cohort;
pub mod dimension;
pub mod duration;
pub mod experience;
pub mod flags;
pub mod overall;
pub mod survival;
pub mod weekly;

pub use buckets::{MetricBuckets, MetricBucketsConfig};
pub use cohort::{CohortRetention, CohortRetentionConfig};
pub use dimension::{FillRateByDimension, FillRateByDimensionConfig};
pub use duration::{DurationFillRate, DurationFillRateConfig};
pub use experience::{ExperienceEffect, ExperienceEffectConfig};
pub use flags::{FlagImpact, FlagImpactConfig};
pub use overall::{OverallFillRate, OverallFillRateConfig};
pub use survival::{SurvivalCurve, SurvivalCurveConfig};
pub use weekly::{WeeklyFillRate, WeeklyFillRateConfig};

use polars::prelude::*;

/// Monday-anchored week number of a datetime expression.
///
/// A Date's physical representation is days since 1970-01-01, a Thursday,
/// so shifting by 3 days aligns the 7-day floor division on Mondays.
pub(crate) fn week_index(expr: Expr) -> Expr {
    (expr.dt().date().cast(DataType::Int32) + lit(3)).floor_div(lit(7))
}

/// Monday of the calendar week containing a datetime expression, as a Date.
pub(crate) fn week_start(expr: Expr) -> Expr {
    (week_index(expr) * lit(7) - lit(3)).cast(DataType::Date)
}
