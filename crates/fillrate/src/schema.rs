//! Declarative schema for the wide worker export.
//!
//! The input is one fixed, known wide-format table: shared worker attributes
//! plus up to [`SHIFT_SLOTS`] shift slots inlined as numbered column families
//! (`shift_booked_time_1`, `job_done_2`, ...). Everything downstream is driven
//! by the tables in this module: the coercion pass, the wide-to-long reshape,
//! and the flag-impact views. Adding a fourth slot is a one-constant change.

use polars::prelude::*;

/// Number of shift slots inlined in the wide input.
pub const SHIFT_SLOTS: usize = 3;

/// Join key assigned at load time (row position within one load).
pub const USER_ID: &str = "user_id";

/// Slot index column added to the long shift table.
pub const SHIFT_NUMBER: &str = "shift_number";

/// Canonical (slot-agnostic) name of the booked timestamp.
pub const SHIFT_BOOKED_TIME: &str = "shift_booked_time";

/// Canonical name of the shift start timestamp.
pub const SHIFT_START_TIME: &str = "shift_start_time";

/// Canonical name of the completion flag.
pub const JOB_DONE: &str = "job_done";

/// Canonical name of the shift duration in hours.
pub const DURATION: &str = "duration";

/// Canonical name of the hourly price.
pub const PRICE_PER_HOUR: &str = "price_per_hour";

/// Canonical name of the task type.
pub const TASK_TYPE: &str = "task_type";

/// Canonical name of the task group.
pub const TASK_GROUP: &str = "task_group";

/// Canonical name of the shift region.
pub const SHIFT_REGION: &str = "shift_region";

/// Derived: mean completion flag across a worker's booked shifts.
pub const USER_AVG_FR: &str = "user_avg_fr";

/// Derived: calendar days between slot-1 and slot-2 bookings.
pub const DELTA_1_2: &str = "delta_1_2";

/// Derived: calendar days between slot-1 and slot-3 bookings.
pub const DELTA_1_3: &str = "delta_1_3";

/// Derived: null-safe minimum of the two deltas.
pub const MIN_RETURN_DAYS: &str = "min_return_days";

/// Worker-level count of responses sent on the platform.
pub const QUANTITY_RESPONSES: &str = "quantity_responses";

/// Coercion policy for a typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Timestamp; unparseable values become null.
    Temporal,
    /// Numeric; unparseable values become null and stay null.
    Numeric,
    /// Flag / frequency / quantity; unparseable and missing values become 0.
    ZeroFilledNumeric,
    /// Free-form categorical text; never coerced.
    Text,
}

impl ColumnKind {
    /// Polars dtype used when a slot is missing this column and a typed
    /// null column must stand in for it.
    pub fn null_dtype(self) -> DataType {
        match self {
            Self::Temporal => DataType::Datetime(TimeUnit::Microseconds, None),
            Self::Numeric | Self::ZeroFilledNumeric => DataType::Float64,
            Self::Text => DataType::String,
        }
    }
}

/// One typed column of the wide input, with its coercion policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as it appears in the wide input.
    pub name: String,
    /// Coercion policy applied at load time.
    pub kind: ColumnKind,
}

/// One member of a per-slot column family.
#[derive(Debug, Clone, Copy)]
pub struct SlotColumn {
    /// Slot-agnostic name used in the long shift table.
    pub canonical: &'static str,
    /// Wide-input stem; slot i reads `{stem}_{i}`.
    pub stem: &'static str,
    /// Coercion policy / null dtype for this column.
    pub kind: ColumnKind,
}

/// The per-slot column family, in long-table column order.
pub const SLOT_COLUMNS: &[SlotColumn] = &[
    SlotColumn {
        canonical: SHIFT_BOOKED_TIME,
        stem: "shift_booked_time",
        kind: ColumnKind::Temporal,
    },
    SlotColumn {
        canonical: SHIFT_START_TIME,
        stem: "shift_start_time",
        kind: ColumnKind::Temporal,
    },
    SlotColumn {
        canonical: JOB_DONE,
        stem: "job_done",
        kind: ColumnKind::Numeric,
    },
    SlotColumn {
        canonical: DURATION,
        stem: "shift_duration",
        kind: ColumnKind::Numeric,
    },
    SlotColumn {
        canonical: PRICE_PER_HOUR,
        stem: "shift_price_per_hour",
        kind: ColumnKind::Numeric,
    },
    SlotColumn {
        canonical: TASK_TYPE,
        stem: "task_type",
        kind: ColumnKind::Text,
    },
    SlotColumn {
        canonical: TASK_GROUP,
        stem: "task_group",
        kind: ColumnKind::Text,
    },
    SlotColumn {
        canonical: SHIFT_REGION,
        stem: "shift_region",
        kind: ColumnKind::Text,
    },
];

/// Worker attributes carried onto every long shift row when present.
pub const CARRY_COLUMNS: &[&str] = &["region", "platform", "age", "income"];

/// Flag, frequency, and quantity columns where a missing value means
/// "did not happen" and is zero-filled at load time.
pub const ZERO_FILLED_COLUMNS: &[&str] = &[
    "serp_frequency",
    "item_view_frequency",
    "started_verification_gu_flg",
    "success_verification_gu_flg",
    "cv_free_grafik_flg",
    "cv_podrabotka_flg",
    "vac_podrabotka_flg",
    QUANTITY_RESPONSES,
    "click_internet_adv_flg",
    "opened_push_flg",
    "watched_stories_in_app_flg",
    "click_addv_communication_flg",
    "has_call_centre_communication_flg",
];

/// Marketing-touch flags with display labels, for the flag-impact view.
pub const MARKETING_FLAGS: &[(&str, &str)] = &[
    ("click_internet_adv_flg", "Ad click"),
    ("opened_push_flg", "Opened push"),
    ("watched_stories_in_app_flg", "Watched stories"),
    ("click_addv_communication_flg", "In-app promo click"),
    ("has_call_centre_communication_flg", "Call-centre contact"),
];

/// Worker-profile flags with display labels, for the flag-impact view.
pub const PROFILE_FLAGS: &[(&str, &str)] = &[
    ("success_verification_gu_flg", "Verified identity"),
    ("cv_podrabotka_flg", "Part-time CV"),
    ("cv_free_grafik_flg", "Flexible-schedule CV"),
    ("vac_podrabotka_flg", "Part-time application"),
];

/// Wide-input name of a slot-family column for slot `slot` (1-based).
pub fn slot_source(stem: &str, slot: usize) -> String {
    format!("{stem}_{slot}")
}

/// The full typed-column spec table for the wide input.
///
/// Expands the slot families over [`SHIFT_SLOTS`] and appends the flat
/// zero-filled columns. Text columns are omitted: they are never coerced.
pub fn column_specs() -> Vec<ColumnSpec> {
    let mut specs = Vec::new();

    for slot in 1..=SHIFT_SLOTS {
        for slot_col in SLOT_COLUMNS {
            if slot_col.kind == ColumnKind::Text {
                continue;
            }
            specs.push(ColumnSpec {
                name: slot_source(slot_col.stem, slot),
                kind: slot_col.kind,
            });
        }
    }

    for name in ZERO_FILLED_COLUMNS {
        specs.push(ColumnSpec {
            name: (*name).to_string(),
            kind: ColumnKind::ZeroFilledNumeric,
        });
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_source_names() {
        assert_eq!(slot_source("shift_booked_time", 1), "shift_booked_time_1");
        assert_eq!(slot_source("shift_duration", 3), "shift_duration_3");
    }

    #[test]
    fn test_column_specs_cover_all_slots() {
        let specs = column_specs();

        for slot in 1..=SHIFT_SLOTS {
            let booked = slot_source("shift_booked_time", slot);
            let spec = specs.iter().find(|s| s.name == booked).unwrap();
            assert_eq!(spec.kind, ColumnKind::Temporal);

            let done = slot_source("job_done", slot);
            let spec = specs.iter().find(|s| s.name == done).unwrap();
            assert_eq!(spec.kind, ColumnKind::Numeric);
        }

        // Flags are zero-filled, never nullable-numeric.
        let flag = specs
            .iter()
            .find(|s| s.name == "opened_push_flg")
            .unwrap();
        assert_eq!(flag.kind, ColumnKind::ZeroFilledNumeric);
    }

    #[test]
    fn test_text_columns_not_coerced() {
        let specs = column_specs();
        assert!(!specs.iter().any(|s| s.name.starts_with("task_type")));
        assert!(!specs.iter().any(|s| s.name.starts_with("shift_region")));
    }
}
