//! # Capacity Calculator
//!
//! Derives per-person capacity figures for a week range.
//!
//! For each person:
//! - weeks = roster week columns inside the range
//! - capacity = weeks × 40
//! - assigned = sum of hours in those weeks
//! - free = capacity − assigned
//! - utilization = assigned / capacity × 100, NaN when capacity is 0
//!
//! NaN utilization means "insufficient data". It is never coerced to 0%.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::calendar::WeekRange;
use crate::primitives::WEEKLY_HOUR_BUDGET;
use crate::{Person, Roster};

/// Derived capacity figures for one person over one week range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacitySnapshot {
    /// Roster weeks inside the range.
    pub weeks: usize,
    /// weeks × weekly budget.
    pub capacity: f64,
    /// Hours already booked.
    pub assigned: f64,
    /// capacity − assigned. Negative when overbooked.
    pub free: f64,
    /// assigned / capacity × 100, NaN when capacity is 0.
    pub utilization: f64,
}

impl CapacitySnapshot {
    /// Build a snapshot from a week count and booked hours.
    #[must_use]
    pub fn from_assigned(weeks: usize, assigned: f64) -> Self {
        let capacity = weeks as f64 * WEEKLY_HOUR_BUDGET;
        Self {
            weeks,
            capacity,
            assigned,
            free: capacity - assigned,
            utilization: percent_of_capacity(assigned, capacity),
        }
    }

    /// Utilization, or `None` when indeterminate.
    #[must_use]
    pub fn utilization_pct(&self) -> Option<f64> {
        finite(self.utilization)
    }

    /// Whether the range held no roster weeks.
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        self.utilization.is_nan()
    }

    /// Projected utilization if `effort` more hours were booked.
    ///
    /// NaN when capacity is 0.
    #[must_use]
    pub fn anticipated_utilization(&self, effort: f64) -> f64 {
        percent_of_capacity(self.assigned + effort, self.capacity)
    }
}

/// `hours / capacity × 100`, NaN instead of dividing by zero.
fn percent_of_capacity(hours: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        hours / capacity * 100.0
    } else {
        f64::NAN
    }
}

/// Map NaN to `None` for display layers.
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() { Some(value) } else { None }
}

/// A roster row annotated with its snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CapacityRow<'a> {
    /// Position in the roster (tie-break order for ranking).
    pub position: usize,
    /// The person.
    pub person: &'a Person,
    /// Derived figures.
    pub snapshot: CapacitySnapshot,
}

/// The Capacity Calculator.
///
/// Stateless; a pure function of (roster, range).
pub struct CapacityCalculator;

impl CapacityCalculator {
    /// Snapshot for a single person.
    #[must_use]
    pub fn snapshot(person: &Person, weeks: usize, range: &WeekRange) -> CapacitySnapshot {
        Self::snapshot_with(person, weeks, range, 0.0)
    }

    /// Snapshot for a single person who already owes `committed` hours to
    /// earlier projects inside the range.
    ///
    /// The committed total is added to the booked hours in one step, so
    /// assigned = booked + committed holds exactly. A range with no roster
    /// weeks has nothing to carry the commitment and ignores it.
    #[must_use]
    pub fn snapshot_with(
        person: &Person,
        weeks: usize,
        range: &WeekRange,
        committed: f64,
    ) -> CapacitySnapshot {
        let carried = if weeks > 0 { committed } else { 0.0 };
        CapacitySnapshot::from_assigned(weeks, person.hours_in(range) + carried)
    }

    /// Annotate every person on the roster, preserving roster order.
    #[must_use]
    pub fn annotate<'a>(roster: &'a Roster, range: &WeekRange) -> Vec<CapacityRow<'a>> {
        Self::annotate_with(roster, range, &BTreeMap::new())
    }

    /// Annotate every person, adding the hours in `committed` (by name) to
    /// what the roster already books.
    #[must_use]
    pub fn annotate_with<'a>(
        roster: &'a Roster,
        range: &WeekRange,
        committed: &BTreeMap<String, f64>,
    ) -> Vec<CapacityRow<'a>> {
        let weeks = roster.weeks_in(range).len();
        roster
            .people()
            .iter()
            .enumerate()
            .map(|(position, person)| {
                let extra = committed.get(&person.name).copied().unwrap_or(0.0);
                CapacityRow {
                    position,
                    person,
                    snapshot: Self::snapshot_with(person, weeks, range, extra),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn two_week_roster() -> Roster {
        let w1 = date(2024, 1, 1);
        let w2 = date(2024, 1, 8);
        let w3 = date(2024, 1, 15);
        Roster::new(
            vec![w1, w2, w3],
            vec![
                Person::new("A")
                    .with_cluster("X")
                    .with_role("Analyst")
                    .with_hours(w1, 8.0)
                    .with_hours(w2, 12.0)
                    .with_hours(w3, 40.0),
                Person::new("B"),
            ],
        )
        .expect("roster")
    }

    #[test]
    fn two_week_snapshot() {
        let roster = two_week_roster();
        let range = WeekRange::new(date(2024, 1, 1), date(2024, 1, 14)).expect("range");
        let rows = CapacityCalculator::annotate(&roster, &range);

        let a = rows[0].snapshot;
        assert_eq!(a.weeks, 2);
        assert_eq!(a.capacity, 80.0);
        assert_eq!(a.assigned, 20.0);
        assert_eq!(a.free, 60.0);
        assert_eq!(a.utilization, 25.0);
        assert_eq!(a.anticipated_utilization(50.0), 87.5);
    }

    #[test]
    fn person_without_hours_is_fully_free() {
        let roster = two_week_roster();
        let range = WeekRange::new(date(2024, 1, 1), date(2024, 1, 21)).expect("range");
        let rows = CapacityCalculator::annotate(&roster, &range);

        let b = rows[1].snapshot;
        assert_eq!(b.capacity, 120.0);
        assert_eq!(b.assigned, 0.0);
        assert_eq!(b.free, 120.0);
        assert_eq!(b.utilization_pct(), Some(0.0));
    }

    #[test]
    fn empty_range_yields_nan_utilization() {
        let roster = two_week_roster();
        let range = WeekRange::new(date(2025, 6, 2), date(2025, 6, 8)).expect("range");
        let rows = CapacityCalculator::annotate(&roster, &range);

        for row in rows {
            assert_eq!(row.snapshot.weeks, 0);
            assert_eq!(row.snapshot.capacity, 0.0);
            assert!(row.snapshot.utilization.is_nan());
            assert!(row.snapshot.is_indeterminate());
            assert_eq!(row.snapshot.utilization_pct(), None);
            assert!(row.snapshot.anticipated_utilization(10.0).is_nan());
        }
    }

    #[test]
    fn overbooked_person_has_negative_free() {
        let snapshot = CapacitySnapshot::from_assigned(1, 55.0);
        assert_eq!(snapshot.free, -15.0);
        assert_eq!(snapshot.utilization, 137.5);
    }

    #[test]
    fn committed_hours_add_exactly() {
        let roster = two_week_roster();
        let range = WeekRange::new(date(2024, 1, 1), date(2024, 1, 14)).expect("range");
        let committed = BTreeMap::from([("B".to_string(), 112.0 / 3.0)]);
        let rows = CapacityCalculator::annotate_with(&roster, &range, &committed);

        assert_eq!(rows[0].snapshot.assigned, 20.0);
        assert_eq!(rows[1].snapshot.assigned, 112.0 / 3.0);
        assert_eq!(rows[1].snapshot.free, 80.0 - 112.0 / 3.0);
    }

    #[test]
    fn commitment_ignored_without_weeks() {
        let roster = two_week_roster();
        let range = WeekRange::new(date(2025, 6, 2), date(2025, 6, 8)).expect("range");
        let committed = BTreeMap::from([("A".to_string(), 40.0)]);
        let rows = CapacityCalculator::annotate_with(&roster, &range, &committed);

        assert_eq!(rows[0].snapshot.assigned, 0.0);
        assert!(rows[0].snapshot.is_indeterminate());
    }

    #[test]
    fn rows_keep_roster_order() {
        let roster = two_week_roster();
        let range = WeekRange::new(date(2024, 1, 1), date(2024, 1, 7)).expect("range");
        let rows = CapacityCalculator::annotate(&roster, &range);
        let names: Vec<_> = rows.iter().map(|r| r.person.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(rows[1].position, 1);
    }
}
