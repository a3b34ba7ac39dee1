//! # Property-Based Tests
//!
//! Invariants of capacity, ranking and the allocation ledger, checked with
//! proptest over generated rosters.

use chrono::{Days, NaiveDate};
use proptest::collection::vec;
use proptest::prelude::*;
use rosterfit_core::primitives::WEEKLY_HOUR_BUDGET;
use rosterfit_core::{
    AllocationLedger, CapacityCalculator, FitRanker, Person, ProjectAllocation, ProjectParams,
    Roster, Session, WeekRange,
};
use std::collections::BTreeSet;

const CLUSTERS: [&str; 3] = ["X", "Y", "Z"];

fn first_week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

fn week(i: u64) -> NaiveDate {
    first_week()
        .checked_add_days(Days::new(i * 7))
        .expect("valid week")
}

/// Build a roster of analysts from generated (cluster, hours per week) rows.
///
/// The first person is always in cluster "X" so it can be the preferred cluster.
fn build_roster(weeks: usize, rows: &[(usize, Vec<f64>)]) -> Roster {
    let week_list: Vec<NaiveDate> = (0..weeks as u64).map(week).collect();
    let people = rows
        .iter()
        .enumerate()
        .map(|(i, (cluster, hours))| {
            let cluster = if i == 0 { 0 } else { *cluster % CLUSTERS.len() };
            let mut p = Person::new(format!("P{i}"))
                .with_cluster(CLUSTERS[cluster])
                .with_role("Analyst");
            for (w, h) in week_list.iter().zip(hours) {
                p = p.with_hours(*w, *h);
            }
            p
        })
        .collect();
    Roster::new(week_list, people).expect("roster")
}

fn roster_strategy() -> impl Strategy<Value = (usize, Vec<(usize, Vec<f64>)>)> {
    (1usize..6).prop_flat_map(|weeks| {
        let row = (0usize..3, vec(0.0f64..60.0, weeks));
        (Just(weeks), vec(row, 1..12))
    })
}

fn full_range(weeks: usize) -> WeekRange {
    WeekRange::new(first_week(), week(weeks as u64 - 1)).expect("range")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// free = capacity − assigned and capacity = weeks × 40.
    #[test]
    fn capacity_identities((weeks, rows) in roster_strategy()) {
        let roster = build_roster(weeks, &rows);
        let range = full_range(weeks);

        for row in CapacityCalculator::annotate(&roster, &range) {
            let s = row.snapshot;
            prop_assert_eq!(s.capacity, weeks as f64 * WEEKLY_HOUR_BUDGET);
            prop_assert_eq!(s.free, s.capacity - s.assigned);
            prop_assert_eq!(s.utilization, s.assigned / s.capacity * 100.0);
        }
    }

    /// Utilization is NaN exactly when the range holds no roster weeks.
    #[test]
    fn nan_iff_zero_capacity((weeks, rows) in roster_strategy(), offset in 0u64..20) {
        let roster = build_roster(weeks, &rows);
        let day = week(offset);
        let range = WeekRange::new(day, day).expect("range");

        for row in CapacityCalculator::annotate(&roster, &range) {
            prop_assert_eq!(row.snapshot.utilization.is_nan(), row.snapshot.capacity == 0.0);
        }
    }

    /// At most 3 per list, lists disjoint, every entry clears the threshold.
    #[test]
    fn ranking_bounds(
        (weeks, rows) in roster_strategy(),
        effort in 1u32..200,
        threshold in 0.0f64..=100.0,
    ) {
        let roster = build_roster(weeks, &rows);
        let range = full_range(weeks);
        let table = CapacityCalculator::annotate(&roster, &range);

        let ranking = FitRanker::new()
            .rank_role(&table, "Analyst", effort, threshold, "X")
            .expect("ranking");

        prop_assert!(ranking.preferred.candidates().len() <= 3);
        prop_assert!(ranking.overall.candidates().len() <= 3);

        let preferred: BTreeSet<&str> =
            ranking.preferred.candidates().iter().map(|c| c.name.as_str()).collect();
        for c in ranking.overall.candidates() {
            prop_assert!(!preferred.contains(c.name.as_str()));
        }
        for c in ranking.preferred.candidates().iter().chain(ranking.overall.candidates()) {
            prop_assert!(c.fit_pct >= threshold);
        }
        for c in ranking.preferred.candidates() {
            prop_assert_eq!(c.cluster.as_deref(), Some("X"));
        }
    }

    /// Lists are sorted by fit, highest first.
    #[test]
    fn ranking_sorted_descending((weeks, rows) in roster_strategy(), effort in 1u32..200) {
        let roster = build_roster(weeks, &rows);
        let range = full_range(weeks);
        let table = CapacityCalculator::annotate(&roster, &range);

        let ranking = FitRanker::new()
            .rank_role(&table, "Analyst", effort, 0.0, "X")
            .expect("ranking");
        for list in [&ranking.preferred, &ranking.overall] {
            let fits: Vec<f64> = list.candidates().iter().map(|c| c.fit_pct).collect();
            for pair in fits.windows(2) {
                prop_assert!(pair[0] >= pair[1]);
            }
        }
    }

    /// Cumulative commitments never decrease across projects.
    #[test]
    fn ledger_monotonic(commits in vec(0.0f64..100.0, 1..8)) {
        let mut ledger = AllocationLedger::new(commits.len());
        for (i, hours) in commits.iter().enumerate() {
            let mut allocation = ProjectAllocation::new();
            allocation.commit("A", *hours);
            ledger.record(i, allocation).expect("record");
        }

        let totals: Vec<f64> = (0..commits.len()).map(|i| ledger.cumulative("A", i)).collect();
        for pair in totals.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
    }

    /// Project 1 ranks the same whether or not later projects hold commitments.
    #[test]
    fn first_project_independent_of_ledger(
        (weeks, rows) in roster_strategy(),
        effort in 1u32..200,
    ) {
        let roster = build_roster(weeks, &rows);
        let params = ProjectParams::new(first_week(), week(weeks as u64 - 1), "X")
            .with_min_fit(0.0)
            .with_effort("Analyst", effort);

        let mut fresh = Session::new(roster.clone());
        let expected = fresh.rank_with(0, params.clone()).expect("rank");

        let mut busy = Session::new(roster);
        busy.resize_projects(2, false).expect("resize");
        busy.rank_with(1, params.clone()).expect("rank 1");
        busy.allocate(1, vec![rosterfit_core::Selection::new("Analyst", "P0")])
            .expect("allocate");
        let actual = busy.rank_with(0, params).expect("rank 0");

        prop_assert_eq!(actual.roles, expected.roles);
    }
}
