//! # Allocation Ledger
//!
//! Running record of hours committed to people by finalized projects.
//!
//! The ledger holds one `ProjectAllocation` per project slot. When project
//! `i` is evaluated, the commitments of slots `0..i` are summed per person
//! ([`AllocationLedger::committed_in`]) and added to that person's assigned
//! hours over project `i`'s range in one step, so the carried total is exact.
//!
//! [`AllocationLedger::apply`] gives the per-week view of the same
//! commitments on a working copy of the roster:
//!
//! ```text
//! per_week = committed / weeks_in_range   (last week takes the remainder)
//! ```
//!
//! The loaded roster is never touched. A range with no roster weeks has no
//! cells to spread into, so commitments leave it unchanged (its capacity is 0
//! and utilization is already indeterminate).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::WeekRange;
use crate::{Roster, RosterFitError};

/// Hours committed per person by one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectAllocation {
    hours: BTreeMap<String, f64>,
}

impl ProjectAllocation {
    /// Create an empty allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `hours` more to `name`. Non-positive or non-finite amounts are ignored.
    pub fn commit(&mut self, name: impl Into<String>, hours: f64) {
        if hours.is_finite() && hours > 0.0 {
            *self.hours.entry(name.into()).or_insert(0.0) += hours;
        }
    }

    /// Hours committed to `name` (0 when absent).
    #[must_use]
    pub fn hours_for(&self, name: &str) -> f64 {
        self.hours.get(name).copied().unwrap_or(0.0)
    }

    /// Total hours committed by this project.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.hours.values().sum()
    }

    /// Whether nothing is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Commitments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.hours.iter().map(|(n, h)| (n.as_str(), *h))
    }
}

/// The Allocation Ledger.
///
/// One entry per project slot, in declared order. Resizing is explicit;
/// truncation drops trailing entries for good.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationLedger {
    entries: Vec<ProjectAllocation>,
}

impl AllocationLedger {
    /// Ledger with `projects` empty entries.
    #[must_use]
    pub fn new(projects: usize) -> Self {
        Self {
            entries: vec![ProjectAllocation::new(); projects],
        }
    }

    /// Number of project entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for project `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&ProjectAllocation> {
        self.entries.get(index)
    }

    /// Replace the entry for project `index`.
    pub fn record(
        &mut self,
        index: usize,
        allocation: ProjectAllocation,
    ) -> Result<(), RosterFitError> {
        let count = self.entries.len();
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(RosterFitError::ProjectOutOfRange { index, count })?;
        *slot = allocation;
        Ok(())
    }

    /// Empty the entry for project `index`, returning what it held.
    pub fn clear(&mut self, index: usize) -> Result<ProjectAllocation, RosterFitError> {
        let count = self.entries.len();
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(RosterFitError::ProjectOutOfRange { index, count })?;
        Ok(std::mem::take(slot))
    }

    /// Grow with empty entries or truncate to `projects`.
    ///
    /// Returns the discarded trailing entries. Truncation is irreversible.
    pub fn resize(&mut self, projects: usize) -> Vec<ProjectAllocation> {
        if projects < self.entries.len() {
            self.entries.split_off(projects)
        } else {
            self.entries.resize_with(projects, ProjectAllocation::new);
            Vec::new()
        }
    }

    /// Per-person hours committed by projects `0..index`.
    pub fn committed_before(&self, index: usize) -> Result<BTreeMap<String, f64>, RosterFitError> {
        if index >= self.entries.len() {
            return Err(RosterFitError::ProjectOutOfRange {
                index,
                count: self.entries.len(),
            });
        }

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for entry in &self.entries[..index] {
            for (name, hours) in entry.iter() {
                *totals.entry(name.to_string()).or_insert(0.0) += hours;
            }
        }
        Ok(totals)
    }

    /// Hours committed to `name` by projects `0..=index`.
    #[must_use]
    pub fn cumulative(&self, name: &str, index: usize) -> f64 {
        self.entries
            .iter()
            .take(index.saturating_add(1))
            .map(|e| e.hours_for(name))
            .sum()
    }

    /// Commitments of projects `0..index` that land inside `range`.
    ///
    /// A range with no roster weeks has nowhere to place hours, so nothing
    /// is carried into it.
    pub fn committed_in(
        &self,
        roster: &Roster,
        range: &WeekRange,
        index: usize,
    ) -> Result<BTreeMap<String, f64>, RosterFitError> {
        let committed = self.committed_before(index)?;
        if roster.weeks_in(range).is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(committed)
    }

    /// Working copy of `roster` with commitments of projects `0..index`
    /// spread across the roster weeks of `range`.
    ///
    /// Each week gets an even share and the last week takes the remainder,
    /// so a person's hours over the range grow by the committed total.
    pub fn apply(
        &self,
        roster: &Roster,
        range: &WeekRange,
        index: usize,
    ) -> Result<Roster, RosterFitError> {
        let committed = self.committed_before(index)?;
        let mut working = roster.clone();

        let weeks = roster.weeks_in(range);
        let (last, leading) = match weeks.split_last() {
            Some(split) => split,
            None => return Ok(working),
        };
        let week_count = weeks.len() as f64;
        for (name, hours) in &committed {
            let per_week = hours / week_count;
            working.spread_hours(name, leading, per_week);
            let rest = hours - per_week * leading.len() as f64;
            working.spread_hours(name, std::slice::from_ref(last), rest);
        }
        Ok(working)
    }
}
