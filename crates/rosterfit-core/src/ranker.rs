//! # Fit Ranker
//!
//! Scores candidates for a role against the effort it requires.
//!
//! For each requested role:
//! 1. keep people whose role equals the requested role (case-sensitive)
//! 2. fit = free / effort × 100 (roles with zero effort are skipped)
//! 3. drop candidates whose fit is below the threshold
//! 4. preferred list: candidates in the preferred cluster, fit descending, top N
//! 5. overall list: remaining candidates from any cluster, fit descending, top N
//!
//! ## Ordering
//!
//! Sorting is stable: candidates with equal fit keep their roster order.
//! Anticipated utilization is reported for display only and never affects
//! filtering or ordering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::capacity::{CapacityRow, finite};
use crate::primitives::TOP_CANDIDATES;

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub cluster: Option<String>,
    pub role: String,
    pub free_hours: f64,
    pub fit_pct: f64,
    /// `None` when the range held no roster weeks.
    pub utilization_pct: Option<f64>,
    /// `None` when the range held no roster weeks.
    pub anticipated_utilization_pct: Option<f64>,
    pub assigned_hours: f64,
    pub capacity_hours: f64,
}

/// Outcome of one ranked list.
///
/// `NoCandidates` is an ordinary result that callers render as a warning,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "candidates", rename_all = "snake_case")]
pub enum Shortlist {
    Candidates(Vec<Candidate>),
    NoCandidates,
}

impl Shortlist {
    fn from_vec(candidates: Vec<Candidate>) -> Self {
        if candidates.is_empty() {
            Self::NoCandidates
        } else {
            Self::Candidates(candidates)
        }
    }

    /// Candidates in rank order (empty for `NoCandidates`).
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Candidates(c) => c,
            Self::NoCandidates => &[],
        }
    }

    /// Whether the list came back empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoCandidates)
    }

    /// Whether `name` is on the list.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.candidates().iter().any(|c| c.name == name)
    }
}

/// Both ranked lists for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRanking {
    pub role: String,
    pub effort: u32,
    pub preferred_cluster: String,
    pub preferred: Shortlist,
    pub overall: Shortlist,
}

impl RoleRanking {
    /// Whether `name` appears on either list.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.preferred.contains(name) || self.overall.contains(name)
    }
}

/// Fit of `free` hours against `effort`, as a percentage.
///
/// `None` when effort is zero: the role is not requested.
#[must_use]
pub fn fit_pct(free: f64, effort: u32) -> Option<f64> {
    if effort == 0 {
        return None;
    }
    Some(free / f64::from(effort) * 100.0)
}

/// The Fit Ranker.
#[derive(Debug, Clone, Copy)]
pub struct FitRanker {
    top_n: usize,
}

impl Default for FitRanker {
    fn default() -> Self {
        Self {
            top_n: TOP_CANDIDATES,
        }
    }
}

impl FitRanker {
    /// Ranker keeping the default top 3 per list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranker keeping `top_n` per list.
    #[must_use]
    pub fn with_top_n(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Number of candidates kept per list.
    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Rank one role.
    ///
    /// Returns `None` when `effort` is zero.
    #[must_use]
    pub fn rank_role(
        &self,
        rows: &[CapacityRow<'_>],
        role: &str,
        effort: u32,
        min_fit_pct: f64,
        preferred_cluster: &str,
    ) -> Option<RoleRanking> {
        if effort == 0 {
            return None;
        }

        let mut eligible: Vec<(f64, &CapacityRow<'_>)> = rows
            .iter()
            .filter(|row| row.person.has_role(role))
            .filter_map(|row| fit_pct(row.snapshot.free, effort).map(|fit| (fit, row)))
            .filter(|(fit, _)| *fit >= min_fit_pct)
            .collect();

        // Stable: equal fits keep roster order.
        eligible.sort_by(|(a, ra), (b, rb)| b.total_cmp(a).then(ra.position.cmp(&rb.position)));

        let preferred: Vec<Candidate> = eligible
            .iter()
            .filter(|(_, row)| row.person.in_cluster(preferred_cluster))
            .take(self.top_n)
            .map(|(fit, row)| candidate(row, role, effort, *fit))
            .collect();

        let taken: BTreeSet<&str> = preferred.iter().map(|c| c.name.as_str()).collect();
        let overall: Vec<Candidate> = eligible
            .iter()
            .filter(|(_, row)| !taken.contains(row.person.name.as_str()))
            .take(self.top_n)
            .map(|(fit, row)| candidate(row, role, effort, *fit))
            .collect();

        Some(RoleRanking {
            role: role.to_string(),
            effort,
            preferred_cluster: preferred_cluster.to_string(),
            preferred: Shortlist::from_vec(preferred),
            overall: Shortlist::from_vec(overall),
        })
    }

    /// Rank several roles independently, in the order given.
    ///
    /// Roles with zero effort are omitted from the output.
    #[must_use]
    pub fn rank<'r>(
        &self,
        rows: &[CapacityRow<'_>],
        efforts: impl IntoIterator<Item = (&'r str, u32)>,
        min_fit_pct: f64,
        preferred_cluster: &str,
    ) -> Vec<RoleRanking> {
        efforts
            .into_iter()
            .filter_map(|(role, effort)| {
                self.rank_role(rows, role, effort, min_fit_pct, preferred_cluster)
            })
            .collect()
    }
}

fn candidate(row: &CapacityRow<'_>, role: &str, effort: u32, fit: f64) -> Candidate {
    let snapshot = row.snapshot;
    Candidate {
        name: row.person.name.clone(),
        cluster: row.person.cluster.clone(),
        role: role.to_string(),
        free_hours: snapshot.free,
        fit_pct: fit,
        utilization_pct: snapshot.utilization_pct(),
        anticipated_utilization_pct: finite(snapshot.anticipated_utilization(f64::from(effort))),
        assigned_hours: snapshot.assigned,
        capacity_hours: snapshot.capacity,
    }
}
