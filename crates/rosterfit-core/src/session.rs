//! # Session Module
//!
//! A Session combines one loaded roster with the allocation ledger and the
//! per-project slot state of a multi-project staffing pass.
//!
//! - The Session is owned by the caller and passed into every operation
//! - It is scoped to one roster load; reloading a different file starts a new one
//! - Nothing here is written to disk
//!
//! ## Project Slot Lifecycle
//!
//! ```text
//! Unconfigured → RolesSpecified → CandidatesRanked → Allocated
//!                      ▲                 ▲               │
//!                      └── configure ────┴──── rank ─────┘
//! ```
//!
//! Configuring or re-ranking a slot discards only that slot's allocation.
//! Earlier slots are untouched; later slots that were already ranked are
//! flagged stale because the commitments they were ranked against changed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::calendar::WeekRange;
use crate::capacity::{CapacityCalculator, finite};
use crate::ingestor::{LoadedRoster, RosterFingerprint};
use crate::ledger::{AllocationLedger, ProjectAllocation};
use crate::primitives::{
    DEFAULT_MAX_PROJECTS, DEFAULT_MIN_FIT_PCT, MAX_MIN_FIT_PCT, MAX_PROJECTS_LIMIT, TOP_CANDIDATES,
};
use crate::ranker::{FitRanker, RoleRanking};
use crate::{Roster, RosterFitError};

// =============================================================================
// SLOT STATE
// =============================================================================

/// Lifecycle state of a project slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Unconfigured,
    RolesSpecified,
    CandidatesRanked,
    Allocated,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unconfigured => "unconfigured",
            Self::RolesSpecified => "roles specified",
            Self::CandidatesRanked => "candidates ranked",
            Self::Allocated => "allocated",
        };
        f.write_str(label)
    }
}

// =============================================================================
// PROJECT PARAMETERS
// =============================================================================

fn default_min_fit() -> f64 {
    DEFAULT_MIN_FIT_PCT
}

/// Parameters of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectParams {
    /// Display name, used in exports.
    #[serde(default)]
    pub name: Option<String>,
    /// First day of the project (snapped back to Monday).
    pub start: NaiveDate,
    /// Last day of the project (snapped forward to Sunday).
    pub end: NaiveDate,
    /// Minimum fit percentage, 0..=100.
    #[serde(default = "default_min_fit")]
    pub min_fit_pct: f64,
    /// Cluster ranked as the preferred pool. Must exist on the roster.
    pub preferred_cluster: String,
    /// Required effort hours per role. Zero means "not requested".
    #[serde(default)]
    pub efforts: BTreeMap<String, u32>,
}

impl ProjectParams {
    /// Parameters with the default threshold and no efforts.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate, preferred_cluster: impl Into<String>) -> Self {
        Self {
            name: None,
            start,
            end,
            min_fit_pct: DEFAULT_MIN_FIT_PCT,
            preferred_cluster: preferred_cluster.into(),
            efforts: BTreeMap::new(),
        }
    }

    /// Set the project name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the minimum fit percentage.
    #[must_use]
    pub fn with_min_fit(mut self, min_fit_pct: f64) -> Self {
        self.min_fit_pct = min_fit_pct;
        self
    }

    /// Require `hours` of effort for `role`.
    #[must_use]
    pub fn with_effort(mut self, role: impl Into<String>, hours: u32) -> Self {
        self.efforts.insert(role.into(), hours);
        self
    }

    /// The project's whole-week range.
    pub fn week_range(&self) -> Result<WeekRange, RosterFitError> {
        WeekRange::new(self.start, self.end)
    }

    /// Effort required for `role` (0 when not requested).
    #[must_use]
    pub fn effort_for(&self, role: &str) -> u32 {
        self.efforts.get(role).copied().unwrap_or(0)
    }

    /// Roles with positive effort.
    pub fn requested_roles(&self) -> impl Iterator<Item = (&str, u32)> {
        self.efforts
            .iter()
            .filter(|(_, effort)| **effort > 0)
            .map(|(role, effort)| (role.as_str(), *effort))
    }

    /// Check the parameters against a roster and return the normalized range.
    pub fn validate(&self, roster: &Roster) -> Result<WeekRange, RosterFitError> {
        let range = self.week_range()?;
        if !self.min_fit_pct.is_finite()
            || self.min_fit_pct < 0.0
            || self.min_fit_pct > MAX_MIN_FIT_PCT
        {
            return Err(RosterFitError::InvalidThreshold(self.min_fit_pct));
        }
        if !roster.has_cluster(&self.preferred_cluster) {
            return Err(RosterFitError::UnknownCluster(self.preferred_cluster.clone()));
        }
        Ok(range)
    }

    /// Name shown in exports: the given name, or "Project N" (1-based).
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Project {}", index + 1))
    }
}

/// Requested roles in roster display order, then any roles unknown to the
/// roster in name order.
fn ordered_efforts<'p>(roster: &Roster, params: &'p ProjectParams) -> Vec<(&'p str, u32)> {
    let requested: Vec<(&str, u32)> = params.requested_roles().collect();
    let mut ordered = Vec::with_capacity(requested.len());
    let mut seen = BTreeSet::new();

    for role in roster.roles() {
        if let Some((name, effort)) = requested.iter().find(|(r, _)| *r == role) {
            seen.insert(*name);
            ordered.push((*name, *effort));
        }
    }
    for (name, effort) in requested {
        if !seen.contains(name) {
            ordered.push((name, effort));
        }
    }
    ordered
}

// =============================================================================
// RESULTS
// =============================================================================

/// Ranked output of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRanking {
    pub index: usize,
    pub project: String,
    pub range: WeekRange,
    /// Roster weeks inside the range.
    pub weeks: usize,
    pub min_fit_pct: f64,
    /// One entry per requested role, in display order.
    pub roles: Vec<RoleRanking>,
}

/// An explicit candidate pick for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub role: String,
    pub name: String,
    /// Hours to commit. When absent, the role's effort not already covered by
    /// explicit hours is split evenly across the role's remaining picks.
    #[serde(default)]
    pub hours: Option<f64>,
}

impl Selection {
    /// Pick `name` for `role` with the default share of the effort.
    #[must_use]
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            hours: None,
        }
    }

    /// Pick with an explicit number of hours.
    #[must_use]
    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = Some(hours);
        self
    }
}

/// Anticipated utilization of one person for one requested role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProjection {
    pub role: String,
    pub effort: u32,
    pub anticipated_utilization_pct: Option<f64>,
}

/// Side-by-side view of one person against a project's requested roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub index: usize,
    pub name: String,
    pub cluster: Option<String>,
    pub role: Option<String>,
    pub free_hours: f64,
    pub assigned_hours: f64,
    pub capacity_hours: f64,
    pub utilization_pct: Option<f64>,
    /// Each requested role taken alone.
    pub projections: Vec<RoleProjection>,
    /// Sum of every requested effort.
    pub cumulative_effort: u64,
    /// Utilization if the person took on every requested effort at once.
    pub cumulative_anticipated_utilization_pct: Option<f64>,
}

/// What a project count change would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizePreview {
    pub from: usize,
    pub to: usize,
    /// Slot indexes that would be dropped.
    pub discarded: Vec<usize>,
    /// How many of the dropped slots hold committed hours.
    pub discarded_allocations: usize,
}

impl ResizePreview {
    /// Whether applying the change loses project data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        !self.discarded.is_empty()
    }
}

// =============================================================================
// PROJECT SLOT
// =============================================================================

/// State of one project slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectSlot {
    state: SlotState,
    params: Option<ProjectParams>,
    ranking: Option<ProjectRanking>,
    selections: Vec<Selection>,
    stale: bool,
}

impl ProjectSlot {
    #[must_use]
    pub fn state(&self) -> SlotState {
        self.state
    }

    #[must_use]
    pub fn params(&self) -> Option<&ProjectParams> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn ranking(&self) -> Option<&ProjectRanking> {
        self.ranking.as_ref()
    }

    #[must_use]
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Whether an earlier slot's allocation changed after this slot was ranked.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Session limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Largest project count a caller may request.
    pub max_projects: usize,
    /// Candidates kept per ranked list.
    pub top_n: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_projects: DEFAULT_MAX_PROJECTS,
            top_n: TOP_CANDIDATES,
        }
    }
}

/// A staffing session over one loaded roster.
#[derive(Debug, Clone)]
pub struct Session {
    roster: Roster,
    fingerprint: Option<RosterFingerprint>,
    config: SessionConfig,
    ranker: FitRanker,
    ledger: AllocationLedger,
    slots: Vec<ProjectSlot>,
}

impl Session {
    /// Session over `roster` with default limits and one project slot.
    #[must_use]
    pub fn new(roster: Roster) -> Self {
        let config = SessionConfig::default();
        Self {
            roster,
            fingerprint: None,
            config,
            ranker: FitRanker::with_top_n(config.top_n),
            ledger: AllocationLedger::new(1),
            slots: vec![ProjectSlot::default()],
        }
    }

    /// Session with explicit limits.
    pub fn with_config(roster: Roster, config: SessionConfig) -> Result<Self, RosterFitError> {
        if config.max_projects == 0 || config.max_projects > MAX_PROJECTS_LIMIT {
            return Err(RosterFitError::InvalidProjectCount {
                requested: config.max_projects,
                max: MAX_PROJECTS_LIMIT,
            });
        }
        if config.top_n == 0 {
            return Err(RosterFitError::InvalidTopN(config.top_n));
        }
        let mut session = Self::new(roster);
        session.config = config;
        session.ranker = FitRanker::with_top_n(config.top_n);
        Ok(session)
    }

    /// Session over a freshly loaded roster, remembering its fingerprint.
    pub fn from_loaded(loaded: LoadedRoster, config: SessionConfig) -> Result<Self, RosterFitError> {
        let mut session = Self::with_config(loaded.roster, config)?;
        session.fingerprint = Some(loaded.fingerprint);
        Ok(session)
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Fingerprint of the source the roster was loaded from, if known.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&RosterFingerprint> {
        self.fingerprint.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    #[must_use]
    pub fn project_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slots(&self) -> &[ProjectSlot] {
        &self.slots
    }

    /// Slot `index`.
    pub fn slot(&self, index: usize) -> Result<&ProjectSlot, RosterFitError> {
        self.slots.get(index).ok_or(RosterFitError::ProjectOutOfRange {
            index,
            count: self.slots.len(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut ProjectSlot, RosterFitError> {
        let count = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(RosterFitError::ProjectOutOfRange { index, count })
    }

    // =========================================================================
    // CONFIGURATION & RANKING
    // =========================================================================

    /// Set a slot's parameters. Moves the slot to `RolesSpecified`.
    ///
    /// Discards the slot's previous ranking and allocation.
    pub fn configure(
        &mut self,
        index: usize,
        params: ProjectParams,
    ) -> Result<SlotState, RosterFitError> {
        self.slot(index)?;
        params.validate(&self.roster)?;
        self.discard_allocation(index)?;

        let slot = self.slot_mut(index)?;
        slot.params = Some(params);
        slot.ranking = None;
        slot.selections.clear();
        slot.stale = false;
        slot.state = SlotState::RolesSpecified;
        Ok(slot.state)
    }

    /// Compute a slot's ranking without changing any state.
    ///
    /// Commitments of all earlier slots are added to each person's assigned
    /// hours before capacity is computed.
    pub fn evaluate(&self, index: usize) -> Result<ProjectRanking, RosterFitError> {
        let params = self.require_params(index)?;
        let range = params.validate(&self.roster)?;
        let committed = self.ledger.committed_in(&self.roster, &range, index)?;
        let rows = CapacityCalculator::annotate_with(&self.roster, &range, &committed);

        let roles = self.ranker.rank(
            &rows,
            ordered_efforts(&self.roster, params),
            params.min_fit_pct,
            &params.preferred_cluster,
        );

        Ok(ProjectRanking {
            index,
            project: params.label(index),
            range,
            weeks: self.roster.weeks_in(&range).len(),
            min_fit_pct: params.min_fit_pct,
            roles,
        })
    }

    /// Rank a configured slot. Moves it to `CandidatesRanked`.
    ///
    /// Re-ranking an allocated slot discards that slot's allocation only.
    pub fn rank(&mut self, index: usize) -> Result<ProjectRanking, RosterFitError> {
        let ranking = self.evaluate(index)?;
        self.discard_allocation(index)?;

        let slot = self.slot_mut(index)?;
        slot.ranking = Some(ranking.clone());
        slot.selections.clear();
        slot.stale = false;
        slot.state = SlotState::CandidatesRanked;
        Ok(ranking)
    }

    /// Configure and rank in one pass.
    pub fn rank_with(
        &mut self,
        index: usize,
        params: ProjectParams,
    ) -> Result<ProjectRanking, RosterFitError> {
        self.configure(index, params)?;
        self.rank(index)
    }

    // =========================================================================
    // ALLOCATION
    // =========================================================================

    /// Finalize a ranked slot's picks and record them in the ledger.
    ///
    /// Replaces any previous allocation of the same slot. Later slots that were
    /// already ranked become stale.
    pub fn allocate(
        &mut self,
        index: usize,
        selections: Vec<Selection>,
    ) -> Result<ProjectAllocation, RosterFitError> {
        let slot = self.slot(index)?;
        if !matches!(
            slot.state,
            SlotState::CandidatesRanked | SlotState::Allocated
        ) {
            return Err(RosterFitError::InvalidState {
                index,
                state: slot.state,
                expected: "candidates ranked",
            });
        }
        let params = self.require_params(index)?;
        let allocation = build_allocation(index, params, &self.roster, &selections)?;

        self.ledger.record(index, allocation.clone())?;
        let slot = self.slot_mut(index)?;
        slot.selections = selections;
        slot.state = SlotState::Allocated;
        self.mark_later_stale(index);
        Ok(allocation)
    }

    fn discard_allocation(&mut self, index: usize) -> Result<(), RosterFitError> {
        if self.slot(index)?.state == SlotState::Allocated {
            self.ledger.clear(index)?;
            self.mark_later_stale(index);
        }
        Ok(())
    }

    fn mark_later_stale(&mut self, index: usize) {
        for slot in self.slots.iter_mut().skip(index + 1) {
            if slot.ranking.is_some() {
                slot.stale = true;
            }
        }
    }

    fn require_params(&self, index: usize) -> Result<&ProjectParams, RosterFitError> {
        let slot = self.slot(index)?;
        slot.params.as_ref().ok_or(RosterFitError::InvalidState {
            index,
            state: slot.state,
            expected: "roles specified",
        })
    }

    // =========================================================================
    // PROJECT COUNT
    // =========================================================================

    /// Describe what changing the project count to `projects` would do.
    pub fn preview_resize(&self, projects: usize) -> Result<ResizePreview, RosterFitError> {
        if projects == 0 || projects > self.config.max_projects {
            return Err(RosterFitError::InvalidProjectCount {
                requested: projects,
                max: self.config.max_projects,
            });
        }
        let from = self.slots.len();
        let discarded: Vec<usize> = (projects..from).collect();
        let discarded_allocations = discarded
            .iter()
            .filter(|i| self.ledger.entry(**i).is_some_and(|e| !e.is_empty()))
            .count();

        Ok(ResizePreview {
            from,
            to: projects,
            discarded,
            discarded_allocations,
        })
    }

    /// Change the project count.
    ///
    /// Growing appends unconfigured slots with empty ledger entries. Shrinking
    /// drops trailing slots and their ledger entries permanently, and is
    /// refused unless `confirm_truncation` is set.
    pub fn resize_projects(
        &mut self,
        projects: usize,
        confirm_truncation: bool,
    ) -> Result<ResizePreview, RosterFitError> {
        let preview = self.preview_resize(projects)?;
        if preview.is_destructive() && !confirm_truncation {
            return Err(RosterFitError::TruncationNotConfirmed {
                from: preview.from,
                to: preview.to,
                discarded: preview.discarded,
            });
        }

        self.ledger.resize(projects);
        self.slots.resize_with(projects, ProjectSlot::default);
        Ok(preview)
    }

    // =========================================================================
    // COMPARISON
    // =========================================================================

    /// Compare one person against every role a configured slot requests.
    pub fn compare(&self, index: usize, name: &str) -> Result<Comparison, RosterFitError> {
        let params = self.require_params(index)?;
        let range = params.validate(&self.roster)?;
        let committed = self.ledger.committed_in(&self.roster, &range, index)?;
        let person = self
            .roster
            .person(name)
            .ok_or_else(|| RosterFitError::UnknownPerson(name.to_string()))?;

        let weeks = self.roster.weeks_in(&range).len();
        let carried = committed.get(name).copied().unwrap_or(0.0);
        let snapshot = CapacityCalculator::snapshot_with(person, weeks, &range, carried);

        let efforts = ordered_efforts(&self.roster, params);
        let projections = efforts
            .iter()
            .map(|(role, effort)| RoleProjection {
                role: (*role).to_string(),
                effort: *effort,
                anticipated_utilization_pct: finite(
                    snapshot.anticipated_utilization(f64::from(*effort)),
                ),
            })
            .collect();
        let cumulative_effort: u64 = efforts.iter().map(|(_, e)| u64::from(*e)).sum();

        Ok(Comparison {
            index,
            name: person.name.clone(),
            cluster: person.cluster.clone(),
            role: person.role.clone(),
            free_hours: snapshot.free,
            assigned_hours: snapshot.assigned,
            capacity_hours: snapshot.capacity,
            utilization_pct: snapshot.utilization_pct(),
            projections,
            cumulative_effort,
            cumulative_anticipated_utilization_pct: finite(
                snapshot.anticipated_utilization(cumulative_effort as f64),
            ),
        })
    }
}

/// Turn picks into committed hours.
fn build_allocation(
    index: usize,
    params: &ProjectParams,
    roster: &Roster,
    selections: &[Selection],
) -> Result<ProjectAllocation, RosterFitError> {
    let mut seen = BTreeSet::new();
    let mut explicit: BTreeMap<&str, f64> = BTreeMap::new();
    let mut implicit: BTreeMap<&str, usize> = BTreeMap::new();

    for pick in selections {
        if params.effort_for(&pick.role) == 0 {
            return Err(RosterFitError::RoleNotRequested {
                index,
                role: pick.role.clone(),
            });
        }
        let person = roster
            .person(&pick.name)
            .ok_or_else(|| RosterFitError::UnknownPerson(pick.name.clone()))?;
        if !person.has_role(&pick.role) {
            return Err(RosterFitError::InvalidSelection(format!(
                "{} is not a {}",
                pick.name, pick.role
            )));
        }
        if !seen.insert((pick.role.as_str(), pick.name.as_str())) {
            return Err(RosterFitError::InvalidSelection(format!(
                "{} selected twice for {}",
                pick.name, pick.role
            )));
        }
        match pick.hours {
            Some(h) if !h.is_finite() || h < 0.0 => {
                return Err(RosterFitError::InvalidSelection(format!(
                    "{} has invalid hours {}",
                    pick.name, h
                )));
            }
            Some(h) => *explicit.entry(pick.role.as_str()).or_insert(0.0) += h,
            None => *implicit.entry(pick.role.as_str()).or_insert(0) += 1,
        }
    }

    let mut allocation = ProjectAllocation::new();
    for pick in selections {
        let hours = match pick.hours {
            Some(h) => h,
            None => {
                let effort = f64::from(params.effort_for(&pick.role));
                let covered = explicit.get(pick.role.as_str()).copied().unwrap_or(0.0);
                let share = implicit.get(pick.role.as_str()).copied().unwrap_or(1).max(1);
                (effort - covered).max(0.0) / share as f64
            }
        };
        allocation.commit(pick.name.clone(), hours);
    }
    Ok(allocation)
}

// =============================================================================
// TESTS
// =============================================================================
