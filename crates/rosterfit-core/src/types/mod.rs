//! # Core Type Definitions
//!
//! This module contains the shared types of the rosterfit CORE:
//! - Person records (`Person`)
//! - Error types (`RosterFitError`)
//!
//! ## Numeric Model
//!
//! Hours are `f64` and always finite and non-negative inside a loaded roster.
//! Week keys are `chrono::NaiveDate` week-start dates and order naturally, so
//! per-person hours live in a `BTreeMap` for deterministic iteration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::calendar::WeekRange;
use crate::session::SlotState;

// =============================================================================
// PERSON
// =============================================================================

/// A person on the roster.
///
/// Cluster and role are optional: a timesheet row without a cluster label, or
/// a person missing from the role mapping, is carried as "unknown" rather than
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Identity, unique within a roster.
    pub name: String,
    /// Group tag used as the preferred pool during ranking.
    pub cluster: Option<String>,
    /// Primary role (category label). Matched case-sensitively.
    pub role: Option<String>,
    /// Hours worked per week-start date.
    pub hours: BTreeMap<NaiveDate, f64>,
}

impl Person {
    /// Create a person with no cluster, no role and no hours.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster: None,
            role: None,
            hours: BTreeMap::new(),
        }
    }

    /// Set the cluster.
    #[must_use]
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Set the role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Record the hours for one week.
    #[must_use]
    pub fn with_hours(mut self, week: NaiveDate, hours: f64) -> Self {
        self.hours.insert(week, hours);
        self
    }

    /// Hours recorded for a week (0 when the cell is empty).
    #[must_use]
    pub fn hours_for(&self, week: NaiveDate) -> f64 {
        self.hours.get(&week).copied().unwrap_or(0.0)
    }

    /// Sum of hours across the weeks inside `range`.
    #[must_use]
    pub fn hours_in(&self, range: &WeekRange) -> f64 {
        self.hours
            .range(range.start()..=range.end())
            .map(|(_, h)| *h)
            .sum()
    }

    /// Whether the person's role is exactly `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    /// Whether the person belongs to `cluster`.
    ///
    /// A person with an unknown cluster never belongs to a named cluster.
    #[must_use]
    pub fn in_cluster(&self, cluster: &str) -> bool {
        self.cluster.as_deref() == Some(cluster)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the rosterfit system.
///
/// - No silent failures
/// - Use `Result<T, RosterFitError>` for fallible operations
/// - The CORE never panics; all errors are recoverable
///
/// A zero effort or a zero-week range is NOT an error: the former drops the
/// role from ranking, the latter yields NaN utilization.
#[derive(Debug, Error)]
pub enum RosterFitError {
    /// The roster source could not be read (file or network).
    #[error("Failed to fetch roster from {origin}: {reason}")]
    Fetch { origin: String, reason: String },

    /// The workbook does not contain an expected table.
    #[error("Schema error: missing table '{0}'")]
    MissingTable(String),

    /// A table is present but lacks an expected column.
    #[error("Schema error: table '{table}' is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    /// A cell could not be interpreted.
    #[error("Schema error: table '{table}', row {row}, column '{column}': {reason}")]
    MalformedCell {
        table: String,
        row: usize,
        column: String,
        reason: String,
    },

    /// The same person appears twice in the timesheet.
    #[error("Duplicate person in roster: {0}")]
    DuplicatePerson(String),

    /// The roster violates a structural invariant.
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    /// Start falls after end once both are snapped to week boundaries.
    #[error("Invalid week range: {start} is after {end}")]
    InvalidWeekRange { start: NaiveDate, end: NaiveDate },

    /// Minimum fit percentage outside 0..=100.
    #[error("Invalid minimum fit percentage: {0} (expected 0-100)")]
    InvalidThreshold(f64),

    /// The preferred cluster is not present in the roster.
    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),

    /// The named person is not on the roster.
    #[error("Unknown person: {0}")]
    UnknownPerson(String),

    /// Project slot index past the current project count.
    #[error("Project {index} out of range (project count is {count})")]
    ProjectOutOfRange { index: usize, count: usize },

    /// Requested project count outside 1..=max.
    #[error("Invalid project count {requested} (allowed 1-{max})")]
    InvalidProjectCount { requested: usize, max: usize },

    /// Shortlist length of zero.
    #[error("Invalid shortlist length {0} (must be at least 1)")]
    InvalidTopN(usize),

    /// Shrinking the project count would discard slots and the caller did not confirm.
    #[error(
        "Reducing project count from {from} to {to} discards projects {discarded:?}; confirmation required"
    )]
    TruncationNotConfirmed {
        from: usize,
        to: usize,
        discarded: Vec<usize>,
    },

    /// The operation is not valid in the slot's current state.
    #[error("Project {index} is {state}; expected {expected}")]
    InvalidState {
        index: usize,
        state: SlotState,
        expected: &'static str,
    },

    /// A selection names a role the project does not request.
    #[error("Role '{role}' is not requested by project {index}")]
    RoleNotRequested { index: usize, role: String },

    /// A selection is malformed (duplicate entry, off-role pick, negative hours).
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// A plan file parsed but its content cannot be used.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
