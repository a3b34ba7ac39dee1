//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use rosterfit_core::{
    ProjectParams, ProjectRanking, Roster, RosterFingerprint, RosterFitError, Selection, Session,
    SlotState, WeekRange, Workbook,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether a roster is loaded.
    pub roster_loaded: bool,
}

impl HealthResponse {
    #[must_use]
    pub fn ok(roster_loaded: bool) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            roster_loaded,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable category.
    pub kind: String,
    pub error: String,
}

/// An error rendered as a status code plus `ErrorResponse`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    /// No roster has been loaded yet.
    #[must_use]
    pub fn no_roster() -> Self {
        Self {
            status: StatusCode::CONFLICT,
            kind: "no_roster",
            message: "No roster loaded; POST /roster first".to_string(),
        }
    }

    /// Malformed request body or query.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            message: message.into(),
        }
    }
}

impl From<RosterFitError> for ApiError {
    fn from(err: RosterFitError) -> Self {
        use RosterFitError as E;
        let (status, kind) = match &err {
            E::Fetch { .. } => (StatusCode::BAD_GATEWAY, "fetch"),
            E::MissingTable(_)
            | E::MissingColumn { .. }
            | E::MalformedCell { .. }
            | E::DuplicatePerson(_)
            | E::InvalidRoster(_)
            | E::SerializationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "schema"),
            E::InvalidWeekRange { .. }
            | E::InvalidThreshold(_)
            | E::UnknownCluster(_)
            | E::InvalidProjectCount { .. }
            | E::InvalidTopN(_)
            | E::RoleNotRequested { .. }
            | E::InvalidSelection(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            E::InvalidPlan(_) => (StatusCode::BAD_REQUEST, "invalid_plan"),
            E::UnknownPerson(_) | E::ProjectOutOfRange { .. } => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            E::TruncationNotConfirmed { .. } => (StatusCode::CONFLICT, "truncation_not_confirmed"),
            E::InvalidState { .. } => (StatusCode::CONFLICT, "invalid_state"),
            E::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}: {}", self.kind, self.message);
        } else {
            tracing::debug!("{}: {}", self.kind, self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                kind: self.kind.to_string(),
                error: self.message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// ROSTER
// =============================================================================

/// Roster load request. Exactly one of `source` or `workbook` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadRosterRequest {
    /// Server-side path or http(s) link.
    pub source: Option<String>,
    /// Inline workbook.
    pub workbook: Option<Workbook>,
}

/// Overview of a loaded roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub fingerprint: Option<String>,
    pub people: usize,
    pub weeks: usize,
    pub first_week: Option<NaiveDate>,
    pub last_week: Option<NaiveDate>,
    /// Known clusters, sorted.
    pub clusters: Vec<String>,
    /// Known roles in display order.
    pub roles: Vec<String>,
    pub has_unknown_cluster: bool,
}

impl RosterSummary {
    #[must_use]
    pub fn from_roster(roster: &Roster, fingerprint: Option<&RosterFingerprint>) -> Self {
        Self {
            fingerprint: fingerprint.map(RosterFingerprint::to_hex),
            people: roster.len(),
            weeks: roster.weeks().len(),
            first_week: roster.weeks().first().copied(),
            last_week: roster.weeks().last().copied(),
            clusters: roster.clusters(),
            roles: roster.roles(),
            has_unknown_cluster: roster.has_unknown_cluster(),
        }
    }

    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self::from_roster(session.roster(), session.fingerprint())
    }
}

/// Roster load response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRosterResponse {
    /// True when the same file was already loaded and its session was kept.
    pub reused: bool,
    pub summary: RosterSummary,
}

/// Week count preview query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeksQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Week count preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeksResponse {
    pub range: WeekRange,
    /// Calendar weeks in the normalized range.
    pub calendar_weeks: u64,
    /// Roster weeks inside the range; this is what capacity is based on.
    pub roster_weeks: usize,
    pub weeks: Vec<NaiveDate>,
}

// =============================================================================
// PROJECTS
// =============================================================================

/// One project slot as seen over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub index: usize,
    pub label: String,
    pub state: SlotState,
    pub stale: bool,
    pub params: Option<ProjectParams>,
    pub ranking: Option<ProjectRanking>,
    pub selections: Vec<Selection>,
    /// Hours committed by this slot, per person.
    pub allocation: BTreeMap<String, f64>,
}

impl SlotView {
    pub fn from_session(session: &Session, index: usize) -> Result<Self, RosterFitError> {
        let slot = session.slot(index)?;
        let allocation = session
            .ledger()
            .entry(index)
            .map(|e| e.iter().map(|(n, h)| (n.to_string(), h)).collect())
            .unwrap_or_default();
        let label = slot
            .params()
            .map(|p| p.label(index))
            .unwrap_or_else(|| format!("Project {}", index + 1));

        Ok(Self {
            index,
            label,
            state: slot.state(),
            stale: slot.is_stale(),
            params: slot.params().cloned(),
            ranking: slot.ranking().cloned(),
            selections: slot.selections().to_vec(),
            allocation,
        })
    }
}

/// All project slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsResponse {
    pub count: usize,
    pub max_projects: usize,
    pub slots: Vec<SlotView>,
}

/// Project count change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub count: usize,
    /// Required when the change drops slots.
    #[serde(default)]
    pub confirm_truncation: bool,
}

/// Result of configuring a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub index: usize,
    pub state: SlotState,
}

/// Allocation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocateRequest {
    #[serde(default)]
    pub selections: Vec<Selection>,
}

/// Hours committed by one allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub index: usize,
    pub hours: BTreeMap<String, f64>,
    pub total: f64,
    /// Later slots whose rankings no longer reflect the ledger.
    pub stale: Vec<usize>,
}

/// Export query: one project (0-based) or all ranked projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub project: Option<usize>,
}
