//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Project indexes in paths and queries are 0-based.

use super::{
    AppState,
    types::{
        AllocateRequest, AllocationResponse, ApiError, ConfigureResponse, ExportQuery,
        HealthResponse, LoadRosterRequest, LoadRosterResponse, ProjectsResponse, ResizeRequest,
        RosterSummary, SlotView, WeeksQuery, WeeksResponse,
    },
};
use crate::source::RosterSource;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use rosterfit_core::{
    Comparison, LoadedRoster, ProjectParams, ProjectRanking, ResizePreview, RosterFitError,
    Session, WeekRange,
    export::{ALL_PROJECTS_FILENAME, collect_records, export_csv, project_export},
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let loaded = state.session.read().await.is_some();
    Json(HealthResponse::ok(loaded))
}

// =============================================================================
// ROSTER HANDLERS
// =============================================================================

/// Load a roster and start a session over it.
///
/// Reloading the exact same source bytes keeps the current session.
pub async fn load_roster_handler(
    State(state): State<AppState>,
    Json(request): Json<LoadRosterRequest>,
) -> Result<Json<LoadRosterResponse>, ApiError> {
    let loaded: LoadedRoster = match (request.source, request.workbook) {
        (Some(source), None) => RosterSource::parse(&source).load(&state.loader).await?,
        (None, Some(workbook)) => {
            let bytes = serde_json::to_vec(&workbook)
                .map_err(|e| RosterFitError::SerializationError(e.to_string()))?;
            state.loader.load_bytes(&bytes)?
        }
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of 'source' or 'workbook' is required",
            ));
        }
    };

    let mut guard = state.session.write().await;
    if let Some(current) = guard
        .as_ref()
        .filter(|s| s.fingerprint() == Some(&loaded.fingerprint))
    {
        tracing::info!("Roster unchanged ({}), keeping session", loaded.fingerprint);
        return Ok(Json(LoadRosterResponse {
            reused: true,
            summary: RosterSummary::from_session(current),
        }));
    }

    let session = Session::from_loaded(loaded, state.config)?;
    let summary = RosterSummary::from_session(&session);
    tracing::info!(
        people = summary.people,
        weeks = summary.weeks,
        "New session started"
    );
    *guard = Some(session);

    Ok(Json(LoadRosterResponse {
        reused: false,
        summary,
    }))
}

/// Summary of the loaded roster.
pub async fn roster_handler(
    State(state): State<AppState>,
) -> Result<Json<RosterSummary>, ApiError> {
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or_else(ApiError::no_roster)?;
    Ok(Json(RosterSummary::from_session(session)))
}

/// How many roster weeks a date range covers.
pub async fn weeks_handler(
    State(state): State<AppState>,
    Query(query): Query<WeeksQuery>,
) -> Result<Json<WeeksResponse>, ApiError> {
    let range = WeekRange::new(query.start, query.end)?;
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or_else(ApiError::no_roster)?;
    let weeks = session.roster().weeks_in(&range);

    Ok(Json(WeeksResponse {
        range,
        calendar_weeks: range.calendar_weeks(),
        roster_weeks: weeks.len(),
        weeks,
    }))
}

// =============================================================================
// PROJECT HANDLERS
// =============================================================================

fn projects_response(session: &Session) -> Result<ProjectsResponse, RosterFitError> {
    let slots = (0..session.project_count())
        .map(|i| SlotView::from_session(session, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ProjectsResponse {
        count: session.project_count(),
        max_projects: session.config().max_projects,
        slots,
    })
}

/// All project slots.
pub async fn projects_handler(
    State(state): State<AppState>,
) -> Result<Json<ProjectsResponse>, ApiError> {
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or_else(ApiError::no_roster)?;
    Ok(Json(projects_response(session)?))
}

/// Change the project count. Dropping slots needs `confirm_truncation`.
pub async fn resize_handler(
    State(state): State<AppState>,
    Json(request): Json<ResizeRequest>,
) -> Result<Json<ResizePreview>, ApiError> {
    let mut guard = state.session.write().await;
    let session = guard.as_mut().ok_or_else(ApiError::no_roster)?;
    let preview = session.resize_projects(request.count, request.confirm_truncation)?;
    if preview.is_destructive() {
        tracing::warn!(
            "Project count {} -> {}: discarded slots {:?}",
            preview.from,
            preview.to,
            preview.discarded
        );
    }
    Ok(Json(preview))
}

/// Set a slot's parameters.
pub async fn configure_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(params): Json<ProjectParams>,
) -> Result<Json<ConfigureResponse>, ApiError> {
    let mut guard = state.session.write().await;
    let session = guard.as_mut().ok_or_else(ApiError::no_roster)?;
    let slot_state = session.configure(index, params)?;
    Ok(Json(ConfigureResponse {
        index,
        state: slot_state,
    }))
}

/// Rank a configured slot.
pub async fn rank_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<ProjectRanking>, ApiError> {
    let mut guard = state.session.write().await;
    let session = guard.as_mut().ok_or_else(ApiError::no_roster)?;
    let ranking = session.rank(index)?;
    tracing::debug!(index, roles = ranking.roles.len(), "Project ranked");
    Ok(Json(ranking))
}

/// Commit a ranked slot's picks to the ledger.
pub async fn allocate_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<AllocateRequest>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let mut guard = state.session.write().await;
    let session = guard.as_mut().ok_or_else(ApiError::no_roster)?;
    let allocation = session.allocate(index, request.selections)?;

    let stale: Vec<usize> = session
        .slots()
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_stale())
        .map(|(i, _)| i)
        .collect();
    tracing::info!(
        index,
        total = allocation.total(),
        "Allocation recorded"
    );

    Ok(Json(AllocationResponse {
        index,
        hours: allocation
            .iter()
            .map(|(n, h)| (n.to_string(), h))
            .collect(),
        total: allocation.total(),
        stale,
    }))
}

/// Compare one person against every role a slot requests.
pub async fn compare_handler(
    State(state): State<AppState>,
    Path((index, name)): Path<(usize, String)>,
) -> Result<Json<Comparison>, ApiError> {
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or_else(ApiError::no_roster)?;
    Ok(Json(session.compare(index, &name)?))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Ranked candidates as CSV: one project, or every ranked project.
pub async fn export_handler(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or_else(ApiError::no_roster)?;

    let (filename, records) = match query.project {
        Some(index) => project_export(session, index)?,
        None => (ALL_PROJECTS_FILENAME.to_string(), collect_records(session)),
    };
    tracing::info!("Exporting {} records as {}", records.len(), filename);

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    let body = export_csv(&records)?;
    Ok((headers, body))
}
