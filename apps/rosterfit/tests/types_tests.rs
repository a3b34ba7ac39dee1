//! Tests for API types, plan files and roster sources.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use rosterfit::api::{
    AllocateRequest, ApiError, ExportQuery, HealthResponse, LoadRosterRequest, ResizeRequest,
};
use rosterfit::config::Plan;
use rosterfit::source::RosterSource;
use rosterfit_core::primitives::{DEFAULT_PEOPLE_SHEET, DEFAULT_TIMESHEET_SHEET};
use rosterfit_core::{RosterFitError, RosterLoader, SlotState};
use serde_json::json;
use std::io::Write;

// =============================================================================
// API TYPES
// =============================================================================

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse::ok(true);
    let json = serde_json::to_value(&health).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["roster_loaded"], true);
    assert!(json["version"].is_string());
}

#[test]
fn test_resize_request_defaults_to_unconfirmed() {
    let request: ResizeRequest = serde_json::from_str(r#"{"count": 2}"#).unwrap();
    assert_eq!(request.count, 2);
    assert!(!request.confirm_truncation);
}

#[test]
fn test_load_request_fields_optional() {
    let request: LoadRosterRequest = serde_json::from_str("{}").unwrap();
    assert!(request.source.is_none());
    assert!(request.workbook.is_none());

    let request: LoadRosterRequest =
        serde_json::from_str(r#"{"source": "https://example.com/roster.json"}"#).unwrap();
    assert_eq!(
        request.source.as_deref(),
        Some("https://example.com/roster.json")
    );
}

#[test]
fn test_allocate_request_hours_optional() {
    let request: AllocateRequest = serde_json::from_value(json!({
        "selections": [
            { "role": "Analyst", "name": "Ana" },
            { "role": "Analyst", "name": "Ben", "hours": 12.5 }
        ]
    }))
    .unwrap();

    assert_eq!(request.selections.len(), 2);
    assert_eq!(request.selections[0].hours, None);
    assert_eq!(request.selections[1].hours, Some(12.5));

    let empty: AllocateRequest = serde_json::from_str("{}").unwrap();
    assert!(empty.selections.is_empty());
}

#[test]
fn test_export_query_project_optional() {
    let all: ExportQuery = serde_json::from_str("{}").unwrap();
    assert_eq!(all.project, None);

    let one: ExportQuery = serde_json::from_str(r#"{"project": 1}"#).unwrap();
    assert_eq!(one.project, Some(1));
}

#[test]
fn test_slot_state_snake_case() {
    let json = serde_json::to_string(&SlotState::CandidatesRanked).unwrap();
    assert_eq!(json, r#""candidates_ranked""#);
}

#[test]
fn test_api_error_status_mapping() {
    let cases = [
        (
            RosterFitError::Fetch {
                origin: "x".to_string(),
                reason: "down".to_string(),
            },
            StatusCode::BAD_GATEWAY,
            "fetch",
        ),
        (
            RosterFitError::MissingTable("People".to_string()),
            StatusCode::UNPROCESSABLE_ENTITY,
            "schema",
        ),
        (
            RosterFitError::InvalidThreshold(120.0),
            StatusCode::BAD_REQUEST,
            "invalid_input",
        ),
        (
            RosterFitError::UnknownPerson("Zed".to_string()),
            StatusCode::NOT_FOUND,
            "not_found",
        ),
        (
            RosterFitError::TruncationNotConfirmed {
                from: 3,
                to: 1,
                discarded: vec![1, 2],
            },
            StatusCode::CONFLICT,
            "truncation_not_confirmed",
        ),
        (
            RosterFitError::InvalidPlan("no projects".to_string()),
            StatusCode::BAD_REQUEST,
            "invalid_plan",
        ),
        (
            RosterFitError::InvalidTopN(0),
            StatusCode::BAD_REQUEST,
            "invalid_input",
        ),
        (
            RosterFitError::IoError("disk".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "io",
        ),
    ];

    for (err, status, kind) in cases {
        let message = err.to_string();
        let api = ApiError::from(err);
        assert_eq!(api.status, status, "{}", message);
        assert_eq!(api.kind, kind);
        assert_eq!(api.message, message);
    }
}

#[test]
fn test_no_roster_is_conflict() {
    let err = ApiError::no_roster();
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.kind, "no_roster");
}

// =============================================================================
// PLAN FILES
// =============================================================================

#[test]
fn test_plan_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
roster = "roster.json"

[defaults]
preferred_cluster = "X"

[[project]]
name = "Apollo"
start = "2024-01-01"
end = "2024-01-14"
efforts = {{ "Analyst" = 40 }}
"#
    )
    .unwrap();

    let plan = Plan::load(file.path()).unwrap();
    assert_eq!(plan.projects.len(), 1);

    let params = plan.projects[0].to_params(&plan.defaults, 0).unwrap();
    assert_eq!(params.preferred_cluster, "X");
    assert_eq!(params.effort_for("Analyst"), 40);
    assert_eq!(
        plan.roster_source(None).unwrap(),
        RosterSource::File("roster.json".into())
    );
}

#[test]
fn test_plan_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Plan::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(RosterFitError::IoError(_))));
}

#[test]
fn test_plan_too_large_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let padding = "#".repeat(1024);
    for _ in 0..1100 {
        writeln!(file, "{}", padding).unwrap();
    }
    let result = Plan::load(file.path());
    assert!(matches!(result, Err(RosterFitError::InvalidPlan(_))));
}

#[test]
fn test_plan_dates_must_be_strings() {
    // Bare TOML dates are not accepted; the plan format quotes them.
    let result = Plan::from_toml_str(
        r#"
[[project]]
start = 2024-01-01
end = 2024-01-14
preferred_cluster = "X"
"#,
    );
    assert!(result.is_err());
}

// =============================================================================
// ROSTER SOURCES
// =============================================================================

#[tokio::test]
async fn test_file_source_loads_workbook() {
    let workbook = json!({
        "sheets": {
            DEFAULT_PEOPLE_SHEET: {
                "columns": ["Resource", "Primary Role"],
                "rows": [["Ana", "Analyst"]]
            },
            DEFAULT_TIMESHEET_SHEET: {
                "columns": ["Cluster", "Resource", "Role", "2024-01-01"],
                "rows": [["X", "Ana", "Analyst", 8]]
            }
        }
    });
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(workbook.to_string().as_bytes()).unwrap();

    let source = RosterSource::parse(&file.path().to_string_lossy());
    let loaded = source.load(&RosterLoader::default()).await.unwrap();

    assert_eq!(loaded.roster.len(), 1);
    assert_eq!(loaded.roster.weeks().len(), 1);
    let ana = loaded.roster.person("Ana").unwrap();
    assert_eq!(ana.cluster.as_deref(), Some("X"));
    assert_eq!(ana.role.as_deref(), Some("Analyst"));
}

#[tokio::test]
async fn test_file_source_rejects_bad_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not json").unwrap();

    let source = RosterSource::parse(&file.path().to_string_lossy());
    let result = source.load(&RosterLoader::default()).await;
    assert!(matches!(result, Err(RosterFitError::SerializationError(_))));
}
