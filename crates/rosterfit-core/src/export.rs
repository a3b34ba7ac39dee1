//! # Result Export Module
//!
//! Flattens ranked projects into one record per (project, role, list,
//! candidate) and renders them as CSV.
//!
//! Indeterminate utilization (no roster weeks in range) is an empty cell,
//! never `0` or `NaN`.

use serde::{Deserialize, Serialize};

use crate::RosterFitError;
use crate::ranker::{Candidate, RoleRanking};
use crate::session::{ProjectRanking, Session};

/// File name used when every project is exported at once.
pub const ALL_PROJECTS_FILENAME: &str = "all_projects_suggestions.csv";

/// CSV header row.
pub const CSV_HEADER: [&str; 9] = [
    "Project",
    "Role",
    "List",
    "Name",
    "Cluster",
    "Free Hours",
    "Fit %",
    "Utilization %",
    "Anticipated Utilization %",
];

/// Which ranked list a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Preferred,
    Overall,
}

impl Pool {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Preferred => "Preferred",
            Self::Overall => "Overall",
        }
    }
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub project: String,
    pub role: String,
    pub pool: Pool,
    pub name: String,
    pub cluster: Option<String>,
    pub free_hours: f64,
    pub fit_pct: f64,
    pub utilization_pct: Option<f64>,
    pub anticipated_utilization_pct: Option<f64>,
}

impl ExportRecord {
    fn from_candidate(project: &str, pool: Pool, candidate: &Candidate) -> Self {
        Self {
            project: project.to_string(),
            role: candidate.role.clone(),
            pool,
            name: candidate.name.clone(),
            cluster: candidate.cluster.clone(),
            free_hours: candidate.free_hours,
            fit_pct: candidate.fit_pct,
            utilization_pct: candidate.utilization_pct,
            anticipated_utilization_pct: candidate.anticipated_utilization_pct,
        }
    }
}

fn role_records(project: &str, role: &RoleRanking) -> Vec<ExportRecord> {
    let preferred = role
        .preferred
        .candidates()
        .iter()
        .map(|c| ExportRecord::from_candidate(project, Pool::Preferred, c));
    let overall = role
        .overall
        .candidates()
        .iter()
        .map(|c| ExportRecord::from_candidate(project, Pool::Overall, c));
    preferred.chain(overall).collect()
}

/// Records of one ranking, roles in display order, preferred list first.
#[must_use]
pub fn ranking_records(ranking: &ProjectRanking) -> Vec<ExportRecord> {
    ranking
        .roles
        .iter()
        .flat_map(|role| role_records(&ranking.project, role))
        .collect()
}

/// Records of every ranked slot in the session, in slot order.
#[must_use]
pub fn collect_records(session: &Session) -> Vec<ExportRecord> {
    session
        .slots()
        .iter()
        .filter_map(|slot| slot.ranking())
        .flat_map(ranking_records)
        .collect()
}

/// Records of one slot, plus the file name it exports under.
pub fn project_export(
    session: &Session,
    index: usize,
) -> Result<(String, Vec<ExportRecord>), RosterFitError> {
    let slot = session.slot(index)?;
    let ranking = slot.ranking().ok_or(RosterFitError::InvalidState {
        index,
        state: slot.state(),
        expected: "candidates ranked",
    })?;
    let cluster = slot
        .params()
        .map(|p| p.preferred_cluster.as_str())
        .unwrap_or_default();
    Ok((
        export_filename(&ranking.project, cluster),
        ranking_records(ranking),
    ))
}

/// `{project}_{cluster}_suggestions.csv`, with anything outside
/// `[A-Za-z0-9._-]` replaced by `_`.
#[must_use]
pub fn export_filename(project: &str, cluster: &str) -> String {
    format!(
        "{}_{}_suggestions.csv",
        sanitize_component(project),
        sanitize_component(cluster)
    )
}

fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // No hidden files or parent-directory tricks.
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Render records as CSV with a header row and CRLF line endings.
pub fn export_csv(records: &[ExportRecord]) -> Result<String, RosterFitError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for r in records {
        writer
            .write_record([
                r.project.clone(),
                r.role.clone(),
                r.pool.label().to_string(),
                r.name.clone(),
                r.cluster.clone().unwrap_or_default(),
                number(Some(r.free_hours)),
                number(Some(r.fit_pct)),
                number(r.utilization_pct),
                number(r.anticipated_utilization_pct),
            ])
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| RosterFitError::IoError(format!("CSV flush failed: {}", e.error())))?;
    String::from_utf8(bytes).map_err(|e| RosterFitError::SerializationError(e.to_string()))
}

fn csv_error(err: csv::Error) -> RosterFitError {
    RosterFitError::SerializationError(format!("CSV: {}", err))
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => String::new(),
    }
}
