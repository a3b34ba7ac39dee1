//! # Plan Configuration
//!
//! TOML plan files describing a multi-project staffing pass, plus the
//! environment overrides shared by the CLI and the server.
//!
//! ```toml
//! roster = "data/roster.json"      # path or http(s) link
//!
//! [defaults]
//! min_fit_pct = 80
//! preferred_cluster = "Data"
//! max_projects = 3
//!
//! [[project]]
//! name = "Apollo"
//! start = "2024-01-01"
//! end = "2024-02-25"
//! efforts = { "Analyst" = 120, "Senior Analyst" = 60 }
//! selections = [{ role = "Analyst", name = "Ana Lima" }]
//! ```
//!
//! Dates are quoted `YYYY-MM-DD` strings. Projects run in file order; each
//! one's selections are committed before the next is ranked.
//!
//! ## Environment Variables
//!
//! - `ROSTERFIT_MAX_PROJECTS`: project count ceiling when neither the CLI nor
//!   the plan sets one (1..=32, default 3)

use chrono::NaiveDate;
use rosterfit_core::primitives::{DEFAULT_MIN_FIT_PCT, MAX_PROJECTS_LIMIT};
use rosterfit_core::{LoaderConfig, ProjectParams, RosterFitError, Selection, SessionConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::source::RosterSource;

/// Environment variable overriding the project count ceiling.
pub const MAX_PROJECTS_ENV: &str = "ROSTERFIT_MAX_PROJECTS";

/// Maximum plan file size (1 MB).
const MAX_PLAN_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// PLAN
// =============================================================================

/// Values applied to every project that does not set its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanDefaults {
    pub min_fit_pct: Option<f64>,
    pub preferred_cluster: Option<String>,
    pub max_projects: Option<usize>,
}

/// One `[[project]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanProject {
    #[serde(default)]
    pub name: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub min_fit_pct: Option<f64>,
    #[serde(default)]
    pub preferred_cluster: Option<String>,
    #[serde(default)]
    pub efforts: BTreeMap<String, u32>,
    #[serde(default)]
    pub selections: Vec<Selection>,
}

impl PlanProject {
    /// Resolve against the plan defaults.
    pub fn to_params(
        &self,
        defaults: &PlanDefaults,
        index: usize,
    ) -> Result<ProjectParams, RosterFitError> {
        let cluster = self
            .preferred_cluster
            .clone()
            .or_else(|| defaults.preferred_cluster.clone())
            .ok_or_else(|| {
                RosterFitError::InvalidPlan(format!(
                    "project {} has no preferred_cluster and no default is set",
                    index + 1
                ))
            })?;
        let min_fit = self
            .min_fit_pct
            .or(defaults.min_fit_pct)
            .unwrap_or(DEFAULT_MIN_FIT_PCT);

        let mut params = ProjectParams::new(self.start, self.end, cluster).with_min_fit(min_fit);
        params.name = self.name.clone();
        params.efforts = self.efforts.clone();
        Ok(params)
    }
}

/// A staffing plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Roster path or link. May be overridden on the command line.
    #[serde(default)]
    pub roster: Option<String>,
    #[serde(default)]
    pub defaults: PlanDefaults,
    /// Sheet layout; the standard export layout when omitted.
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default, rename = "project")]
    pub projects: Vec<PlanProject>,
}

impl Plan {
    /// Parse a plan from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, RosterFitError> {
        toml::from_str(text).map_err(|e| RosterFitError::SerializationError(format!("Plan: {}", e)))
    }

    /// Read and parse a plan file.
    pub fn load(path: &Path) -> Result<Self, RosterFitError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| RosterFitError::IoError(format!("Cannot read plan metadata: {}", e)))?;
        if metadata.len() > MAX_PLAN_FILE_SIZE {
            return Err(RosterFitError::InvalidPlan(format!(
                "Plan size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_PLAN_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| RosterFitError::IoError(format!("Read plan: {}", e)))?;
        Self::from_toml_str(&text)
    }

    /// Roster source: the explicit override, else the plan's own entry.
    pub fn roster_source(&self, explicit: Option<&str>) -> Result<RosterSource, RosterFitError> {
        explicit
            .or(self.roster.as_deref())
            .map(RosterSource::parse)
            .ok_or_else(|| {
                RosterFitError::InvalidPlan(
                    "no roster given on the command line or in the plan".to_string(),
                )
            })
    }

    /// Session limits for this plan. At least as many slots as projects.
    pub fn session_config(&self) -> Result<SessionConfig, RosterFitError> {
        let max = resolve_max_projects(self.defaults.max_projects)?.max(self.projects.len());
        session_config(Some(max))
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// `ROSTERFIT_MAX_PROJECTS`, if set and numeric.
#[must_use]
pub fn max_projects_from_env() -> Option<usize> {
    let raw = std::env::var(MAX_PROJECTS_ENV).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!("{}='{}' ignored: {}", MAX_PROJECTS_ENV, raw, e);
            None
        }
    }
}

/// Explicit value, else environment, else the default.
pub fn resolve_max_projects(explicit: Option<usize>) -> Result<usize, RosterFitError> {
    let max = explicit
        .or_else(max_projects_from_env)
        .unwrap_or(SessionConfig::default().max_projects);
    if max == 0 || max > MAX_PROJECTS_LIMIT {
        return Err(RosterFitError::InvalidProjectCount {
            requested: max,
            max: MAX_PROJECTS_LIMIT,
        });
    }
    Ok(max)
}

/// Session limits with the resolved project ceiling.
pub fn session_config(explicit_max: Option<usize>) -> Result<SessionConfig, RosterFitError> {
    Ok(SessionConfig {
        max_projects: resolve_max_projects(explicit_max)?,
        ..SessionConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
roster = "roster.json"

[defaults]
min_fit_pct = 70
preferred_cluster = "Data"

[[project]]
name = "Apollo"
start = "2024-01-01"
end = "2024-01-14"
efforts = { "Analyst" = 40 }
selections = [{ role = "Analyst", name = "Ana", hours = 20.0 }]

[[project]]
start = "2024-02-01"
end = "2024-02-29"
preferred_cluster = "Ops"
min_fit_pct = 90
"#;

    #[test]
    fn parses_projects_in_order() {
        let plan = Plan::from_toml_str(PLAN).expect("parse");
        assert_eq!(plan.projects.len(), 2);
        assert_eq!(plan.projects[0].name.as_deref(), Some("Apollo"));
        assert_eq!(plan.projects[0].selections[0].hours, Some(20.0));
        assert_eq!(plan.loader, LoaderConfig::default());
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let plan = Plan::from_toml_str(PLAN).expect("parse");
        let first = plan.projects[0]
            .to_params(&plan.defaults, 0)
            .expect("params");
        assert_eq!(first.preferred_cluster, "Data");
        assert_eq!(first.min_fit_pct, 70.0);
        assert_eq!(first.effort_for("Analyst"), 40);

        let second = plan.projects[1]
            .to_params(&plan.defaults, 1)
            .expect("params");
        assert_eq!(second.preferred_cluster, "Ops");
        assert_eq!(second.min_fit_pct, 90.0);
        assert_eq!(second.label(1), "Project 2");
    }

    #[test]
    fn missing_cluster_is_error() {
        let plan = Plan::from_toml_str(
            r#"
[[project]]
start = "2024-01-01"
end = "2024-01-07"
"#,
        )
        .expect("parse");
        assert!(matches!(
            plan.projects[0].to_params(&plan.defaults, 0),
            Err(RosterFitError::InvalidPlan(_))
        ));
    }

    #[test]
    fn roster_override_wins() {
        let plan = Plan::from_toml_str(PLAN).expect("parse");
        assert_eq!(
            plan.roster_source(Some("https://host/r.json")).expect("source"),
            RosterSource::Url("https://host/r.json".to_string())
        );
        assert_eq!(
            plan.roster_source(None).expect("source"),
            RosterSource::File("roster.json".into())
        );
        assert!(matches!(
            Plan::default().roster_source(None),
            Err(RosterFitError::InvalidPlan(_))
        ));
    }

    #[test]
    fn invalid_toml_rejected() {
        assert!(matches!(
            Plan::from_toml_str("[[project]]\nstart = 5"),
            Err(RosterFitError::SerializationError(_))
        ));
    }

    #[test]
    fn explicit_max_projects_validated() {
        assert_eq!(resolve_max_projects(Some(5)).expect("max"), 5);
        assert!(resolve_max_projects(Some(0)).is_err());
        assert!(resolve_max_projects(Some(MAX_PROJECTS_LIMIT + 1)).is_err());
    }
}
