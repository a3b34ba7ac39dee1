//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, RosterSummary};
use crate::config::{self, Plan};
use crate::source::RosterSource;
use chrono::NaiveDate;
use rosterfit_core::{
    Comparison, ProjectRanking, RosterFitError, RosterLoader, Session, Shortlist, WeekRange,
    export::{export_csv, project_export},
};
use std::path::Path;

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(
    host: &str,
    port: u16,
    roster: Option<&RosterSource>,
    max_projects: Option<usize>,
) -> Result<(), RosterFitError> {
    let session_config = config::session_config(max_projects)?;
    let loader = RosterLoader::default();
    let state = AppState::new(loader.clone(), session_config);

    if let Some(source) = roster {
        let loaded = source.load(&loader).await?;
        *state.session.write().await = Some(Session::from_loaded(loaded, session_config)?);
    }

    println!("rosterfit server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:         {}", host);
    println!("  Port:         {}", port);
    println!("  Max projects: {}", session_config.max_projects);
    match roster {
        Some(source) => println!("  Roster:       {}", source),
        None => println!("  Roster:       (none, POST /roster to load)"),
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /health                          - Health check");
    println!("  POST /roster                          - Load a roster");
    println!("  GET  /roster                          - Roster summary");
    println!("  GET  /roster/weeks?start=..&end=..    - Week count preview");
    println!("  GET  /projects                        - Project slots");
    println!("  PUT  /projects/count                  - Change project count");
    println!("  PUT  /projects/{{index}}                - Set project parameters");
    println!("  POST /projects/{{index}}/rank           - Rank candidates");
    println!("  POST /projects/{{index}}/allocate       - Commit picks");
    println!("  GET  /projects/{{index}}/compare/{{name}} - Compare a person");
    println!("  GET  /export[?project=N]              - CSV export");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Summarize a roster, optionally previewing the weeks a range covers.
pub async fn cmd_inspect(
    source: &RosterSource,
    range: Option<(NaiveDate, NaiveDate)>,
    json_mode: bool,
) -> Result<(), RosterFitError> {
    let loaded = source.load(&RosterLoader::default()).await?;
    let summary = RosterSummary::from_roster(&loaded.roster, Some(&loaded.fingerprint));

    let preview = match range {
        Some((start, end)) => {
            let range = WeekRange::new(start, end)?;
            Some((range, loaded.roster.weeks_in(&range).len()))
        }
        None => None,
    };

    if json_mode {
        let output = serde_json::json!({
            "source": source.to_string(),
            "summary": summary,
            "preview": preview.map(|(range, weeks)| serde_json::json!({
                "range": range,
                "calendar_weeks": range.calendar_weeks(),
                "roster_weeks": weeks,
            })),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Roster Summary");
    println!("==============");
    println!("Source:      {}", source);
    println!("Fingerprint: {}", loaded.fingerprint);
    println!();
    println!("People: {}", summary.people);
    match (summary.first_week, summary.last_week) {
        (Some(first), Some(last)) => {
            println!("Weeks:  {} ({} to {})", summary.weeks, first, last);
        }
        _ => println!("Weeks:  0"),
    }
    println!();
    println!("Clusters: {}", summary.clusters.join(", "));
    if summary.has_unknown_cluster {
        println!("          (some people have no cluster)");
    }
    println!("Roles:    {}", summary.roles.join(", "));

    if let Some((range, weeks)) = preview {
        println!();
        println!(
            "Range {}: {} calendar weeks, {} roster weeks",
            range,
            range.calendar_weeks(),
            weeks
        );
        if weeks == 0 {
            println!("  No roster weeks in range: utilization will be indeterminate.");
        }
    }

    Ok(())
}

// =============================================================================
// PLAN EXECUTION
// =============================================================================

/// Load a plan's roster and open a session sized for it.
async fn open_plan(
    plan_path: &Path,
    roster_override: Option<&str>,
) -> Result<(Plan, Session), RosterFitError> {
    let plan = Plan::load(plan_path)?;
    if plan.projects.is_empty() {
        return Err(RosterFitError::InvalidPlan(format!(
            "Plan {} has no [[project]] entries",
            plan_path.display()
        )));
    }

    let source = plan.roster_source(roster_override)?;
    let loaded = source.load(&RosterLoader::new(plan.loader.clone())).await?;
    let mut session = Session::from_loaded(loaded, plan.session_config()?)?;
    session.resize_projects(plan.projects.len(), false)?;
    Ok((plan, session))
}

/// Rank the first `upto` projects in order, committing each one's selections
/// before the next is ranked.
fn run_plan(
    plan: &Plan,
    session: &mut Session,
    upto: usize,
) -> Result<Vec<ProjectRanking>, RosterFitError> {
    let mut rankings = Vec::with_capacity(upto);
    for (index, project) in plan.projects.iter().enumerate().take(upto) {
        let params = project.to_params(&plan.defaults, index)?;
        let ranking = session.rank_with(index, params)?;
        tracing::debug!(index, roles = ranking.roles.len(), "Project ranked");

        if !project.selections.is_empty() {
            let allocation = session.allocate(index, project.selections.clone())?;
            tracing::info!(
                "{}: committed {:.1}h across {} people",
                ranking.project,
                allocation.total(),
                allocation.iter().count()
            );
        }
        rankings.push(ranking);
    }
    Ok(rankings)
}

// =============================================================================
// SUGGEST COMMAND
// =============================================================================

/// Run a plan and print ranked candidates per project.
pub async fn cmd_suggest(
    plan_path: &Path,
    roster_override: Option<&str>,
    export_dir: Option<&Path>,
    json_mode: bool,
) -> Result<(), RosterFitError> {
    let (plan, mut session) = open_plan(plan_path, roster_override).await?;
    let rankings = run_plan(&plan, &mut session, plan.projects.len())?;

    if let Some(dir) = export_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| RosterFitError::IoError(format!("Create {}: {}", dir.display(), e)))?;
        for index in 0..rankings.len() {
            let (filename, records) = project_export(&session, index)?;
            let path = dir.join(&filename);
            let csv = export_csv(&records)?;
            std::fs::write(&path, csv)
                .map_err(|e| RosterFitError::IoError(format!("Write {}: {}", path.display(), e)))?;
            if !json_mode {
                println!("Exported {} records to {}", records.len(), path.display());
            }
        }
    }

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&rankings).unwrap_or_default()
        );
        return Ok(());
    }

    for ranking in &rankings {
        print_ranking(ranking);
    }
    Ok(())
}

fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v))
}

fn print_shortlist(title: &str, list: &Shortlist) {
    println!("    {}:", title);
    match list {
        Shortlist::NoCandidates => println!("      (no candidates meet the threshold)"),
        Shortlist::Candidates(candidates) => {
            for c in candidates {
                println!(
                    "      {:<24} {:<14} free {:>7.1}h  fit {:>6.1}%  util {} -> {}",
                    c.name,
                    c.cluster.as_deref().unwrap_or("-"),
                    c.free_hours,
                    c.fit_pct,
                    fmt_pct(c.utilization_pct),
                    fmt_pct(c.anticipated_utilization_pct)
                );
            }
        }
    }
}

fn print_ranking(ranking: &ProjectRanking) {
    println!();
    println!("{}", ranking.project);
    println!("{}", "=".repeat(ranking.project.chars().count()));
    println!(
        "Range: {} ({} roster weeks), min fit {:.0}%",
        ranking.range, ranking.weeks, ranking.min_fit_pct
    );
    if ranking.roles.is_empty() {
        println!("  No roles requested.");
    }
    for role in &ranking.roles {
        println!();
        println!("  {} ({}h)", role.role, role.effort);
        print_shortlist(&format!("Preferred ({})", role.preferred_cluster), &role.preferred);
        print_shortlist("Overall", &role.overall);
    }
}

// =============================================================================
// COMPARE COMMAND
// =============================================================================

/// Compare one person against a planned project's roles.
///
/// Every earlier project in the plan is ranked and committed first.
pub async fn cmd_compare(
    plan_path: &Path,
    roster_override: Option<&str>,
    project: usize,
    name: &str,
    json_mode: bool,
) -> Result<(), RosterFitError> {
    let (plan, mut session) = open_plan(plan_path, roster_override).await?;
    if project == 0 || project > plan.projects.len() {
        return Err(RosterFitError::ProjectOutOfRange {
            index: project.saturating_sub(1),
            count: plan.projects.len(),
        });
    }
    let index = project - 1;
    run_plan(&plan, &mut session, project)?;
    let comparison = session.compare(index, name)?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&comparison).unwrap_or_default()
        );
        return Ok(());
    }

    print_comparison(&comparison);
    Ok(())
}

fn print_comparison(cmp: &Comparison) {
    println!("{} (project {})", cmp.name, cmp.index + 1);
    println!(
        "  Cluster: {}   Role: {}",
        cmp.cluster.as_deref().unwrap_or("-"),
        cmp.role.as_deref().unwrap_or("-")
    );
    println!(
        "  Capacity {:.1}h, assigned {:.1}h, free {:.1}h, utilization {}",
        cmp.capacity_hours,
        cmp.assigned_hours,
        cmp.free_hours,
        fmt_pct(cmp.utilization_pct)
    );
    println!();
    for p in &cmp.projections {
        println!(
            "  {:<28} {:>5}h  -> {}",
            p.role,
            p.effort,
            fmt_pct(p.anticipated_utilization_pct)
        );
    }
    println!(
        "  {:<28} {:>5}h  -> {}",
        "All roles together",
        cmp.cumulative_effort,
        fmt_pct(cmp.cumulative_anticipated_utilization_pct)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_formatting() {
        assert_eq!(fmt_pct(Some(87.5)), "87.5%");
        assert_eq!(fmt_pct(None), "n/a");
    }

    #[tokio::test]
    async fn plan_without_projects_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "roster = \"roster.json\"\n").expect("write plan");

        let result = open_plan(&path, None).await;
        assert!(matches!(result, Err(RosterFitError::InvalidPlan(_))));
    }
}
