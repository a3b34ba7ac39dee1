//! # Staffing Primitives
//!
//! Hardcoded constants for the rosterfit CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Callers may override the ones that are exposed through configuration
//! (`SessionConfig`, `LoaderConfig`); the rest are fixed by the staffing model.

/// Fixed weekly hour budget per person.
///
/// - capacity = weeks × `WEEKLY_HOUR_BUDGET`
pub const WEEKLY_HOUR_BUDGET: f64 = 40.0;

/// Number of candidates kept in each ranked list (preferred and overall).
pub const TOP_CANDIDATES: usize = 3;

/// Default minimum fit percentage when a caller does not supply one.
pub const DEFAULT_MIN_FIT_PCT: f64 = 80.0;

/// Upper bound of the fit threshold slider.
pub const MAX_MIN_FIT_PCT: f64 = 100.0;

/// Default number of project slots a session may hold.
pub const DEFAULT_MAX_PROJECTS: usize = 3;

/// Hard ceiling on configured project slots.
///
/// Keeps the ledger bounded even when `max_projects` comes from an
/// environment variable or a plan file.
pub const MAX_PROJECTS_LIMIT: usize = 32;

// =============================================================================
// WORKBOOK LAYOUT
// =============================================================================

/// Sheet holding the person → primary role mapping.
pub const DEFAULT_PEOPLE_SHEET: &str = "All Active Team Members - Consu";

/// Sheet holding the weekly hours time series.
pub const DEFAULT_TIMESHEET_SHEET: &str = "People Aggregated";

/// Spreadsheet row (0-based) holding the people sheet's headers.
pub const DEFAULT_PEOPLE_HEADER_ROW: usize = 0;

/// Spreadsheet row (0-based) holding the timesheet's headers. The rows above
/// it are report titles.
pub const DEFAULT_TIMESHEET_HEADER_ROW: usize = 4;

/// Person identity column in the people sheet.
pub const DEFAULT_NAME_COLUMN: &str = "Resource";

/// Primary role column in the people sheet.
pub const DEFAULT_ROLE_COLUMN: &str = "Primary Role";

/// Column in the timesheet that duplicates the role and is dropped on load.
pub const TIMESHEET_ROLE_COLUMN: &str = "Role";

/// Group labels in the timesheet's name column that are tier placeholders,
/// not people.
pub const EXCLUDED_PLACEHOLDER_NAMES: &[&str] = &[
    "Consultant",
    "Senior Consultant",
    "Associate",
    "Senior Associate",
    "Engagement Manager",
];

/// Cluster buckets removed from the roster after loading.
pub const EXCLUDED_CLUSTERS: &[&str] = &["Others"];

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of timesheet rows accepted from a workbook.
pub const MAX_ROSTER_ROWS: usize = 10_000;

/// Maximum number of week columns accepted from a workbook (20 years).
pub const MAX_WEEK_COLUMNS: usize = 1040;
