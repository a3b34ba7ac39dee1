//! # Ingestor Module
//!
//! Roster loading from a tabular workbook.
//!
//! A workbook is a set of named sheets, each a header row plus data rows of
//! JSON cells. It arrives either as JSON or as an xlsx file; xlsx sheets are
//! read with calamine, starting at a configured header row, and date-typed
//! header cells are rendered as `YYYY-MM-DD`. Two sheets are read:
//!
//! - the people sheet maps a person (`Resource`) to a `Primary Role`
//! - the timesheet has the cluster in column 0, the person in column 1, and
//!   one column per week whose header is a date
//!
//! The timesheet is left-joined to the people sheet on the person's name, so
//! every timesheet row survives and people without a mapping get an unknown
//! role. Placeholder tier rows and excluded clusters are dropped before the
//! join.
//!
//! Week columns are discovered here, once, from the headers. Everything
//! downstream works from the typed `Roster::weeks()` list.

use calamine::{Data, DataType, Range, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Cursor;

use crate::primitives::{
    DEFAULT_NAME_COLUMN, DEFAULT_PEOPLE_HEADER_ROW, DEFAULT_PEOPLE_SHEET, DEFAULT_ROLE_COLUMN,
    DEFAULT_TIMESHEET_HEADER_ROW, DEFAULT_TIMESHEET_SHEET, EXCLUDED_CLUSTERS,
    EXCLUDED_PLACEHOLDER_NAMES, MAX_ROSTER_ROWS, MAX_WEEK_COLUMNS, TIMESHEET_ROLE_COLUMN,
};

/// Local file header signature that opens every xlsx (zip) file.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
use crate::{Person, Roster, RosterFitError};

// =============================================================================
// WORKBOOK
// =============================================================================

/// One sheet: a header row and data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    /// Sheet with the given headers and no rows.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    #[must_use]
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == name)
    }
}

/// A workbook: sheets by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    /// Empty workbook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sheet.
    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, sheet: Sheet) -> Self {
        self.sheets.insert(name.into(), sheet);
        self
    }

    /// Parse a workbook from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RosterFitError> {
        serde_json::from_slice(bytes)
            .map_err(|e| RosterFitError::SerializationError(format!("Workbook: {}", e)))
    }

    /// Read sheets from xlsx bytes.
    ///
    /// `sheets` pairs each wanted sheet name with the 0-based spreadsheet row
    /// holding its headers. Rows above the header row are skipped. Sheets the
    /// file lacks are left out, so the loader reports them as missing tables.
    pub fn from_xlsx(bytes: &[u8], sheets: &[(&str, usize)]) -> Result<Self, RosterFitError> {
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| RosterFitError::SerializationError(format!("Workbook: {}", e)))?;
        let available = xlsx.sheet_names();

        let mut workbook = Self::new();
        for (name, header_row) in sheets {
            if !available.iter().any(|s| s.as_str() == *name) {
                continue;
            }
            let range = xlsx
                .worksheet_range(name)
                .map_err(|e| RosterFitError::SerializationError(format!("Sheet '{}': {}", name, e)))?;
            workbook
                .sheets
                .insert((*name).to_string(), sheet_from_range(&range, *header_row));
        }
        Ok(workbook)
    }

    fn sheet(&self, name: &str) -> Result<&Sheet, RosterFitError> {
        self.sheets
            .get(name)
            .ok_or_else(|| RosterFitError::MissingTable(name.to_string()))
    }
}

/// Convert a used cell range into a sheet whose headers sit on `header_row`.
///
/// Cells keep their absolute column positions: a range that starts past
/// column A is padded with empty cells on the left.
fn sheet_from_range(range: &Range<Data>, header_row: usize) -> Sheet {
    let Some((first_row, first_col)) = range.start() else {
        return Sheet::default();
    };
    let (first_row, pad) = (first_row as usize, first_col as usize);

    let mut rows = range.rows();
    let mut columns = Vec::new();
    if header_row >= first_row {
        if let Some(cells) = rows.nth(header_row - first_row) {
            columns = vec![String::new(); pad];
            columns.extend(cells.iter().map(|c| text_cell(&xlsx_cell(c)).unwrap_or_default()));
        }
    }

    let rows = rows
        .map(|cells| {
            let mut row = vec![Value::Null; pad];
            row.extend(cells.iter().map(xlsx_cell));
            row
        })
        .collect();
    Sheet { columns, rows }
}

/// One xlsx cell as a JSON cell.
fn xlsx_cell(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        // Error and empty cells.
        _ => Value::Null,
    }
}

// =============================================================================
// FINGERPRINT
// =============================================================================

/// BLAKE3 digest of a roster source's raw bytes.
///
/// Two loads with the same fingerprint come from the same file and can share
/// a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RosterFingerprint([u8; 32]);

impl RosterFingerprint {
    /// Fingerprint raw bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for RosterFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// LOADER
// =============================================================================

/// Sheet and column names plus exclusion lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub people_sheet: String,
    pub timesheet_sheet: String,
    pub name_column: String,
    pub role_column: String,
    pub excluded_names: Vec<String>,
    pub excluded_clusters: Vec<String>,
    /// Header row of the people sheet in xlsx input.
    pub people_header_row: usize,
    /// Header row of the timesheet in xlsx input.
    pub timesheet_header_row: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            people_sheet: DEFAULT_PEOPLE_SHEET.to_string(),
            timesheet_sheet: DEFAULT_TIMESHEET_SHEET.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
            role_column: DEFAULT_ROLE_COLUMN.to_string(),
            excluded_names: EXCLUDED_PLACEHOLDER_NAMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            excluded_clusters: EXCLUDED_CLUSTERS.iter().map(|s| (*s).to_string()).collect(),
            people_header_row: DEFAULT_PEOPLE_HEADER_ROW,
            timesheet_header_row: DEFAULT_TIMESHEET_HEADER_ROW,
        }
    }
}

/// A roster together with the fingerprint of the bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedRoster {
    pub roster: Roster,
    pub fingerprint: RosterFingerprint,
}

/// The Roster Loader.
#[derive(Debug, Clone, Default)]
pub struct RosterLoader {
    config: LoaderConfig,
}

impl RosterLoader {
    /// Loader with explicit sheet layout.
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Parse workbook bytes (xlsx or JSON) into a roster and fingerprint them.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<LoadedRoster, RosterFitError> {
        let workbook = if bytes.starts_with(ZIP_MAGIC) {
            Workbook::from_xlsx(
                bytes,
                &[
                    (self.config.people_sheet.as_str(), self.config.people_header_row),
                    (
                        self.config.timesheet_sheet.as_str(),
                        self.config.timesheet_header_row,
                    ),
                ],
            )?
        } else {
            Workbook::from_json(bytes)?
        };
        Ok(LoadedRoster {
            roster: self.load(&workbook)?,
            fingerprint: RosterFingerprint::of(bytes),
        })
    }

    /// Build a roster from a workbook.
    ///
    /// # Errors
    /// - `MissingTable` / `MissingColumn` when the layout is not as configured
    /// - `MalformedCell` when an hours cell is not a non-negative number
    /// - `DuplicatePerson` when a name appears twice in the timesheet
    pub fn load(&self, workbook: &Workbook) -> Result<Roster, RosterFitError> {
        let roles = self.read_roles(workbook)?;
        let timesheet = workbook.sheet(&self.config.timesheet_sheet)?;
        let table = self.config.timesheet_sheet.as_str();

        if timesheet.columns.len() < 2 {
            let column = if timesheet.columns.is_empty() {
                "cluster"
            } else {
                "name"
            };
            return Err(RosterFitError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        if timesheet.rows.len() > MAX_ROSTER_ROWS {
            return Err(RosterFitError::InvalidRoster(format!(
                "{} timesheet rows exceeds maximum {}",
                timesheet.rows.len(),
                MAX_ROSTER_ROWS
            )));
        }

        let week_columns: Vec<(usize, NaiveDate)> = timesheet
            .columns
            .iter()
            .enumerate()
            .skip(2)
            .filter(|(_, header)| header.trim() != TIMESHEET_ROLE_COLUMN)
            .filter_map(|(i, header)| parse_week_header(header).map(|d| (i, d)))
            .collect();
        if week_columns.len() > MAX_WEEK_COLUMNS {
            return Err(RosterFitError::InvalidRoster(format!(
                "{} week columns exceeds maximum {}",
                week_columns.len(),
                MAX_WEEK_COLUMNS
            )));
        }

        let excluded_names: BTreeSet<&str> =
            self.config.excluded_names.iter().map(String::as_str).collect();
        let excluded_clusters: BTreeSet<&str> = self
            .config
            .excluded_clusters
            .iter()
            .map(String::as_str)
            .collect();

        let mut people = Vec::new();
        for (row_index, row) in timesheet.rows.iter().enumerate() {
            let Some(name) = row.get(1).and_then(text_cell) else {
                continue;
            };
            if excluded_names.contains(name.as_str()) {
                continue;
            }
            let cluster = row.first().and_then(text_cell);
            if cluster
                .as_deref()
                .is_some_and(|c| excluded_clusters.contains(c))
            {
                continue;
            }

            let mut person = Person::new(name.clone());
            person.cluster = cluster;
            person.role = roles.get(&name).cloned().flatten();

            for (column_index, week) in &week_columns {
                let cell = row.get(*column_index).unwrap_or(&Value::Null);
                let hours = hours_cell(cell).map_err(|reason| RosterFitError::MalformedCell {
                    table: table.to_string(),
                    row: row_index,
                    column: timesheet.columns[*column_index].clone(),
                    reason,
                })?;
                // Duplicate date headers add up, like summing both columns.
                *person.hours.entry(*week).or_insert(0.0) += hours;
            }

            people.push(person);
        }

        let weeks = week_columns.into_iter().map(|(_, d)| d).collect();
        Roster::new(weeks, people)
    }

    /// Person → role from the people sheet. First mapping wins.
    fn read_roles(
        &self,
        workbook: &Workbook,
    ) -> Result<BTreeMap<String, Option<String>>, RosterFitError> {
        let sheet = workbook.sheet(&self.config.people_sheet)?;
        let missing = |column: &str| RosterFitError::MissingColumn {
            table: self.config.people_sheet.clone(),
            column: column.to_string(),
        };
        let name_idx = sheet
            .column(&self.config.name_column)
            .ok_or_else(|| missing(&self.config.name_column))?;
        let role_idx = sheet
            .column(&self.config.role_column)
            .ok_or_else(|| missing(&self.config.role_column))?;

        let mut roles = BTreeMap::new();
        for row in &sheet.rows {
            let Some(name) = row.get(name_idx).and_then(text_cell) else {
                continue;
            };
            let role = row.get(role_idx).and_then(text_cell);
            roles.entry(name).or_insert(role);
        }
        Ok(roles)
    }
}

/// A week header: `YYYY-MM-DD`, optionally followed by a time.
fn parse_week_header(header: &str) -> Option<NaiveDate> {
    let header = header.trim();
    NaiveDate::parse_from_str(header, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(header, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(header, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Non-empty text of a cell. Numbers are rendered; null and blanks are `None`.
fn text_cell(cell: &Value) -> Option<String> {
    let text = match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Hours in a cell. Empty cells count as 0.
fn hours_cell(cell: &Value) -> Result<f64, String> {
    let hours = match cell {
        Value::Null => return Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {} out of range", n))?,
        Value::String(s) if s.trim().is_empty() => return Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s))?,
        other => return Err(format!("unexpected value {}", other)),
    };
    if !hours.is_finite() || hours < 0.0 {
        return Err(format!("hours must be non-negative, got {}", hours));
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn people_sheet() -> Sheet {
        Sheet::new(["Resource", "Primary Role", "Location"])
            .with_row(vec![json!("Ana"), json!("Analyst"), json!("Lisbon")])
            .with_row(vec![json!("Ben"), json!("Senior Analyst"), json!(null)])
            .with_row(vec![json!("Ana"), json!("Engineer"), json!(null)])
    }

    fn timesheet() -> Sheet {
        Sheet::new(["Cluster", "Name", "Role", "2024-01-01", "2024-01-08 00:00:00", "Total"])
            .with_row(vec![json!("X"), json!("Ana"), json!("?"), json!(10), json!("5"), json!(15)])
            .with_row(vec![json!("Y"), json!("Ben"), json!(null), json!(null), json!(8.5)])
            .with_row(vec![json!(null), json!("Cy"), json!(null), json!(0), json!(0)])
            .with_row(vec![json!("X"), json!("Consultant"), json!(null), json!(40), json!(40)])
            .with_row(vec![json!("Others"), json!("Dan"), json!(null), json!(1), json!(1)])
            .with_row(vec![json!("X"), json!(""), json!(null), json!(1), json!(1)])
    }

    fn workbook() -> Workbook {
        Workbook::new()
            .with_sheet(DEFAULT_PEOPLE_SHEET, people_sheet())
            .with_sheet(DEFAULT_TIMESHEET_SHEET, timesheet())
    }

    #[test]
    fn loads_weeks_from_date_headers() {
        let roster = RosterLoader::default().load(&workbook()).expect("load");
        assert_eq!(roster.weeks(), &[date(2024, 1, 1), date(2024, 1, 8)]);
    }

    #[test]
    fn left_join_keeps_unmatched_rows() {
        let roster = RosterLoader::default().load(&workbook()).expect("load");
        let names: Vec<_> = roster.people().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Ben", "Cy"]);

        let cy = roster.person("Cy").expect("Cy");
        assert_eq!(cy.role, None);
        assert_eq!(cy.cluster, None);
    }

    #[test]
    fn first_role_mapping_wins() {
        let roster = RosterLoader::default().load(&workbook()).expect("load");
        assert_eq!(
            roster.person("Ana").expect("Ana").role.as_deref(),
            Some("Analyst")
        );
    }

    #[test]
    fn hours_parse_numbers_strings_and_blanks() {
        let roster = RosterLoader::default().load(&workbook()).expect("load");
        let ana = roster.person("Ana").expect("Ana");
        assert_eq!(ana.hours_for(date(2024, 1, 1)), 10.0);
        assert_eq!(ana.hours_for(date(2024, 1, 8)), 5.0);

        let ben = roster.person("Ben").expect("Ben");
        assert_eq!(ben.hours_for(date(2024, 1, 1)), 0.0);
        assert_eq!(ben.hours_for(date(2024, 1, 8)), 8.5);
    }

    #[test]
    fn placeholders_and_other_cluster_excluded() {
        let roster = RosterLoader::default().load(&workbook()).expect("load");
        assert!(roster.person("Consultant").is_none());
        assert!(roster.person("Dan").is_none());
    }

    #[test]
    fn missing_people_sheet_is_schema_error() {
        let wb = Workbook::new().with_sheet(DEFAULT_TIMESHEET_SHEET, timesheet());
        let err = RosterLoader::default().load(&wb).expect_err("should fail");
        assert!(matches!(err, RosterFitError::MissingTable(t) if t == DEFAULT_PEOPLE_SHEET));
    }

    #[test]
    fn missing_timesheet_is_schema_error() {
        let wb = Workbook::new().with_sheet(DEFAULT_PEOPLE_SHEET, people_sheet());
        let err = RosterLoader::default().load(&wb).expect_err("should fail");
        assert!(matches!(err, RosterFitError::MissingTable(t) if t == DEFAULT_TIMESHEET_SHEET));
    }

    #[test]
    fn missing_role_column_is_schema_error() {
        let wb = workbook().with_sheet(DEFAULT_PEOPLE_SHEET, Sheet::new(["Resource"]));
        let err = RosterLoader::default().load(&wb).expect_err("should fail");
        assert!(matches!(
            err,
            RosterFitError::MissingColumn { column, .. } if column == DEFAULT_ROLE_COLUMN
        ));
    }

    #[test]
    fn negative_hours_rejected() {
        let sheet = Sheet::new(["Cluster", "Name", "2024-01-01"]).with_row(vec![
            json!("X"),
            json!("Ana"),
            json!(-4),
        ]);
        let wb = workbook().with_sheet(DEFAULT_TIMESHEET_SHEET, sheet);
        let err = RosterLoader::default().load(&wb).expect_err("should fail");
        assert!(matches!(err, RosterFitError::MalformedCell { row: 0, .. }));
    }

    #[test]
    fn duplicate_timesheet_name_rejected() {
        let sheet = Sheet::new(["Cluster", "Name"])
            .with_row(vec![json!("X"), json!("Ana")])
            .with_row(vec![json!("Y"), json!("Ana")]);
        let wb = workbook().with_sheet(DEFAULT_TIMESHEET_SHEET, sheet);
        assert!(matches!(
            RosterLoader::default().load(&wb),
            Err(RosterFitError::DuplicatePerson(_))
        ));
    }

    #[test]
    fn load_bytes_fingerprints_source() {
        let bytes = serde_json::to_vec(&workbook()).expect("serialize");
        let loader = RosterLoader::default();
        let first = loader.load_bytes(&bytes).expect("load");
        let second = loader.load_bytes(&bytes).expect("load");

        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint.to_hex().len(), 64);
        assert_ne!(first.fingerprint, RosterFingerprint::of(b"other"));
    }

    const XLSX_FIXTURE: &[u8] = include_bytes!("../tests/fixtures/roster.xlsx");

    #[test]
    fn xlsx_headers_read_from_configured_row() {
        let loaded = RosterLoader::default()
            .load_bytes(XLSX_FIXTURE)
            .expect("load xlsx");
        let roster = &loaded.roster;

        // Two date-typed header cells and one text header.
        assert_eq!(
            roster.weeks(),
            &[date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]
        );
        let names: Vec<_> = roster.people().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Ben"]);

        let ana = roster.person("Ana").expect("Ana");
        assert_eq!(ana.cluster.as_deref(), Some("Data"));
        assert_eq!(ana.role.as_deref(), Some("Analyst"));
        assert_eq!(ana.hours_for(date(2024, 1, 8)), 12.5);

        let ben = roster.person("Ben").expect("Ben");
        assert_eq!(ben.role.as_deref(), Some("Senior Analyst"));
        assert_eq!(ben.hours_for(date(2024, 1, 1)), 0.0);
        assert_eq!(ben.hours_for(date(2024, 1, 15)), 20.0);
    }

    #[test]
    fn xlsx_sheet_rows_start_at_header_row() {
        let wb = Workbook::from_xlsx(XLSX_FIXTURE, &[(DEFAULT_TIMESHEET_SHEET, 4)])
            .expect("read xlsx");
        let sheet = wb.sheets.get(DEFAULT_TIMESHEET_SHEET).expect("timesheet");
        assert_eq!(sheet.columns[..3], ["Cluster", "Resource", "Role"]);
        assert_eq!(sheet.columns[3], "2024-01-01 00:00:00");
        assert_eq!(sheet.rows.len(), 4);
        assert_eq!(sheet.rows[0][1], json!("Ana"));
        assert_eq!(sheet.rows[1][3], Value::Null);
        assert!(!wb.sheets.contains_key(DEFAULT_PEOPLE_SHEET));
    }

    #[test]
    fn xlsx_missing_sheet_is_schema_error() {
        let loader = RosterLoader::new(LoaderConfig {
            timesheet_sheet: "Weekly".to_string(),
            ..LoaderConfig::default()
        });
        assert!(matches!(
            loader.load_bytes(XLSX_FIXTURE),
            Err(RosterFitError::MissingTable(t)) if t == "Weekly"
        ));
    }

    #[test]
    fn corrupt_xlsx_is_serialization_error() {
        assert!(matches!(
            RosterLoader::default().load_bytes(b"PK\x03\x04truncated"),
            Err(RosterFitError::SerializationError(_))
        ));
    }

    #[test]
    fn invalid_json_is_serialization_error() {
        assert!(matches!(
            RosterLoader::default().load_bytes(b"not json"),
            Err(RosterFitError::SerializationError(_))
        ));
    }
}
