//! # Roster Module
//!
//! The normalized roster: an explicit list of week-start dates plus the
//! person records that carry hours for those weeks.
//!
//! A `Roster` is read-only once built. Allocation adjustments are applied to a
//! clone through [`Roster::spread_hours`], never to the loaded instance.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::calendar::WeekRange;
use crate::primitives::{MAX_ROSTER_ROWS, MAX_WEEK_COLUMNS};
use crate::{Person, RosterFitError};

/// A validated roster.
///
/// Invariants enforced by [`Roster::new`]:
/// - `weeks` is sorted and free of duplicates
/// - person names are unique
/// - every hours key is one of `weeks`
/// - every hours value is finite and non-negative
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Roster {
    weeks: Vec<NaiveDate>,
    people: Vec<Person>,
}

impl Roster {
    /// Build a roster from a typed week schema and person records.
    pub fn new(weeks: Vec<NaiveDate>, people: Vec<Person>) -> Result<Self, RosterFitError> {
        if people.len() > MAX_ROSTER_ROWS {
            return Err(RosterFitError::InvalidRoster(format!(
                "{} people exceeds maximum {}",
                people.len(),
                MAX_ROSTER_ROWS
            )));
        }

        let week_set: BTreeSet<NaiveDate> = weeks.into_iter().collect();
        if week_set.len() > MAX_WEEK_COLUMNS {
            return Err(RosterFitError::InvalidRoster(format!(
                "{} week columns exceeds maximum {}",
                week_set.len(),
                MAX_WEEK_COLUMNS
            )));
        }

        let mut names = BTreeSet::new();
        for person in &people {
            if !names.insert(person.name.as_str()) {
                return Err(RosterFitError::DuplicatePerson(person.name.clone()));
            }
            for (week, hours) in &person.hours {
                if !week_set.contains(week) {
                    return Err(RosterFitError::InvalidRoster(format!(
                        "{} has hours for {} which is not a roster week",
                        person.name, week
                    )));
                }
                if !hours.is_finite() || *hours < 0.0 {
                    return Err(RosterFitError::InvalidRoster(format!(
                        "{} has invalid hours {} for {}",
                        person.name, hours, week
                    )));
                }
            }
        }

        Ok(Self {
            weeks: week_set.into_iter().collect(),
            people,
        })
    }

    /// Week-start dates, ascending.
    #[must_use]
    pub fn weeks(&self) -> &[NaiveDate] {
        &self.weeks
    }

    /// People in original roster order.
    #[must_use]
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// Number of people.
    #[must_use]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// Whether the roster has no people.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Find a person by name.
    #[must_use]
    pub fn person(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.name == name)
    }

    /// Roster weeks inside `range`, ascending.
    #[must_use]
    pub fn weeks_in(&self, range: &WeekRange) -> Vec<NaiveDate> {
        self.weeks
            .iter()
            .copied()
            .filter(|w| range.contains(*w))
            .collect()
    }

    /// Known clusters, sorted and deduplicated. Unknown clusters are omitted.
    #[must_use]
    pub fn clusters(&self) -> Vec<String> {
        self.people
            .iter()
            .filter_map(|p| p.cluster.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `cluster` is carried by at least one person.
    #[must_use]
    pub fn has_cluster(&self, cluster: &str) -> bool {
        self.people.iter().any(|p| p.in_cluster(cluster))
    }

    /// Whether any person lacks a cluster.
    #[must_use]
    pub fn has_unknown_cluster(&self) -> bool {
        self.people.iter().any(|p| p.cluster.is_none())
    }

    /// Known roles in display order.
    ///
    /// Roles mentioning "Execution Owner" come first, then roles mentioning
    /// "Senior", then the rest; alphabetical inside each bucket.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self
            .people
            .iter()
            .filter_map(|p| p.role.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        roles.sort_by_key(|r| role_rank(r));
        roles
    }

    /// Add `per_week` hours to each of `weeks` for the named person.
    ///
    /// Used by the allocation ledger on a private working copy. Unknown names
    /// and weeks outside the schema are ignored.
    pub(crate) fn spread_hours(&mut self, name: &str, weeks: &[NaiveDate], per_week: f64) {
        let Some(person) = self.people.iter_mut().find(|p| p.name == name) else {
            return;
        };
        for week in weeks {
            if self.weeks.binary_search(week).is_ok() {
                *person.hours.entry(*week).or_insert(0.0) += per_week;
            }
        }
    }
}

/// Display bucket of a role label.
fn role_rank(role: &str) -> u8 {
    if role.contains("Execution Owner") {
        0
    } else if role.contains("Senior") {
        1
    } else {
        2
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRoster {
            weeks: Vec<NaiveDate>,
            people: Vec<Person>,
        }

        let raw = RawRoster::deserialize(deserializer)?;
        Roster::new(raw.weeks, raw.people).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample() -> Roster {
        let w1 = date(2024, 1, 1);
        let w2 = date(2024, 1, 8);
        Roster::new(
            vec![w2, w1],
            vec![
                Person::new("Ana")
                    .with_cluster("X")
                    .with_role("Analyst")
                    .with_hours(w1, 10.0),
                Person::new("Ben")
                    .with_cluster("Y")
                    .with_role("Senior Analyst"),
                Person::new("Cy").with_role("Execution Owner"),
                Person::new("Dee").with_cluster("X"),
            ],
        )
        .expect("roster")
    }

    #[test]
    fn weeks_are_sorted() {
        let roster = sample();
        assert_eq!(roster.weeks(), &[date(2024, 1, 1), date(2024, 1, 8)]);
    }

    #[test]
    fn duplicate_names_rejected() {
        let result = Roster::new(vec![], vec![Person::new("Ana"), Person::new("Ana")]);
        assert!(matches!(result, Err(RosterFitError::DuplicatePerson(n)) if n == "Ana"));
    }

    #[test]
    fn negative_hours_rejected() {
        let w = date(2024, 1, 1);
        let result = Roster::new(vec![w], vec![Person::new("Ana").with_hours(w, -1.0)]);
        assert!(matches!(result, Err(RosterFitError::InvalidRoster(_))));
    }

    #[test]
    fn hours_outside_schema_rejected() {
        let result = Roster::new(
            vec![date(2024, 1, 1)],
            vec![Person::new("Ana").with_hours(date(2024, 1, 8), 4.0)],
        );
        assert!(matches!(result, Err(RosterFitError::InvalidRoster(_))));
    }

    #[test]
    fn clusters_skip_unknown() {
        let roster = sample();
        assert_eq!(roster.clusters(), vec!["X".to_string(), "Y".to_string()]);
        assert!(roster.has_unknown_cluster());
        assert!(roster.has_cluster("X"));
        assert!(!roster.has_cluster("Z"));
    }

    #[test]
    fn roles_put_execution_owner_then_senior_first() {
        let roster = sample();
        assert_eq!(
            roster.roles(),
            vec![
                "Execution Owner".to_string(),
                "Senior Analyst".to_string(),
                "Analyst".to_string(),
            ]
        );
    }

    #[test]
    fn spread_hours_touches_only_the_copy() {
        let roster = sample();
        let mut working = roster.clone();
        working.spread_hours("Ana", &[date(2024, 1, 1), date(2024, 1, 8)], 5.0);

        let original = roster.person("Ana").expect("Ana");
        let adjusted = working.person("Ana").expect("Ana");
        assert_eq!(original.hours_for(date(2024, 1, 8)), 0.0);
        assert_eq!(adjusted.hours_for(date(2024, 1, 1)), 15.0);
        assert_eq!(adjusted.hours_for(date(2024, 1, 8)), 5.0);
    }

    #[test]
    fn weeks_in_filters_by_range() {
        let roster = sample();
        let range = WeekRange::new(date(2024, 1, 9), date(2024, 1, 20)).expect("range");
        assert_eq!(roster.weeks_in(&range), vec![date(2024, 1, 8)]);
    }
}
