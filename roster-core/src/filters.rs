//! Filter validation: raw request parameters in, a typed [`FilterSet`] out.
//!
//! Nothing past this module sees untyped parameters.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SearchSettings;

const MAX_LOCATION_LEN: usize = 100;
const LIST_SEPARATOR: char = ',';

/// Raw `(key, value)` pairs in arrival order.
pub type RawParams = [(String, String)];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Employment status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "Not started")]
    NotStarted,
    #[serde(rename = "Terminated")]
    Terminated,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Active, Status::NotStarted, Status::Terminated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::NotStarted => "Not started",
            Status::Terminated => "Terminated",
        }
    }

    /// Case-insensitive; `_` counts as a space.
    pub fn parse(raw: &str) -> Option<Status> {
        let wanted = raw
            .trim()
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Status::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(&wanted))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub i64);

/// A validated search request.
///
/// Every set is a restriction on one dimension; an empty set restricts
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    pub statuses: BTreeSet<Status>,
    /// Lowercased.
    pub locations: BTreeSet<String>,
    pub companies: BTreeSet<CompanyId>,
    pub departments: BTreeSet<DepartmentId>,
    pub positions: BTreeSet<PositionId>,
    /// Trimmed, inner whitespace collapsed.
    pub free_text: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            statuses: BTreeSet::new(),
            locations: BTreeSet::new(),
            companies: BTreeSet::new(),
            departments: BTreeSet::new(),
            positions: BTreeSet::new(),
            free_text: None,
            page: 1,
            page_size: SearchSettings::default().default_page_size,
        }
    }
}

impl FilterSet {
    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    Query,
    Statuses,
    Locations,
    Companies,
    Departments,
    Positions,
    Page,
    PageSize,
}

impl Param {
    fn parse(key: &str) -> Option<Param> {
        match key {
            "q" => Some(Param::Query),
            "statuses" | "status" => Some(Param::Statuses),
            "locations" | "location" => Some(Param::Locations),
            "company_ids" => Some(Param::Companies),
            "department_ids" => Some(Param::Departments),
            "position_ids" => Some(Param::Positions),
            "page" => Some(Param::Page),
            "page_size" | "limit" => Some(Param::PageSize),
            _ => None,
        }
    }
}

/// Turns raw parameters into a [`FilterSet`].
///
/// Pure: the same input always gives the same result.
#[derive(Debug, Clone)]
pub struct FilterValidator {
    settings: SearchSettings,
}

impl Default for FilterValidator {
    fn default() -> Self {
        Self::new(SearchSettings::default())
    }
}

impl FilterValidator {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    pub fn max_page_size(&self) -> u32 {
        self.settings.max_page_size
    }

    pub fn validate(&self, raw: &RawParams) -> Result<FilterSet, ValidationError> {
        let mut filters = FilterSet {
            page_size: self.settings.default_page_size,
            ..FilterSet::default()
        };
        let mut seen_query = false;
        let mut seen_page = false;
        let mut seen_page_size = false;

        for (key, value) in raw {
            let param = Param::parse(key.trim())
                .ok_or_else(|| ValidationError::new(key.as_str(), "unknown parameter"))?;

            match param {
                Param::Query => {
                    once(key, &mut seen_query)?;
                    filters.free_text = self.free_text(key, value)?;
                }
                Param::Page => {
                    once(key, &mut seen_page)?;
                    filters.page = positive_u32(key, value)?;
                }
                Param::PageSize => {
                    once(key, &mut seen_page_size)?;
                    filters.page_size = self.page_size(key, value)?;
                }
                Param::Statuses => {
                    for item in items(value) {
                        let status = Status::parse(item).ok_or_else(|| {
                            ValidationError::new(
                                key.as_str(),
                                format!(
                                    "unknown status '{item}' (expected one of: Active, Not started, Terminated)"
                                ),
                            )
                        })?;
                        filters.statuses.insert(status);
                    }
                    self.bounded(key, filters.statuses.len())?;
                }
                Param::Locations => {
                    for item in items(value) {
                        if item.chars().count() > MAX_LOCATION_LEN {
                            return Err(ValidationError::new(
                                key.as_str(),
                                format!("locations must be at most {MAX_LOCATION_LEN} characters"),
                            ));
                        }
                        filters.locations.insert(item.to_lowercase());
                    }
                    self.bounded(key, filters.locations.len())?;
                }
                Param::Companies => {
                    for item in items(value) {
                        filters.companies.insert(CompanyId(positive_id(key, item)?));
                    }
                    self.bounded(key, filters.companies.len())?;
                }
                Param::Departments => {
                    for item in items(value) {
                        filters.departments.insert(DepartmentId(positive_id(key, item)?));
                    }
                    self.bounded(key, filters.departments.len())?;
                }
                Param::Positions => {
                    for item in items(value) {
                        filters.positions.insert(PositionId(positive_id(key, item)?));
                    }
                    self.bounded(key, filters.positions.len())?;
                }
            }
        }

        Ok(filters)
    }

    fn free_text(&self, key: &str, value: &str) -> Result<Option<String>, ValidationError> {
        if value.chars().any(char::is_control) {
            return Err(ValidationError::new(key, "must not contain control characters"));
        }
        let text = value.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Ok(None);
        }
        if text.chars().count() > self.settings.max_query_len {
            return Err(ValidationError::new(
                key,
                format!("must be at most {} characters", self.settings.max_query_len),
            ));
        }
        Ok(Some(text))
    }

    fn page_size(&self, key: &str, value: &str) -> Result<u32, ValidationError> {
        let max = self.settings.max_page_size;
        let out_of_range = || ValidationError::new(key, format!("must be between 1 and {max}"));
        let n = value
            .trim()
            .parse::<u64>()
            .map_err(|_| ValidationError::new(key, "must be a positive integer"))?;
        if n == 0 || n > max as u64 {
            return Err(out_of_range());
        }
        Ok(n as u32)
    }

    fn bounded(&self, key: &str, len: usize) -> Result<(), ValidationError> {
        if len > self.settings.max_filter_values {
            return Err(ValidationError::new(
                key,
                format!("at most {} values allowed", self.settings.max_filter_values),
            ));
        }
        Ok(())
    }
}

fn once(key: &str, seen: &mut bool) -> Result<(), ValidationError> {
    if *seen {
        return Err(ValidationError::new(key, "given more than once"));
    }
    *seen = true;
    Ok(())
}

fn items(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn positive_u32(key: &str, value: &str) -> Result<u32, ValidationError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::new(key, "must be a positive integer")),
    }
}

fn positive_id(key: &str, item: &str) -> Result<i64, ValidationError> {
    match item.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::new(
            key,
            format!("values must be positive integers (got '{item}')"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn validate(pairs: &[(&str, &str)]) -> Result<FilterSet, ValidationError> {
        FilterValidator::default().validate(&params(pairs))
    }

    #[test]
    fn empty_input_gives_defaults() {
        let f = validate(&[]).unwrap();
        assert_eq!(f, FilterSet::default());
        assert_eq!(f.page, 1);
        assert_eq!(f.page_size, 50);
        assert_eq!(f.offset(), 0);
    }

    #[test]
    fn repeated_and_comma_separated_values_merge_into_one_set() {
        let f = validate(&[
            ("company_ids", "3,1"),
            ("company_ids", "1"),
            ("company_ids", " 2 , "),
        ])
        .unwrap();
        let ids: Vec<i64> = f.companies.iter().map(|c| c.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn statuses_are_case_insensitive() {
        let f = validate(&[("statuses", "active,NOT STARTED"), ("status", "not_started")]).unwrap();
        assert_eq!(
            f.statuses.into_iter().collect::<Vec<_>>(),
            vec![Status::Active, Status::NotStarted]
        );
    }

    #[test]
    fn unknown_status_names_the_value() {
        let err = validate(&[("statuses", "Active,Retired")]).unwrap_err();
        assert_eq!(err.field, "statuses");
        assert!(err.message.contains("'Retired'"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = validate(&[("salary", "100")]).unwrap_err();
        assert_eq!(err.field, "salary");
        assert_eq!(err.message, "unknown parameter");
    }

    #[test]
    fn page_size_out_of_range_is_an_error_not_a_clamp() {
        let err = validate(&[("limit", "999")]).unwrap_err();
        assert_eq!(err.field, "limit");
        assert_eq!(err.message, "must be between 1 and 100");

        let err = validate(&[("page_size", "0")]).unwrap_err();
        assert_eq!(err.field, "page_size");

        assert_eq!(validate(&[("page_size", "100")]).unwrap().page_size, 100);
    }

    #[test]
    fn page_must_be_positive() {
        for bad in ["0", "-1", "two", ""] {
            let err = validate(&[("page", bad)]).unwrap_err();
            assert_eq!(err.field, "page", "input {bad:?}");
        }
        let f = validate(&[("page", "3"), ("page_size", "10")]).unwrap();
        assert_eq!(f.offset(), 20);
    }

    #[test]
    fn scalars_may_not_repeat() {
        let err = validate(&[("page_size", "10"), ("limit", "20")]).unwrap_err();
        assert_eq!(err.field, "limit");
        assert_eq!(err.message, "given more than once");
    }

    #[test]
    fn ids_must_be_positive_integers() {
        let err = validate(&[("department_ids", "1,abc")]).unwrap_err();
        assert_eq!(err.field, "department_ids");
        assert!(err.message.contains("'abc'"));
        assert!(validate(&[("position_ids", "0")]).is_err());
    }

    #[test]
    fn free_text_is_trimmed_and_capped() {
        let f = validate(&[("q", "   ")]).unwrap();
        assert_eq!(f.free_text, None);

        let f = validate(&[("q", "  jane   doe ")]).unwrap();
        assert_eq!(f.free_text.as_deref(), Some("jane doe"));

        let long = "x".repeat(101);
        let err = validate(&[("q", long.as_str())]).unwrap_err();
        assert_eq!(err.field, "q");
    }

    #[test]
    fn free_text_keeps_sql_metacharacters_verbatim() {
        let f = validate(&[("q", "O'Brien' OR '1'='1 %_")]).unwrap();
        assert_eq!(f.free_text.as_deref(), Some("O'Brien' OR '1'='1 %_"));
    }

    #[test]
    fn locations_are_lowercased_and_deduplicated() {
        let f = validate(&[("locations", "New York,new york"), ("location", "Boston")]).unwrap();
        assert_eq!(
            f.locations.into_iter().collect::<Vec<_>>(),
            vec!["boston".to_string(), "new york".to_string()]
        );
    }

    #[test]
    fn value_count_is_bounded() {
        let validator = FilterValidator::new(SearchSettings {
            max_filter_values: 2,
            ..SearchSettings::default()
        });
        let err = validator
            .validate(&params(&[("company_ids", "1,2,3")]))
            .unwrap_err();
        assert_eq!(err.message, "at most 2 values allowed");
    }
}
