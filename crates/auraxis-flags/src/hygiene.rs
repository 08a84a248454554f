//! Catalog metadata hygiene.
//!
//! Every flag must carry an owner, a known type and status, and a
//! `createdAt`/`removeBy` window. Flags past their `removeBy` date must be
//! marked `removed`.
//!
//! A JSON `null` owner, type or status counts as empty: `"owner": null` is
//! reported as missing and `"status": null` as `invalid 'status' (empty)`.
//! Other non-string values are checked in their JSON rendering.

use crate::catalog::text_of;
use crate::{FlagError, FlagResult};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

pub const HYGIENE_TAG: &str = "[feature-flags-hygiene]";
pub const DEFAULT_KEY_PREFIX: &str = "api";

pub const ALLOWED_TYPES: &[&str] = &["release", "experiment", "kill-switch"];
pub const ALLOWED_STATUSES: &[&str] = &[
    "draft",
    "enabled-dev",
    "enabled-staging",
    "enabled-prod",
    "cleanup-pending",
    "removed",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One hygiene failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub message: String,
}

impl ValidationIssue {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn or_empty(value: &str) -> &str {
    if value.is_empty() {
        "empty"
    } else {
        value
    }
}

/// Read the raw `flags` array of a catalog file
pub fn load_catalog_entries(path: &Path) -> FlagResult<Vec<Value>> {
    let raw = std::fs::read_to_string(path).map_err(|source| FlagError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: Value = serde_json::from_str(&raw).map_err(|source| FlagError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match parsed.get("flags") {
        Some(Value::Array(flags)) => Ok(flags.clone()),
        _ => Err(FlagError::catalog(
            "catalog must contain a top-level 'flags' array",
        )),
    }
}

/// Validate every catalog entry, returning all issues in catalog order
pub fn validate_flags(entries: &[Value], prefix: &str, today: NaiveDate) -> Vec<ValidationIssue> {
    let mut validator = Validator {
        prefix,
        today,
        seen_keys: HashSet::new(),
        issues: Vec::new(),
    };
    for entry in entries {
        validator.validate_flag(entry);
    }
    validator.issues
}

struct Validator<'a> {
    prefix: &'a str,
    today: NaiveDate,
    seen_keys: HashSet<String>,
    issues: Vec<ValidationIssue>,
}

impl Validator<'_> {
    fn report(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(message));
    }

    fn validate_flag(&mut self, entry: &Value) {
        let Some(flag) = entry.as_object() else {
            self.report("invalid flag entry: every item must be an object");
            return;
        };

        let key = text_of(flag.get("key")).trim().to_string();
        if key.is_empty() {
            self.report("invalid flag entry: missing non-empty 'key'");
            return;
        }

        self.validate_key(&key);
        let status = self.validate_owner_type_status(&key, flag);
        self.validate_dates(&key, flag, &status);
    }

    fn validate_key(&mut self, key: &str) {
        let required = format!("{}.", self.prefix);
        if !key.starts_with(&required) {
            self.report(format!("{key}: key must start with '{required}'"));
        }

        if !self.seen_keys.insert(key.to_string()) {
            self.report(format!("{key}: duplicate key detected"));
        }
    }

    fn validate_owner_type_status(&mut self, key: &str, flag: &Map<String, Value>) -> String {
        let owner = text_of(flag.get("owner")).trim().to_string();
        let flag_type = text_of(flag.get("type")).trim().to_string();
        let status = text_of(flag.get("status")).trim().to_string();

        if owner.is_empty() {
            self.report(format!("{key}: missing required field 'owner'"));
        }

        if !ALLOWED_TYPES.contains(&flag_type.as_str()) {
            self.report(format!("{key}: invalid 'type' ({})", or_empty(&flag_type)));
        }

        if !ALLOWED_STATUSES.contains(&status.as_str()) {
            self.report(format!("{key}: invalid 'status' ({})", or_empty(&status)));
        }

        status
    }

    fn parse_date(&mut self, key: &str, flag: &Map<String, Value>, field: &str) -> Option<NaiveDate> {
        let Some(raw) = flag.get(field).and_then(Value::as_str) else {
            self.report(format!("{key}: field '{field}' must use YYYY-MM-DD"));
            return None;
        };

        match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                self.report(format!("{key}: field '{field}' is not a valid calendar date"));
                None
            }
        }
    }

    fn validate_dates(&mut self, key: &str, flag: &Map<String, Value>, status: &str) {
        let created_at = self.parse_date(key, flag, "createdAt");
        let remove_by = self.parse_date(key, flag, "removeBy");

        if let (Some(created_at), Some(remove_by)) = (created_at, remove_by) {
            if remove_by < created_at {
                self.report(format!("{key}: 'removeBy' cannot be before 'createdAt'"));
            }
        }

        if let Some(remove_by) = remove_by {
            if status != "removed" && remove_by < self.today {
                self.report(format!(
                    "{key}: flag is expired ({}) and not removed (status={})",
                    remove_by.format(DATE_FORMAT),
                    or_empty(status)
                ));
            }
        }
    }
}

/// Outcome of a hygiene run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HygieneReport {
    pub flag_count: usize,
    pub issues: Vec<ValidationIssue>,
}

impl HygieneReport {
    /// Load and validate the catalog at `path`; load failures become a single issue
    pub fn check(path: &Path, prefix: &str, today: NaiveDate) -> Self {
        match load_catalog_entries(path) {
            Ok(entries) => Self {
                flag_count: entries.len(),
                issues: validate_flags(&entries, prefix, today),
            },
            Err(e) => Self {
                flag_count: 0,
                issues: vec![ValidationIssue::new(e.to_string())],
            },
        }
    }

    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Lines to print: stdout on success, stderr on failure
    pub fn lines(&self) -> Vec<String> {
        if self.passed() {
            return vec![format!("{} OK ({} flags)", HYGIENE_TAG, self.flag_count)];
        }

        std::iter::once(format!("{} FAILED", HYGIENE_TAG))
            .chain(self.issues.iter().map(|issue| format!(" - {}", issue)))
            .collect()
    }
}
