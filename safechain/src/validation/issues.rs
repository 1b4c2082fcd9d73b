//! Structured validation issues and their flattened form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One segment of the path to an offending value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The value has the wrong JSON type.
    InvalidType,
    /// A required value is missing.
    Required,
    /// A string or array is shorter than allowed.
    TooShort,
    /// A string or array is longer than allowed.
    TooLong,
    /// A string does not match the required pattern.
    Pattern,
    /// An object carries a key the schema does not know.
    UnrecognizedKey,
    /// Any other validator-specific failure.
    Custom,
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Path from the validated root to the offending value.
    pub path: Vec<PathSegment>,
    /// Issue category.
    pub code: IssueCode,
    /// Human-readable message.
    pub message: String,
}

impl Issue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(path: Vec<PathSegment>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path,
            code,
            message: message.into(),
        }
    }

    /// Creates an issue about the value as a whole.
    #[must_use]
    pub fn form(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Vec::new(), code, message)
    }

    /// Renders the path as `a.b.0`.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// The rich validation error: every issue the validator found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssues {
    issues: Vec<Issue>,
}

impl ValidationIssues {
    /// Creates a collection from issues.
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Creates a collection holding one issue.
    #[must_use]
    pub fn single(issue: Issue) -> Self {
        Self { issues: vec![issue] }
    }

    /// Returns the issues.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if there are no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Flattens issues into form-level messages and per-field messages.
    ///
    /// Fields are keyed by the first path segment; issues with an empty path
    /// are form errors.
    #[must_use]
    pub fn flatten(&self) -> FlattenedIssues {
        let mut flat = FlattenedIssues::default();
        for issue in &self.issues {
            match issue.path.first() {
                None => flat.form_errors.push(issue.message.clone()),
                Some(first) => flat
                    .field_errors
                    .entry(first.to_string())
                    .or_default()
                    .push(issue.message.clone()),
            }
        }
        flat
    }
}

impl fmt::Display for ValidationIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|issue| {
                if issue.path.is_empty() {
                    issue.message.clone()
                } else {
                    format!("{}: {}", issue.path_string(), issue.message)
                }
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationIssues {}

/// Serialization-safe field -> messages map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedIssues {
    /// Messages about the value as a whole.
    #[serde(default)]
    pub form_errors: Vec<String>,
    /// Messages keyed by top-level field.
    #[serde(default)]
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl FlattenedIssues {
    /// Returns the messages for a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.field_errors.get(name).map(Vec::as_slice)
    }
}
