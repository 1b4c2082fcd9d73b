//! A small object-schema validator that reports every issue at once.

use super::{Issue, IssueCode, PathSegment, ValidationIssues, Validator};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Clone)]
enum RuleKind {
    String,
    Number,
    Integer,
    Boolean,
    Any,
    Object(ObjectSchema),
    Array(Box<Rule>),
}

/// Validation rule for a single value.
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    optional: bool,
    min_len: Option<usize>,
    max_len: Option<usize>,
    pattern: Option<Regex>,
}

impl Rule {
    fn of(kind: RuleKind) -> Self {
        Self {
            kind,
            optional: false,
            min_len: None,
            max_len: None,
            pattern: None,
        }
    }

    /// A JSON string.
    #[must_use]
    pub fn string() -> Self {
        Self::of(RuleKind::String)
    }

    /// Any JSON number.
    #[must_use]
    pub fn number() -> Self {
        Self::of(RuleKind::Number)
    }

    /// A JSON number without a fractional part.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(RuleKind::Integer)
    }

    /// A JSON boolean.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(RuleKind::Boolean)
    }

    /// Any value, including `null`.
    #[must_use]
    pub fn any() -> Self {
        Self::of(RuleKind::Any)
    }

    /// A nested object.
    #[must_use]
    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(RuleKind::Object(schema))
    }

    /// An array whose items all satisfy `item`.
    #[must_use]
    pub fn array(item: Rule) -> Self {
        Self::of(RuleKind::Array(Box::new(item)))
    }

    /// Allows the value to be missing or `null`; it is then omitted.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Minimum length of a string (in chars) or array.
    #[must_use]
    pub fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    /// Maximum length of a string (in chars) or array.
    #[must_use]
    pub fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    /// Requires a string to match `pattern`.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Checks `value`, pushing issues and returning the parsed value when the
    /// value should be kept.
    fn check(&self, value: Option<&Value>, path: &[PathSegment], issues: &mut Vec<Issue>) -> Option<Value> {
        let value = match value {
            None | Some(Value::Null) if matches!(self.kind, RuleKind::Any) && !self.optional => {
                return Some(Value::Null);
            }
            None | Some(Value::Null) if self.optional => return None,
            None | Some(Value::Null) => {
                issues.push(Issue::new(path.to_vec(), IssueCode::Required, "Required"));
                return None;
            }
            Some(v) => v,
        };

        match &self.kind {
            RuleKind::Any => Some(value.clone()),
            RuleKind::String => {
                let Some(s) = value.as_str() else {
                    issues.push(type_issue(path, "string", value));
                    return None;
                };
                let len = s.chars().count();
                self.check_len(len, path, issues);
                if let Some(pattern) = &self.pattern {
                    if !pattern.is_match(s) {
                        issues.push(Issue::new(
                            path.to_vec(),
                            IssueCode::Pattern,
                            format!("Does not match pattern {}", pattern.as_str()),
                        ));
                    }
                }
                Some(value.clone())
            }
            RuleKind::Number => {
                if value.is_number() {
                    Some(value.clone())
                } else {
                    issues.push(type_issue(path, "number", value));
                    None
                }
            }
            RuleKind::Integer => {
                let integral = value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0);
                if integral {
                    Some(value.clone())
                } else {
                    issues.push(type_issue(path, "integer", value));
                    None
                }
            }
            RuleKind::Boolean => {
                if value.is_boolean() {
                    Some(value.clone())
                } else {
                    issues.push(type_issue(path, "boolean", value));
                    None
                }
            }
            RuleKind::Object(schema) => schema.check(value, path, issues),
            RuleKind::Array(item) => {
                let Some(items) = value.as_array() else {
                    issues.push(type_issue(path, "array", value));
                    return None;
                };
                self.check_len(items.len(), path, issues);
                let parsed = items
                    .iter()
                    .enumerate()
                    .map(|(index, element)| {
                        let mut item_path = path.to_vec();
                        item_path.push(PathSegment::Index(index));
                        item.check(Some(element), &item_path, issues).unwrap_or(Value::Null)
                    })
                    .collect();
                Some(Value::Array(parsed))
            }
        }
    }

    fn check_len(&self, len: usize, path: &[PathSegment], issues: &mut Vec<Issue>) {
        let unit = match self.kind {
            RuleKind::String => "character(s)",
            _ => "element(s)",
        };
        if let Some(min) = self.min_len {
            if len < min {
                issues.push(Issue::new(
                    path.to_vec(),
                    IssueCode::TooShort,
                    format!("Must contain at least {min} {unit}"),
                ));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                issues.push(Issue::new(
                    path.to_vec(),
                    IssueCode::TooLong,
                    format!("Must contain at most {max} {unit}"),
                ));
            }
        }
    }
}

fn type_issue(path: &[PathSegment], expected: &str, received: &Value) -> Issue {
    let received = match received {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Issue::new(
        path.to_vec(),
        IssueCode::InvalidType,
        format!("Expected {expected}, received {received}"),
    )
}

/// Validator for JSON objects with named fields.
///
/// Unknown keys are stripped unless the schema is `strict`. A `transform`
/// runs on the validated object only when no issue was found inside it.
#[derive(Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Rule)>,
    strict: bool,
    transform: Option<Transform>,
}

impl ObjectSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field rule.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    /// Rejects keys not declared in the schema.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Reshapes the validated object.
    #[must_use]
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Validates synchronously.
    pub fn parse(&self, raw: &Value) -> Result<Value, ValidationIssues> {
        let mut issues = Vec::new();
        let parsed = self.check(raw, &[], &mut issues);
        match parsed {
            Some(value) if issues.is_empty() => Ok(value),
            _ => Err(ValidationIssues::new(issues)),
        }
    }

    fn check(&self, value: &Value, path: &[PathSegment], issues: &mut Vec<Issue>) -> Option<Value> {
        let Some(object) = value.as_object() else {
            issues.push(type_issue(path, "object", value));
            return None;
        };

        let before = issues.len();
        let mut parsed = Map::new();
        for (name, rule) in &self.fields {
            let mut field_path = path.to_vec();
            field_path.push(PathSegment::Key(name.clone()));
            if let Some(v) = rule.check(object.get(name), &field_path, issues) {
                parsed.insert(name.clone(), v);
            }
        }

        if self.strict {
            for key in object.keys() {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    let mut key_path = path.to_vec();
                    key_path.push(PathSegment::Key(key.clone()));
                    issues.push(Issue::new(
                        key_path,
                        IssueCode::UnrecognizedKey,
                        format!("Unrecognized key '{key}'"),
                    ));
                }
            }
        }

        let parsed = Value::Object(parsed);
        match &self.transform {
            Some(transform) if issues.len() == before => Some(transform(parsed)),
            _ => Some(parsed),
        }
    }
}

impl fmt::Debug for ObjectSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("fields", &self.fields)
            .field("strict", &self.strict)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

#[async_trait]
impl Validator for ObjectSchema {
    async fn validate(&self, raw: &Value) -> anyhow::Result<Result<Value, ValidationIssues>> {
        Ok(self.parse(raw))
    }
}
