//! Validator backed by a serde type.

use super::{Issue, IssueCode, ValidationIssues, Validator};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Validates by deserializing into `T` and serializing it back.
///
/// The re-serialized value is what downstream stages see, so serde
/// attributes (renames, defaults, skipped fields) shape the parsed input.
pub struct SerdeValidator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeValidator<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a new serde-backed validator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Deserializes a value into `T`.
    pub fn from_json(&self, raw: &Value) -> Result<T, ValidationIssues> {
        T::deserialize(raw).map_err(|e| {
            ValidationIssues::single(Issue::form(IssueCode::InvalidType, e.to_string()))
        })
    }
}

impl<T> Default for SerdeValidator<T>
where
    T: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeValidator")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Validator for SerdeValidator<T>
where
    T: Serialize + DeserializeOwned,
{
    async fn validate(&self, raw: &Value) -> anyhow::Result<Result<Value, ValidationIssues>> {
        match self.from_json(raw) {
            Ok(typed) => Ok(Ok(serde_json::to_value(typed)?)),
            Err(issues) => Ok(Err(issues)),
        }
    }
}
