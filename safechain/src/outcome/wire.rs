//! Serialization-safe outcome encoding.

use super::Outcome;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Plain success/failure record that survives a serialization boundary.
///
/// Encoded as `{ "ok": true, "value": .. }` or `{ "ok": false, "error": .. }`.
/// It is deliberately a distinct type from [`Outcome`]; conversions in both
/// directions are lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOutcome<V, E> {
    /// `{ ok: true, value }`
    Ok(V),
    /// `{ ok: false, error }`
    Err(E),
}

impl<V, E> WireOutcome<V, E> {
    /// Returns true for the `ok: true` variant.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns the value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        match self {
            Self::Ok(v) => Some(v),
            Self::Err(_) => None,
        }
    }

    /// Returns the error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Ok(_) => None,
            Self::Err(e) => Some(e),
        }
    }

    /// Converts back into an in-process [`Outcome`].
    pub fn into_outcome(self) -> Outcome<V, E> {
        match self {
            Self::Ok(v) => Outcome::Success(v),
            Self::Err(e) => Outcome::Failure(e),
        }
    }
}

impl<V, E> From<Outcome<V, E>> for WireOutcome<V, E> {
    fn from(outcome: Outcome<V, E>) -> Self {
        match outcome {
            Outcome::Success(v) => Self::Ok(v),
            Outcome::Failure(e) => Self::Err(e),
        }
    }
}

impl<V, E> From<WireOutcome<V, E>> for Outcome<V, E> {
    fn from(wire: WireOutcome<V, E>) -> Self {
        wire.into_outcome()
    }
}

#[derive(Serialize)]
struct WireRef<'a, V, E> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a E>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>, E: Deserialize<'de>"))]
struct WireOwned<V, E> {
    ok: bool,
    #[serde(default, deserialize_with = "present")]
    value: Option<V>,
    #[serde(default, deserialize_with = "present")]
    error: Option<E>,
}

/// Treats an explicit `null` as a present value rather than a missing one.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl<V: Serialize, E: Serialize> Serialize for WireOutcome<V, E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Self::Ok(v) => WireRef { ok: true, value: Some(v), error: None },
            Self::Err(e) => WireRef { ok: false, value: None, error: Some(e) },
        };
        repr.serialize(serializer)
    }
}

impl<'de, V, E> Deserialize<'de> for WireOutcome<V, E>
where
    V: Deserialize<'de>,
    E: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = WireOwned::<V, E>::deserialize(deserializer)?;
        match (repr.ok, repr.value, repr.error) {
            (true, Some(v), None) => Ok(Self::Ok(v)),
            (false, None, Some(e)) => Ok(Self::Err(e)),
            (true, _, _) => Err(de::Error::custom("`ok: true` requires exactly a `value` field")),
            (false, _, _) => Err(de::Error::custom("`ok: false` requires exactly an `error` field")),
        }
    }
}
