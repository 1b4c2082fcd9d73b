//! The `Outcome` sum type and its combinators.

/// The result of a fallible step: a success value or a failure error.
///
/// `Outcome` is immutable once constructed. Combinators on a failure pass the
/// failure through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome<V, E> {
    /// The step succeeded with a value.
    Success(V),
    /// The step failed with an error.
    Failure(E),
}

impl<V, E> Outcome<V, E> {
    /// Creates a successful outcome.
    pub const fn success(value: V) -> Self {
        Self::Success(value)
    }

    /// Creates a failed outcome.
    pub const fn failure(error: E) -> Self {
        Self::Failure(error)
    }

    /// Returns true if the outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if the outcome is a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the success value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        match self {
            Self::Success(v) => Some(v),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e),
        }
    }

    /// Transforms the success value.
    pub fn map_value<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Self::Success(v) => Outcome::Success(f(v)),
            Self::Failure(e) => Outcome::Failure(e),
        }
    }

    /// Transforms the failure error.
    pub fn map_error<F2, F>(self, f: F) -> Outcome<V, F2>
    where
        F: FnOnce(E) -> F2,
    {
        match self {
            Self::Success(v) => Outcome::Success(v),
            Self::Failure(e) => Outcome::Failure(f(e)),
        }
    }

    /// Chains a fallible step after a success.
    ///
    /// The outcome returned by `f` replaces this one and may itself be a failure.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(V) -> Outcome<U, E>,
    {
        match self {
            Self::Success(v) => f(v),
            Self::Failure(e) => Outcome::Failure(e),
        }
    }

    /// Recovers from a failure with a fallback step.
    pub fn or_else<F2, F>(self, f: F) -> Outcome<V, F2>
    where
        F: FnOnce(E) -> Outcome<V, F2>,
    {
        match self {
            Self::Success(v) => Outcome::Success(v),
            Self::Failure(e) => f(e),
        }
    }

    /// Returns the success value or the provided default.
    pub fn unwrap_or(self, default: V) -> V {
        match self {
            Self::Success(v) => v,
            Self::Failure(_) => default,
        }
    }

    /// Converts into a standard `Result`, enabling `?` inside handlers.
    pub fn into_result(self) -> Result<V, E> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Failure(e) => Err(e),
        }
    }

    /// Collects a sequence of outcomes into one.
    ///
    /// The first failure wins; later outcomes are not inspected.
    pub fn combine<I>(outcomes: I) -> Outcome<Vec<V>, E>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut values = Vec::new();
        for outcome in outcomes {
            match outcome {
                Self::Success(v) => values.push(v),
                Self::Failure(e) => return Outcome::Failure(e),
            }
        }
        Outcome::Success(values)
    }
}

impl<V, E> From<Result<V, E>> for Outcome<V, E> {
    fn from(result: Result<V, E>) -> Self {
        match result {
            Ok(v) => Self::Success(v),
            Err(e) => Self::Failure(e),
        }
    }
}

impl<V, E> From<Outcome<V, E>> for Result<V, E> {
    fn from(outcome: Outcome<V, E>) -> Self {
        outcome.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_accessors() {
        let outcome: Outcome<i32, String> = Outcome::success(3);
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert_eq!(outcome.value(), Some(&3));
        assert_eq!(outcome.error(), None);
    }

    #[test]
    fn test_map_value_skips_failure() {
        let outcome: Outcome<i32, &str> = Outcome::failure("bad");
        let mut called = false;
        let mapped = outcome.map_value(|v| {
            called = true;
            v + 1
        });
        assert!(!called);
        assert_eq!(mapped, Outcome::Failure("bad"));
    }

    #[test]
    fn test_map_error_on_success_is_noop() {
        let outcome: Outcome<i32, &str> = Outcome::success(1);
        assert_eq!(outcome.map_error(str::len), Outcome::Success(1));

        let failed: Outcome<i32, &str> = Outcome::failure("four");
        assert_eq!(failed.map_error(str::len), Outcome::Failure(4));
    }

    #[test]
    fn test_and_then_can_fail() {
        let outcome: Outcome<i32, String> = Outcome::success(2);
        let chained = outcome.and_then(|v| {
            if v > 1 {
                Outcome::failure(format!("{v} too big"))
            } else {
                Outcome::success(v)
            }
        });
        assert_eq!(chained, Outcome::Failure("2 too big".to_string()));
    }

    #[test]
    fn test_and_then_passes_failure_through() {
        let outcome: Outcome<i32, &str> = Outcome::failure("first");
        let chained = outcome.and_then(|_| Outcome::<i32, &str>::failure("second"));
        assert_eq!(chained, Outcome::Failure("first"));
    }

    #[test]
    fn test_or_else_recovers() {
        let outcome: Outcome<i32, &str> = Outcome::failure("missing");
        let recovered: Outcome<i32, ()> = outcome.or_else(|_| Outcome::success(0));
        assert_eq!(recovered, Outcome::Success(0));
    }

    #[test]
    fn test_result_conversions() {
        let outcome: Outcome<i32, &str> = Ok(5).into();
        assert_eq!(outcome.clone().into_result(), Ok(5));
        let back: Result<i32, &str> = outcome.into();
        assert_eq!(back, Ok(5));
    }

    #[test]
    fn test_combine_first_failure_wins() {
        let all = Outcome::combine(vec![
            Outcome::<i32, &str>::success(1),
            Outcome::failure("a"),
            Outcome::failure("b"),
        ]);
        assert_eq!(all, Outcome::Failure("a"));

        let ok = Outcome::combine(vec![Outcome::<i32, &str>::success(1), Outcome::success(2)]);
        assert_eq!(ok, Outcome::Success(vec![1, 2]));
    }
}
