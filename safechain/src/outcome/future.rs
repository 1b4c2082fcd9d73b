//! Lazily-evaluated asynchronous outcomes.

use super::Outcome;
use crate::utils::capture;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A deferred computation resolving to an [`Outcome`].
///
/// Nothing runs until the value is awaited; every combinator returns a new
/// lazy `AsyncOutcome` wrapping the previous one.
pub struct AsyncOutcome<V, E> {
    inner: BoxFuture<'static, Outcome<V, E>>,
}

impl<V, E> AsyncOutcome<V, E>
where
    V: Send + 'static,
    E: Send + 'static,
{
    /// Wraps a future that resolves to an outcome.
    pub fn new<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Outcome<V, E>> + Send + 'static,
    {
        Self { inner: fut.boxed() }
    }

    /// Creates an already-successful async outcome.
    pub fn success(value: V) -> Self {
        Self::new(future::ready(Outcome::Success(value)))
    }

    /// Creates an already-failed async outcome.
    pub fn failure(error: E) -> Self {
        Self::new(future::ready(Outcome::Failure(error)))
    }

    /// Converts a computation that may raise into an async outcome.
    ///
    /// An `Err` on the exception channel, or a panic while polling `fut`, is
    /// handed to `on_exception`, whose outcome becomes the result.
    pub fn from_fallible<Fut, C>(fut: Fut, on_exception: C) -> Self
    where
        Fut: Future<Output = anyhow::Result<Outcome<V, E>>> + Send + 'static,
        C: FnOnce(anyhow::Error) -> Outcome<V, E> + Send + 'static,
    {
        Self::new(async move {
            match capture(fut).await {
                Ok(outcome) => outcome,
                Err(exception) => on_exception(exception),
            }
        })
    }

    /// Transforms the success value once resolved.
    pub fn map_value<U, F>(self, f: F) -> AsyncOutcome<U, E>
    where
        U: Send + 'static,
        F: FnOnce(V) -> U + Send + 'static,
    {
        AsyncOutcome::new(async move { self.await.map_value(f) })
    }

    /// Transforms the failure error once resolved.
    pub fn map_error<G, F>(self, f: F) -> AsyncOutcome<V, G>
    where
        G: Send + 'static,
        F: FnOnce(E) -> G + Send + 'static,
    {
        AsyncOutcome::new(async move { self.await.map_error(f) })
    }

    /// Chains another asynchronous step after a success.
    pub fn and_then<U, F>(self, f: F) -> AsyncOutcome<U, E>
    where
        U: Send + 'static,
        F: FnOnce(V) -> AsyncOutcome<U, E> + Send + 'static,
    {
        AsyncOutcome::new(async move {
            match self.await {
                Outcome::Success(v) => f(v).await,
                Outcome::Failure(e) => Outcome::Failure(e),
            }
        })
    }

    /// Recovers from a failure with another asynchronous step.
    pub fn or_else<G, F>(self, f: F) -> AsyncOutcome<V, G>
    where
        G: Send + 'static,
        F: FnOnce(E) -> AsyncOutcome<V, G> + Send + 'static,
    {
        AsyncOutcome::new(async move {
            match self.await {
                Outcome::Success(v) => Outcome::Success(v),
                Outcome::Failure(e) => f(e).await,
            }
        })
    }
}

impl<V, E> From<Outcome<V, E>> for AsyncOutcome<V, E>
where
    V: Send + 'static,
    E: Send + 'static,
{
    fn from(outcome: Outcome<V, E>) -> Self {
        Self::new(future::ready(outcome))
    }
}

impl<V, E> Future for AsyncOutcome<V, E> {
    type Output = Outcome<V, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<V, E> fmt::Debug for AsyncOutcome<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOutcome").finish_non_exhaustive()
    }
}
