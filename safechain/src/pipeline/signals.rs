//! Recognition of host control-flow signals.
//!
//! A control-flow signal is an exception the host uses for its own
//! navigation (redirects, not-found pages and the like). Signals are never
//! turned into outcomes; they leave the run as [`Escalation::Signal`].
//!
//! [`Escalation::Signal`]: crate::errors::Escalation::Signal

use std::fmt;
use std::marker::PhantomData;

/// Decides whether an exception is a control-flow signal.
pub trait SignalClassifier: Send + Sync {
    /// Returns true if the error must propagate unmodified.
    fn is_control_flow(&self, error: &anyhow::Error) -> bool;
}

impl<F> SignalClassifier for F
where
    F: Fn(&anyhow::Error) -> bool + Send + Sync,
{
    fn is_control_flow(&self, error: &anyhow::Error) -> bool {
        self(error)
    }
}

/// Treats nothing as a signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignals;

impl SignalClassifier for NoSignals {
    fn is_control_flow(&self, _error: &anyhow::Error) -> bool {
        false
    }
}

/// Treats any error whose chain contains a `T` as a signal.
pub struct DowncastSignal<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DowncastSignal<T> {
    /// Creates the classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DowncastSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DowncastSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DowncastSignal")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> SignalClassifier for DowncastSignal<T>
where
    T: std::error::Error + Send + Sync + 'static,
{
    fn is_control_flow(&self, error: &anyhow::Error) -> bool {
        error.chain().any(|cause| cause.is::<T>())
    }
}
