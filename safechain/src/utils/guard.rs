//! Capturing exceptions raised by user code.

use crate::errors::PanicError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Polls `fut` to completion, turning a panic into an `Err`.
///
/// Errors already on the exception channel pass through unchanged.
pub(crate) async fn capture<T, Fut>(fut: Fut) -> anyhow::Result<T>
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(panic_to_error(payload.as_ref())),
    }
}

/// Runs a synchronous closure, turning a panic into an `Err`.
pub(crate) fn capture_sync<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> T,
{
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_to_error(payload.as_ref()))
}

fn panic_to_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::Error::new(PanicError { message })
}
