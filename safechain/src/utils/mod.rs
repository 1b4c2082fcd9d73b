//! Internal helpers shared across modules.

mod guard;

pub(crate) use guard::{capture, capture_sync};
