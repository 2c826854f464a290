//! Quota decision logic.

mod decision;
mod keys;
mod limiter;

pub use decision::{Admission, Decision, Denial, DenyReason};
pub use keys::{total_key, window_key};
pub use limiter::QuotaLimiter;
