//! Typed outcome of a purchase attempt.

/// The outcome of one purchase attempt.
///
/// Consumers are expected to match exhaustively; there is no "maybe"
/// state and no optional-field bag to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The purchase was admitted and the lifetime total incremented.
    Admitted(Admission),
    /// The purchase was denied; the lifetime total is untouched.
    Denied(Denial),
}

/// Details of an admitted purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// New lifetime total of admitted purchases
    pub total: u64,
    /// Count within the current window, always <= limit
    pub current: u64,
    /// Configured purchases allowed per window
    pub limit: u64,
    /// Seconds remaining in the current window's expiry
    pub ttl_seconds: u64,
}

impl Admission {
    /// Quota remaining within the current window.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.current)
    }
}

/// Details of a denied purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Why the attempt was denied
    pub reason: DenyReason,
    /// Human-readable message
    pub message: String,
    /// Seconds until the window expires; set only for rate-limit denials
    pub retry_after_seconds: Option<u64>,
}

/// Reason for a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The client identifier failed validation; no store access occurred
    Validation,
    /// The window's quota is exhausted
    RateLimited,
}
