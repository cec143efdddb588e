//! Per-call correlation id.

use serde::{Deserialize, Serialize};

/// Correlation id assigned once per orchestration call.
///
/// Constant for the lifetime of the call and copied into every emitted
/// response and chunk.
///
/// # Examples
///
/// ```
/// use switchboard_core::TraceId;
///
/// let a = TraceId::new();
/// let b = TraceId::new();
/// assert_ne!(a.id(), b.id());
/// assert!(*a.created() > 0);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_more::Display,
)]
#[display("{}", id)]
pub struct TraceId {
    /// Opaque id
    id: String,
    /// Unix timestamp (seconds) of creation
    created: i64,
}

impl TraceId {
    /// Generates a fresh trace id stamped with the current time.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created: chrono::Utc::now().timestamp(),
        }
    }

    /// Reuses a caller-supplied id.
    pub fn with_id(id: impl Into<String>, created: i64) -> Self {
        Self {
            id: id.into(),
            created,
        }
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}
