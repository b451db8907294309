use thiserror::Error;

use super::identity::{Identity, IdentityId, IdentityProfile};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error("reference sample is empty")]
    EmptySample,
    #[error("stored identity {id} is corrupt: {reason}")]
    CorruptRecord { id: IdentityId, reason: String },
}

/// Durable mapping from identity id to profile and reference sample.
///
/// Identities are append-only: there is no update or delete.
pub trait IdentityStore: Send {
    /// Persists a new identity atomically and returns its id. On failure
    /// nothing is stored and no id is consumed.
    fn create(&mut self, profile: &IdentityProfile, sample: &[u8]) -> Result<IdentityId, StoreError>;

    /// `"{name} ({gender}, {age})"` for a known id, `"Unknown"` otherwise.
    fn display_name(&self, id: IdentityId) -> String;

    /// All stored identities in id order.
    fn identities(&self) -> Result<Vec<Identity>, StoreError>;
}
