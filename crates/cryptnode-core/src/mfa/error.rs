//! MFA error taxonomy.
//!
//! Malformed tokens are not errors here; they verify negative. The only
//! failure modes are a missing secure randomness source (fatal) and the
//! storage backend being unreachable (propagated unchanged).

use thiserror::Error;

use crate::{env::RandomError, storage::StorageError};

/// Errors surfaced by the MFA service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MfaError {
    /// No secure randomness source on this platform.
    #[error(transparent)]
    Random(#[from] RandomError),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
