//! Dispatcher error taxonomy.
//!
//! Worker-reported failures surface to the original caller carrying the
//! unit's own message and are never retried. An unanswered task is not
//! an error unless a timeout is configured; without one, the call
//! simply stays pending.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the crypto task dispatcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The execution unit reported an encryption failure for this task.
    #[error("encryption failed: {reason}")]
    Encryption {
        /// Worker-reported failure description.
        reason: String,
    },

    /// The execution unit reported a decryption failure for this task.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Worker-reported failure description.
        reason: String,
    },

    /// The pool or its execution unit is no longer accepting work.
    #[error("worker unavailable")]
    WorkerUnavailable,

    /// The pending entry was discarded without a result being delivered.
    #[error("task abandoned without a result")]
    Abandoned,

    /// The task did not complete within the configured bound.
    #[error("task timed out after {elapsed:?}")]
    Timeout {
        /// The configured per-call bound.
        elapsed: Duration,
    },
}
