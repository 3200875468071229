//! Channel protocol between a pool and its execution unit.
//!
//! Typed counterparts of the worker message contract: requests flow into
//! the unit's inbound channel, responses come back tagged with the task
//! id they answer. Session-init requests carry no id; they are
//! fire-and-forget.

use std::fmt;

use zeroize::Zeroizing;

use super::Priority;

/// Correlation id for one outstanding task, unique per dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Imported key material, opaque to the dispatcher.
///
/// The bytes travel from the caller to each execution unit and are
/// zeroed on drop. The dispatcher never inspects them, and `Debug`
/// never prints them.
#[derive(Clone)]
pub struct SessionKey(Zeroizing<Vec<u8>>);

impl SessionKey {
    /// Wrap raw key material.
    pub fn new(material: Vec<u8>) -> Self {
        Self(Zeroizing::new(material))
    }

    /// Borrow the raw bytes. Only the execution unit's import path
    /// should look at these.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey").field("len", &self.0.len()).finish_non_exhaustive()
    }
}

/// Messages sent to an execution unit.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Import key material for a session. No acknowledgment is sent.
    InitSession {
        /// Opaque session identifier.
        session_id: String,
        /// Key material to import.
        key: SessionKey,
    },

    /// Encrypt `payload` under the session's key.
    Encrypt {
        /// Correlation id echoed in the response.
        id: TaskId,
        /// Session whose key to use.
        session_id: String,
        /// Plaintext bytes.
        payload: Vec<u8>,
        /// Declared priority class (already routed; carried for the
        /// unit's own accounting).
        priority: Priority,
    },

    /// Decrypt packed `payload` under the session's key.
    Decrypt {
        /// Correlation id echoed in the response.
        id: TaskId,
        /// Session whose key to use.
        session_id: String,
        /// Packed ciphertext produced by a previous encrypt.
        payload: String,
        /// Declared priority class.
        priority: Priority,
    },
}

/// Messages emitted by an execution unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerResponse {
    /// Successful encryption.
    EncryptResult {
        /// Id of the task this answers.
        id: TaskId,
        /// Packed ciphertext.
        data: String,
    },

    /// Successful decryption.
    DecryptResult {
        /// Id of the task this answers.
        id: TaskId,
        /// Plaintext bytes.
        data: Vec<u8>,
    },

    /// The task failed inside the unit.
    Error {
        /// Id of the task this answers.
        id: TaskId,
        /// Failure description, surfaced verbatim to the caller.
        message: String,
    },
}

impl WorkerResponse {
    /// The task id this response correlates to.
    pub fn id(&self) -> TaskId {
        match self {
            Self::EncryptResult { id, .. } | Self::DecryptResult { id, .. } | Self::Error { id, .. } => *id,
        }
    }
}
