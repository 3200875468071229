//! Execution-unit cipher seam and the worker loop.
//!
//! The symmetric cipher running inside each worker is an external
//! collaborator; the dispatcher depends only on the [`CipherEngine`]
//! trait. [`AeadEngine`] is the shipped implementation:
//! XChaCha20-Poly1305 with the nonce packed ahead of the ciphertext and
//! the whole frame Base64-armored for transport.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use tokio::sync::mpsc;

use super::protocol::{WorkerRequest, WorkerResponse};

/// Errors reported by a cipher engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Key material was rejected at import.
    #[error("invalid key material: {reason}")]
    InvalidKey {
        /// What was wrong with the material.
        reason: String,
    },

    /// No key has been imported for the session.
    #[error("session {session_id} not initialized in this worker")]
    UnknownSession {
        /// The session the task referenced.
        session_id: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {reason}")]
    Encrypt {
        /// Engine-reported failure description.
        reason: String,
    },

    /// Decryption or authentication failed.
    #[error("decryption failed: {reason}")]
    Decrypt {
        /// Engine-reported failure description.
        reason: String,
    },
}

/// Symmetric cipher interface of an execution unit.
///
/// Key material arrives as opaque bytes and is imported once per
/// session; `seal`/`open` are then keyed per call. Implementations run
/// single-threaded inside one worker task.
pub trait CipherEngine: Clone + Send + 'static {
    /// Imported, ready-to-use key.
    type Key: Send;

    /// Import raw key material.
    fn import_key(&self, material: &[u8]) -> Result<Self::Key, EngineError>;

    /// Encrypt plaintext into a packed, transport-ready string.
    fn seal(&self, key: &Self::Key, plaintext: &[u8]) -> Result<String, EngineError>;

    /// Decrypt a packed string produced by [`seal`](Self::seal).
    fn open(&self, key: &Self::Key, packed: &str) -> Result<Vec<u8>, EngineError>;
}

/// Key size accepted by [`AeadEngine`].
pub const AEAD_KEY_SIZE: usize = 32;

/// XChaCha20 nonce size prefixed to each packed frame.
const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes).
const POLY1305_TAG_SIZE: usize = 16;

/// XChaCha20-Poly1305 engine packing frames as base64(nonce ‖ ciphertext).
#[derive(Debug, Clone, Copy, Default)]
pub struct AeadEngine;

impl CipherEngine for AeadEngine {
    type Key = chacha20poly1305::Key;

    fn import_key(&self, material: &[u8]) -> Result<Self::Key, EngineError> {
        if material.len() != AEAD_KEY_SIZE {
            return Err(EngineError::InvalidKey {
                reason: format!("expected {AEAD_KEY_SIZE} bytes, got {}", material.len()),
            });
        }
        Ok(*chacha20poly1305::Key::from_slice(material))
    }

    fn seal(&self, key: &Self::Key, plaintext: &[u8]) -> Result<String, EngineError> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| EngineError::Encrypt { reason: e.to_string() })?;

        let cipher = XChaCha20Poly1305::new(key);
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| EngineError::Encrypt { reason: "AEAD failure".to_string() })?;

        let mut frame = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        frame.extend_from_slice(&nonce);
        frame.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(frame))
    }

    fn open(&self, key: &Self::Key, packed: &str) -> Result<Vec<u8>, EngineError> {
        let frame = STANDARD
            .decode(packed)
            .map_err(|e| EngineError::Decrypt { reason: format!("invalid base64: {e}") })?;
        if frame.len() < NONCE_SIZE + POLY1305_TAG_SIZE {
            return Err(EngineError::Decrypt { reason: "packed frame too short".to_string() });
        }

        let (nonce, ciphertext) = frame.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new(key);
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| EngineError::Decrypt { reason: "authentication failed".to_string() })
    }
}

/// Drive one execution unit until its inbound channel closes.
///
/// The unit owns the per-session key map for its lifetime: once a key is
/// imported here, no other context holds it. Session init stores the key
/// without acknowledgment; a failed import is logged and the session
/// stays unknown, so later tasks against it answer with an error.
/// Encrypt/decrypt always answer, success or failure, echoing the task
/// id.
pub(crate) async fn run_worker<C: CipherEngine>(
    engine: C,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    responses: mpsc::UnboundedSender<WorkerResponse>,
) {
    let mut sessions: HashMap<String, C::Key> = HashMap::new();

    while let Some(request) = requests.recv().await {
        let response = match request {
            WorkerRequest::InitSession { session_id, key } => {
                match engine.import_key(key.as_bytes()) {
                    Ok(imported) => {
                        sessions.insert(session_id, imported);
                    },
                    Err(error) => {
                        tracing::warn!(%session_id, %error, "session key import failed");
                    },
                }
                continue;
            },
            WorkerRequest::Encrypt { id, session_id, payload, .. } => {
                match lookup(&sessions, &session_id).and_then(|key| engine.seal(key, &payload)) {
                    Ok(data) => WorkerResponse::EncryptResult { id, data },
                    Err(error) => WorkerResponse::Error { id, message: error.to_string() },
                }
            },
            WorkerRequest::Decrypt { id, session_id, payload, .. } => {
                match lookup(&sessions, &session_id).and_then(|key| engine.open(key, &payload)) {
                    Ok(data) => WorkerResponse::DecryptResult { id, data },
                    Err(error) => WorkerResponse::Error { id, message: error.to_string() },
                }
            },
        };

        if responses.send(response).is_err() {
            break;
        }
    }

    tracing::debug!("execution unit shutting down");
}

fn lookup<'a, K>(
    sessions: &'a HashMap<String, K>,
    session_id: &str,
) -> Result<&'a K, EngineError> {
    sessions
        .get(session_id)
        .ok_or_else(|| EngineError::UnknownSession { session_id: session_id.to_string() })
}
