//! Priority pool: a pending-task table plus one execution unit.
//!
//! The pool is an actor. A single task owns the pending table, so the
//! submit and receive paths share one control context and the table
//! needs no lock. The execution unit is a second task connected by two
//! unbounded channels; its replies are correlated back to callers
//! through oneshot handles registered at submission.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use super::{
    engine::{CipherEngine, run_worker},
    error::DispatchError,
    protocol::{TaskId, WorkerRequest, WorkerResponse},
};

/// Payload delivered back through a completion handle.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TaskOutput {
    /// Packed ciphertext from an encrypt task.
    Ciphertext(String),
    /// Plaintext bytes from a decrypt task.
    Plaintext(Vec<u8>),
}

/// Result kind a pending task expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpectedKind {
    Encrypt,
    Decrypt,
}

type Completion = oneshot::Sender<Result<TaskOutput, DispatchError>>;

/// Commands accepted by the pool task.
pub(crate) enum PoolCommand {
    /// Forward key material to the execution unit. Resolves as soon as
    /// the forward succeeds; no import acknowledgment is awaited.
    InitSession { request: WorkerRequest, done: oneshot::Sender<Result<(), DispatchError>> },

    /// Register a completion handle under `id` and forward the task.
    Submit { id: TaskId, request: WorkerRequest, expects: ExpectedKind, completion: Completion },

    /// Drop a pending entry without delivering anything.
    Evict { id: TaskId },
}

/// Handle to one spawned pool.
pub(crate) struct Pool {
    commands: mpsc::UnboundedSender<PoolCommand>,
}

impl Pool {
    /// Spawn the pool actor and its execution unit.
    pub(crate) fn spawn<C: CipherEngine>(label: &'static str, engine: C) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(engine, request_rx, response_tx));
        tokio::spawn(run_pool(label, command_rx, request_tx, response_rx));

        Self { commands: command_tx }
    }

    /// Hand a command to the pool task.
    pub(crate) fn send(&self, command: PoolCommand) -> Result<(), DispatchError> {
        self.commands.send(command).map_err(|_| DispatchError::WorkerUnavailable)
    }
}

/// The pool's event loop: multiplexes caller commands and unit replies
/// over the pending table it exclusively owns.
///
/// Exits when both the command channel and the unit's response channel
/// are gone; outstanding completion handles are dropped at that point
/// and their callers observe [`DispatchError::Abandoned`].
async fn run_pool(
    label: &'static str,
    mut commands: mpsc::UnboundedReceiver<PoolCommand>,
    requests: mpsc::UnboundedSender<WorkerRequest>,
    mut responses: mpsc::UnboundedReceiver<WorkerResponse>,
) {
    let mut pending: HashMap<TaskId, (ExpectedKind, Completion)> = HashMap::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(PoolCommand::InitSession { request, done }) => {
                    let forwarded =
                        requests.send(request).map_err(|_| DispatchError::WorkerUnavailable);
                    let _ = done.send(forwarded);
                },
                Some(PoolCommand::Submit { id, request, expects, completion }) => {
                    if requests.send(request).is_err() {
                        let _ = completion.send(Err(DispatchError::WorkerUnavailable));
                    } else {
                        pending.insert(id, (expects, completion));
                    }
                },
                Some(PoolCommand::Evict { id }) => {
                    pending.remove(&id);
                },
                None => break,
            },
            response = responses.recv() => match response {
                Some(response) => deliver(label, &mut pending, response),
                None => break,
            },
        }
    }

    tracing::debug!(pool = label, outstanding = pending.len(), "pool shutting down");
}

/// Resolve one unit reply against the pending table.
///
/// Unknown ids are dropped silently (a task may have been evicted by a
/// timeout, or the unit is confused); no other entry is touched. For a
/// known id the entry is removed in every case: an error message rejects
/// the caller, a result of the expected kind fulfills it, and a result
/// of the wrong kind drops the handle, which the caller observes as
/// [`DispatchError::Abandoned`].
fn deliver(
    label: &'static str,
    pending: &mut HashMap<TaskId, (ExpectedKind, Completion)>,
    response: WorkerResponse,
) {
    let id = response.id();
    let Some((expects, completion)) = pending.remove(&id) else {
        tracing::warn!(pool = label, %id, "dropping response with no pending task");
        return;
    };

    match response {
        WorkerResponse::Error { message, .. } => {
            let rejected = match expects {
                ExpectedKind::Encrypt => DispatchError::Encryption { reason: message },
                ExpectedKind::Decrypt => DispatchError::Decryption { reason: message },
            };
            let _ = completion.send(Err(rejected));
        },
        WorkerResponse::EncryptResult { data, .. } if expects == ExpectedKind::Encrypt => {
            let _ = completion.send(Ok(TaskOutput::Ciphertext(data)));
        },
        WorkerResponse::DecryptResult { data, .. } if expects == ExpectedKind::Decrypt => {
            let _ = completion.send(Ok(TaskOutput::Plaintext(data)));
        },
        _ => {
            tracing::warn!(pool = label, %id, "result kind does not match the pending task");
        },
    }
}
