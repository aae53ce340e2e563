//! Cross-thread submission into the decision cycle.
//!
//! Worker threads that encode observations off the orchestrator thread
//! send their results through an [`IngressSender`]. The channel is a
//! bounded crossbeam channel; the orchestrator drains it at the start of
//! every running cycle, so the pending queue and admission state are
//! still only mutated on the orchestrator's thread.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use warden_core::{AgentHandle, IngressError};
use warden_obs::EncodedVector;

/// A message from a worker thread to the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub enum IngressMessage {
    /// Queue a decision request for an already-encoded observation.
    Enqueue {
        /// The requesting agent.
        handle: AgentHandle,
        /// Its encoded observation.
        vector: EncodedVector,
    },
    /// The agent's host entity has gone away.
    Despawn(AgentHandle),
}

/// Cloneable, non-blocking handle for submitting [`IngressMessage`]s.
#[derive(Clone, Debug)]
pub struct IngressSender {
    tx: Sender<IngressMessage>,
}

impl IngressSender {
    /// Submit a message without blocking.
    pub fn submit(&self, msg: IngressMessage) -> Result<(), IngressError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => IngressError::Full,
            TrySendError::Disconnected(_) => IngressError::Disconnected,
        })
    }

    /// Submit an [`IngressMessage::Enqueue`].
    pub fn enqueue(&self, handle: AgentHandle, vector: EncodedVector) -> Result<(), IngressError> {
        self.submit(IngressMessage::Enqueue { handle, vector })
    }

    /// Submit an [`IngressMessage::Despawn`].
    pub fn despawn(&self, handle: AgentHandle) -> Result<(), IngressError> {
        self.submit(IngressMessage::Despawn(handle))
    }

    /// Messages waiting to be drained.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether no messages are waiting.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Orchestrator-side end of the ingress channel.
#[derive(Debug)]
pub(crate) struct IngressReceiver {
    rx: Receiver<IngressMessage>,
}

impl IngressReceiver {
    /// The next queued message, without blocking.
    pub(crate) fn try_recv(&self) -> Option<IngressMessage> {
        self.rx.try_recv().ok()
    }
}

/// Create a bounded ingress channel.
pub(crate) fn channel(capacity: usize) -> (IngressSender, IngressReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (IngressSender { tx }, IngressReceiver { rx })
}
