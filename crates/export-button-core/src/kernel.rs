//! Kernel connection trait and execute request plumbing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::IopubSignal;

/// Kernel error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("Kernel raised {ename}: {evalue}")]
    Execution { ename: String, evalue: String },
    #[error("Execution aborted")]
    Aborted,
    #[error("Kernel connection closed")]
    Disconnected,
    #[error("Kernel is dead")]
    Dead,
}

/// Code execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Client-assigned message id; iopub replies carry it as parent id.
    pub msg_id: String,
    pub code: String,
    #[serde(default)]
    pub silent: bool,
    #[serde(default = "default_true")]
    pub store_history: bool,
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
}

const fn default_true() -> bool {
    true
}

impl ExecuteRequest {
    /// Create a request with a fresh message id.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            msg_id: Uuid::new_v4().to_string(),
            code: code.into(),
            silent: false,
            store_history: true,
            stop_on_error: true,
        }
    }

    /// Abort queued executions if this one fails.
    #[must_use]
    pub const fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }
}

/// Successful execute reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteReply {
    pub execution_count: u32,
}

/// Completion handle for one execute request.
#[must_use = "await `done()` or call `detach()` explicitly"]
pub struct ExecuteFuture {
    msg_id: String,
    reply: oneshot::Receiver<Result<ExecuteReply, KernelError>>,
}

impl ExecuteFuture {
    /// Wrap the reply channel of request `msg_id`.
    pub fn new(
        msg_id: impl Into<String>,
        reply: oneshot::Receiver<Result<ExecuteReply, KernelError>>,
    ) -> Self {
        Self {
            msg_id: msg_id.into(),
            reply,
        }
    }

    /// Id of the request this future tracks.
    #[must_use]
    pub fn msg_id(&self) -> &str {
        &self.msg_id
    }

    /// Wait until the kernel has finished the request.
    ///
    /// # Errors
    /// Returns the kernel's execution error, or `Disconnected` if the kernel
    /// went away without replying.
    pub async fn done(self) -> Result<ExecuteReply, KernelError> {
        self.reply.await.unwrap_or(Err(KernelError::Disconnected))
    }

    /// Give up interest in completion. The request keeps running.
    pub fn detach(self) {
        tracing::trace!(msg_id = %self.msg_id, "execute future detached");
    }
}

/// A live kernel accepting code for execution.
pub trait KernelConnection: Send + Sync {
    /// Kernel identifier.
    fn id(&self) -> &str;

    /// Send an execute request; the returned future settles when the kernel
    /// has finished it.
    ///
    /// # Errors
    /// Returns error if the request cannot be sent.
    fn request_execute(&self, request: ExecuteRequest) -> Result<ExecuteFuture, KernelError>;

    /// Output message signal.
    fn iopub(&self) -> &Arc<IopubSignal>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_get_unique_ids() {
        let a = ExecuteRequest::new("1");
        let b = ExecuteRequest::new("1");
        assert_ne!(a.msg_id, b.msg_id);
        assert!(a.stop_on_error);
    }

    #[test]
    fn test_dropped_sender_reports_disconnected() {
        let (tx, rx) = oneshot::channel();
        let future = ExecuteFuture::new("req", rx);
        drop(tx);
        assert_eq!(
            tokio_test::block_on(future.done()),
            Err(KernelError::Disconnected)
        );
    }

    #[test]
    fn test_done_yields_reply() {
        let (tx, rx) = oneshot::channel();
        let future = ExecuteFuture::new("req", rx);
        assert_eq!(future.msg_id(), "req");
        tx.send(Ok(ExecuteReply { execution_count: 7 })).unwrap();
        assert_eq!(
            tokio_test::block_on(future.done()),
            Ok(ExecuteReply { execution_count: 7 })
        );
    }
}
