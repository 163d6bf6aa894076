//! In-process kernel driven by a scripted responder.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{
    ExecuteFuture, ExecuteReply, ExecuteRequest, ExecutionState, IopubContent, IopubMessage,
    IopubSignal, KernelConnection, KernelError, MimeBundle,
};

/// How the in-memory kernel answers one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Publish an `execute_result` with this `text/plain` and succeed.
    Value(String),
    /// Publish stdout text only and succeed.
    Stream(String),
    /// Publish an `error` message and fail the request.
    Error { ename: String, evalue: String },
    /// Never finish the request.
    ///
    /// The reply channel is held until the kernel is dropped, so every
    /// pending request costs memory for the kernel's lifetime.
    Pending,
}

type Responder = Arc<dyn Fn(&ExecuteRequest) -> ScriptedReply + Send + Sync>;

struct Job {
    request: ExecuteRequest,
    reply: oneshot::Sender<Result<ExecuteReply, KernelError>>,
}

/// Kernel that runs no code and answers requests from a responder.
///
/// Requests are handled one at a time in arrival order by a background
/// task, publishing `status`/`execute_input`/output messages on iopub the
/// way a real kernel does. Useful for development and tests.
pub struct MemoryKernel {
    id: String,
    iopub: Arc<IopubSignal>,
    requests: Mutex<Vec<ExecuteRequest>>,
    queue: mpsc::UnboundedSender<Job>,
}

impl MemoryKernel {
    /// Start a kernel on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ExecuteRequest) -> ScriptedReply + Send + Sync + 'static,
    {
        let (queue, rx) = mpsc::unbounded_channel();
        let iopub = Arc::new(IopubSignal::new());
        tokio::spawn(run_worker(rx, Arc::clone(&iopub), Arc::new(responder)));

        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            iopub,
            requests: Mutex::new(Vec::new()),
            queue,
        })
    }

    /// All requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ExecuteRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Code of every request received so far.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.code).collect()
    }
}

impl KernelConnection for MemoryKernel {
    fn id(&self) -> &str {
        &self.id
    }

    fn request_execute(&self, request: ExecuteRequest) -> Result<ExecuteFuture, KernelError> {
        let (reply, rx) = oneshot::channel();
        let future = ExecuteFuture::new(request.msg_id.clone(), rx);

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        self.queue
            .send(Job { request, reply })
            .map_err(|_| KernelError::Dead)?;
        Ok(future)
    }

    fn iopub(&self) -> &Arc<IopubSignal> {
        &self.iopub
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    iopub: Arc<IopubSignal>,
    responder: Responder,
) {
    let mut execution_count = 0u32;
    // Hung requests keep their reply channel open until the kernel goes away.
    let mut hung = Vec::new();

    while let Some(Job { request, reply }) = rx.recv().await {
        execution_count += 1;
        let parent = Some(request.msg_id.as_str());

        iopub.emit(&IopubMessage::reply_to(
            parent,
            IopubContent::Status {
                execution_state: ExecutionState::Busy,
            },
        ));
        iopub.emit(&IopubMessage::reply_to(
            parent,
            IopubContent::ExecuteInput {
                code: request.code.clone(),
                execution_count,
            },
        ));

        let outcome = match responder(&request) {
            ScriptedReply::Value(text) => {
                iopub.emit(&IopubMessage::reply_to(
                    parent,
                    IopubContent::ExecuteResult {
                        execution_count,
                        data: MimeBundle::text_plain_only(text),
                        metadata: serde_json::Value::Null,
                    },
                ));
                Some(Ok(ExecuteReply { execution_count }))
            }
            ScriptedReply::Stream(text) => {
                iopub.emit(&IopubMessage::reply_to(
                    parent,
                    IopubContent::Stream {
                        name: "stdout".to_string(),
                        text,
                    },
                ));
                Some(Ok(ExecuteReply { execution_count }))
            }
            ScriptedReply::Error { ename, evalue } => {
                iopub.emit(&IopubMessage::reply_to(
                    parent,
                    IopubContent::Error {
                        ename: ename.clone(),
                        evalue: evalue.clone(),
                        traceback: Vec::new(),
                    },
                ));
                Some(Err(KernelError::Execution { ename, evalue }))
            }
            ScriptedReply::Pending => None,
        };

        match outcome {
            Some(result) => {
                iopub.emit(&IopubMessage::reply_to(
                    parent,
                    IopubContent::Status {
                        execution_state: ExecutionState::Idle,
                    },
                ));
                let _ = reply.send(result); // caller may have detached
            }
            None => {
                tracing::debug!(msg_id = %request.msg_id, "request left pending");
                hung.push(reply);
            }
        }

        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_reply_publishes_result_then_completes() {
        let kernel = MemoryKernel::spawn(|_| ScriptedReply::Value("42".into()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = Arc::clone(&seen);
            kernel.iopub().connect(move |msg| {
                seen.lock().unwrap().push((
                    msg.parent_msg_id().map(str::to_string),
                    msg.content.msg_type(),
                ));
            })
        };

        let future = kernel.request_execute(ExecuteRequest::new("6 * 7")).unwrap();
        let msg_id = future.msg_id().to_string();
        let reply = future.done().await.unwrap();
        assert_eq!(reply.execution_count, 1);

        let seen = seen.lock().unwrap().clone();
        assert!(seen.iter().all(|(parent, _)| parent.as_deref() == Some(msg_id.as_str())));
        let kinds: Vec<_> = seen.iter().map(|(_, kind)| *kind).collect();
        assert_eq!(kinds, ["status", "execute_input", "execute_result", "status"]);
        assert_eq!(kernel.codes(), vec!["6 * 7".to_string()]);
    }

    #[tokio::test]
    async fn test_error_reply_fails_future() {
        let kernel = MemoryKernel::spawn(|_| ScriptedReply::Error {
            ename: "NameError".into(),
            evalue: "name 'x' is not defined".into(),
        });

        let err = kernel
            .request_execute(ExecuteRequest::new("x"))
            .unwrap()
            .done()
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::Execution { ref ename, .. } if ename == "NameError"));
    }

    #[tokio::test]
    async fn test_pending_reply_never_completes() {
        let kernel = MemoryKernel::spawn(|_| ScriptedReply::Pending);
        let future = kernel.request_execute(ExecuteRequest::new("while True: pass")).unwrap();

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), future.done()).await;
        assert!(waited.is_err());
    }
}
