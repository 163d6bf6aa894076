//! Environment exporter: ask the kernel for its prefix, then hand it to the
//! export script.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use export_button_core::{
    ExecuteRequest, IopubMessage, KernelConnection, KernelError, MimeBundle, SessionContext,
};
use thiserror::Error;

use crate::config::{ExporterConfig, ResultMatching};

/// Export error.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Environment prefix query failed: {0}")]
    Query(#[from] KernelError),
}

/// What an export run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No kernel attached; nothing was sent.
    NoKernel,
    /// The export script was launched with this prefix.
    Exported { env_prefix: String },
    /// The query finished without an `execute_result`, or the export request
    /// could not be sent.
    NoResult,
}

/// Exporter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    AwaitingResult,
}

/// Strip one leading and one trailing `'` from a Python string repr.
#[must_use]
pub fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix('\'').unwrap_or(text);
    text.strip_suffix('\'').unwrap_or(text)
}

/// Launches the environment export script for a notebook's kernel.
#[derive(Debug, Default)]
pub struct EnvironmentExporter {
    config: ExporterConfig,
    in_flight: AtomicUsize,
}

impl EnvironmentExporter {
    /// Create an exporter.
    #[must_use]
    pub const fn new(config: ExporterConfig) -> Self {
        Self {
            config,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// `AwaitingResult` while any export is waiting on its query.
    #[must_use]
    pub fn state(&self) -> ExportState {
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            ExportState::Idle
        } else {
            ExportState::AwaitingResult
        }
    }

    /// Query the kernel attached to `session` for its environment prefix and
    /// launch the export script with it.
    ///
    /// The iopub handler is attached only while the query is in flight and is
    /// detached on every exit path, including when this future is dropped.
    /// There is no timeout: a kernel that never finishes the query keeps this
    /// future pending.
    ///
    /// # Errors
    /// Returns error if the query cannot be sent or the kernel fails it.
    pub async fn export(&self, session: &SessionContext) -> Result<ExportOutcome, ExportError> {
        let Some(kernel) = session.kernel() else {
            tracing::error!(session = session.name(), "No kernel found.");
            return Ok(ExportOutcome::NoKernel);
        };

        let _in_flight = InFlight::enter(&self.in_flight);
        let query = ExecuteRequest::new(self.config.query_code.clone());
        let exported = Arc::new(Mutex::new(None));

        let subscription = kernel.iopub().connect(self.result_handler(
            Arc::clone(&kernel),
            &query.msg_id,
            Arc::clone(&exported),
        ));

        tracing::debug!(kernel = kernel.id(), msg_id = %query.msg_id, "Querying environment prefix");
        let done = kernel.request_execute(query)?.done().await;
        subscription.disconnect();
        done?;

        let env_prefix = exported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(env_prefix.map_or(ExportOutcome::NoResult, |env_prefix| {
            ExportOutcome::Exported { env_prefix }
        }))
    }

    fn result_handler(
        &self,
        kernel: Arc<dyn KernelConnection>,
        query_id: &str,
        exported: Arc<Mutex<Option<String>>>,
    ) -> impl Fn(&IopubMessage) + Send + Sync + use<> {
        let config = self.config.clone();
        let query_id = query_id.to_string();

        move |msg| {
            let Some(bundle) = msg.execute_result() else {
                return;
            };
            if config.matching == ResultMatching::SameRequest
                && msg.parent_msg_id() != Some(query_id.as_str())
            {
                tracing::trace!(parent = ?msg.parent_msg_id(), "Ignoring result of another request");
                return;
            }
            let Some(env_prefix) = env_prefix_of(bundle).map(str::to_string) else {
                tracing::debug!("Result has no text/plain representation");
                return;
            };

            let action = ExecuteRequest::new(config.action_code(&env_prefix))
                .stop_on_error(config.stop_on_error);

            tracing::info!(%env_prefix, "Launching environment export");
            match kernel.request_execute(action) {
                Ok(future) => {
                    future.detach();
                    *exported.lock().unwrap_or_else(PoisonError::into_inner) = Some(env_prefix);
                }
                Err(e) => tracing::warn!(%env_prefix, "Failed to send export request: {e}"),
            }
        }
    }
}

/// Counts an export as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The `text/plain` value of a result message, unquoted.
#[must_use]
pub fn env_prefix_of(bundle: &MimeBundle) -> Option<&str> {
    bundle.text_plain().map(strip_quotes)
}
