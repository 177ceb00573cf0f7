//! Bounded, single-writer dispatch in front of another sink.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use carelog_application::AuditSink;
use carelog_core::{AppError, AppResult};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What happens to a line when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait until the writer frees a slot.
    #[default]
    Block,
    /// Reject the line immediately; the recorder reports it as a warning.
    DropWithWarning,
}

impl OverflowPolicy {
    /// Returns the configuration value for this policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::DropWithWarning => "drop",
        }
    }
}

impl Display for OverflowPolicy {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "drop" => Ok(Self::DropWithWarning),
            _ => Err(AppError::Configuration(format!(
                "audit overflow policy must be either 'block' or 'drop', got '{value}'"
            ))),
        }
    }
}

/// Sink that hands lines to a dedicated writer task over a bounded channel.
///
/// The writer task appends to the inner sink one line at a time. Call
/// [`AuditSink::shutdown`] before the runtime stops: it closes the queue and
/// waits until every accepted line has been appended.
pub struct QueuedAuditSink {
    tx: RwLock<Option<mpsc::Sender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    destination: String,
    overflow: OverflowPolicy,
}

impl QueuedAuditSink {
    /// Spawns the writer task on the current Tokio runtime.
    pub fn spawn(
        inner: Arc<dyn AuditSink>,
        capacity: usize,
        overflow: OverflowPolicy,
    ) -> AppResult<Self> {
        if capacity == 0 {
            return Err(AppError::Configuration(
                "audit queue capacity must be greater than zero".to_owned(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|error| {
            AppError::Configuration(format!("audit queue requires a Tokio runtime: {error}"))
        })?;

        let (tx, rx) = mpsc::channel::<String>(capacity);
        let destination = format!("queued({})", inner.destination());
        let writer = runtime.spawn(run_writer_loop(inner, rx));

        Ok(Self {
            tx: RwLock::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
            destination,
            overflow,
        })
    }

    async fn sender(&self) -> AppResult<mpsc::Sender<String>> {
        self.tx
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Write("audit queue has been shut down".to_owned()))
    }
}

#[async_trait]
impl AuditSink for QueuedAuditSink {
    async fn append_line(&self, line: &str) -> AppResult<()> {
        let tx = self.sender().await?;
        match self.overflow {
            OverflowPolicy::Block => tx
                .send(line.to_owned())
                .await
                .map_err(|_| AppError::Write("audit writer task has stopped".to_owned())),
            OverflowPolicy::DropWithWarning => match tx.try_send(line.to_owned()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(AppError::Write(
                    "audit queue is full; entry dropped".to_owned(),
                )),
                Err(TrySendError::Closed(_)) => {
                    Err(AppError::Write("audit writer task has stopped".to_owned()))
                }
            },
        }
    }

    fn destination(&self) -> String {
        self.destination.clone()
    }

    async fn shutdown(&self) -> AppResult<()> {
        // Appends already holding a sender finish before the writer sees the
        // channel close.
        self.tx.write().await.take();

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            writer.await.map_err(|error| {
                AppError::Internal(format!("audit writer task failed: {error}"))
            })?;
            debug!(destination = %self.destination, "audit queue drained");
        }

        Ok(())
    }
}

async fn run_writer_loop(inner: Arc<dyn AuditSink>, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(error) = inner.append_line(&line).await {
            warn!(destination = %inner.destination(), %error, "queued audit append failed");
        }
    }

    debug!(destination = %inner.destination(), "audit writer task shutting down");
}
