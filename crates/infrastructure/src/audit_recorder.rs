//! Recorder configuration and the process-wide recorder instance.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use carelog_application::{AuditService, AuditSink};
use carelog_core::{AppError, AppResult};
use carelog_domain::AuditContext;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{FileAuditSink, OverflowPolicy, QueuedAuditSink};

/// Destination used when `AUDIT_LOG_PATH` is unset.
pub const DEFAULT_AUDIT_LOG_PATH: &str = "./data/logs/audit.log";

/// Queue size used when `AUDIT_QUEUE_CAPACITY` is unset.
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

static GLOBAL_AUDIT_RECORDER: RecorderSlot = RecorderSlot::new();

/// How recorded lines reach the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuditDispatch {
    /// Append inside the `record` call.
    #[default]
    Sync,
    /// Hand off to a dedicated writer task through a bounded queue.
    Queued {
        /// Maximum number of pending lines.
        capacity: usize,
        /// Behaviour when the queue is full.
        overflow: OverflowPolicy,
    },
}

/// Everything needed to build an audit recorder, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecorderSettings {
    /// Audit log file.
    pub destination: PathBuf,
    /// Ambient context stamped on every entry.
    pub context: AuditContext,
    /// Echo a one-line summary of each entry to stdout.
    pub echo_to_stdout: bool,
    /// Write path.
    pub dispatch: AuditDispatch,
}

impl Default for AuditRecorderSettings {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(DEFAULT_AUDIT_LOG_PATH),
            context: AuditContext::default(),
            echo_to_stdout: true,
            dispatch: AuditDispatch::Sync,
        }
    }
}

impl AuditRecorderSettings {
    /// Reads settings from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    pub fn from_lookup(read_var: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let lookup = |name: &str| read_var(name).filter(|value| !value.trim().is_empty());

        let destination = lookup("AUDIT_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG_PATH));

        let deployment_mode = lookup("APP_ENV")
            .or_else(|| lookup("ENVIRONMENT"))
            .unwrap_or_else(|| "development".to_owned());
        let echo_to_stdout = !deployment_mode.trim().eq_ignore_ascii_case("production");

        let dispatch = match lookup("AUDIT_DISPATCH")
            .unwrap_or_else(|| "sync".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "sync" => AuditDispatch::Sync,
            "queued" => {
                let capacity = lookup("AUDIT_QUEUE_CAPACITY")
                    .map(|value| {
                        value.trim().parse::<usize>().map_err(|error| {
                            AppError::Configuration(format!(
                                "invalid AUDIT_QUEUE_CAPACITY '{value}': {error}"
                            ))
                        })
                    })
                    .transpose()?
                    .unwrap_or(DEFAULT_AUDIT_QUEUE_CAPACITY);
                let overflow = lookup("AUDIT_OVERFLOW_POLICY")
                    .map(|value| value.parse::<OverflowPolicy>())
                    .transpose()?
                    .unwrap_or_default();

                AuditDispatch::Queued { capacity, overflow }
            }
            other => {
                return Err(AppError::Configuration(format!(
                    "AUDIT_DISPATCH must be either 'sync' or 'queued', got '{other}'"
                )));
            }
        };

        Ok(Self {
            destination,
            context: AuditContext {
                session_id: lookup("SESSION_ID"),
                client_address: lookup("CLIENT_IP"),
            },
            echo_to_stdout,
            dispatch,
        })
    }
}

/// Opens the configured destination and returns a recorder bound to it.
///
/// With queued dispatch, call [`AuditService::shutdown`] before the runtime
/// stops so the writer task can drain.
pub async fn configure_audit_recorder(
    settings: &AuditRecorderSettings,
) -> AppResult<AuditService> {
    let file_sink = FileAuditSink::open(&settings.destination).await?;

    let sink: Arc<dyn AuditSink> = match settings.dispatch {
        AuditDispatch::Sync => file_sink,
        AuditDispatch::Queued { capacity, overflow } => {
            Arc::new(QueuedAuditSink::spawn(file_sink, capacity, overflow)?)
        }
    };

    info!(
        destination = %sink.destination(),
        echo = settings.echo_to_stdout,
        "audit recorder configured"
    );

    Ok(AuditService::new(
        sink,
        settings.context.clone(),
        settings.echo_to_stdout,
    ))
}

/// Returns the process-wide recorder, configuring it from the environment
/// on first use.
pub async fn global_audit_recorder() -> AppResult<AuditService> {
    GLOBAL_AUDIT_RECORDER
        .get_or_configure(|| async {
            let settings = AuditRecorderSettings::from_env()?;
            configure_audit_recorder(&settings).await
        })
        .await
}

/// Configures the process-wide recorder with explicit settings.
///
/// If the recorder already exists the existing instance is returned and
/// `settings` is ignored.
pub async fn install_global_audit_recorder(
    settings: AuditRecorderSettings,
) -> AppResult<AuditService> {
    GLOBAL_AUDIT_RECORDER
        .get_or_configure(|| async move { configure_audit_recorder(&settings).await })
        .await
}

/// One-time slot holding a recorder. A failed initialization leaves the slot
/// empty so a later call can retry.
pub(crate) struct RecorderSlot {
    cell: OnceCell<AuditService>,
}

impl RecorderSlot {
    pub(crate) const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub(crate) async fn get_or_configure<F, Fut>(&self, configure: F) -> AppResult<AuditService>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<AuditService>>,
    {
        self.cell.get_or_try_init(configure).await.cloned()
    }
}
