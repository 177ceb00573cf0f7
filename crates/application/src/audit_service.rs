use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use carelog_core::{AppError, AppResult, NonEmptyString};
use carelog_domain::{AuditContext, AuditEntry, AuditLine, AuditSeverity};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Port for append-only audit line persistence.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one rendered line. Implementations add the line terminator
    /// and must never interleave two lines.
    async fn append_line(&self, line: &str) -> AppResult<()>;

    /// Human-readable destination label used in operational warnings.
    fn destination(&self) -> String;

    /// Flushes anything accepted but not yet persisted. Sinks that write
    /// inside `append_line` have nothing to do.
    async fn shutdown(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Caller-supplied fields for one audit entry.
#[derive(Debug, Clone)]
pub struct AuditRecordInput {
    action: String,
    user_id: Option<String>,
    patient_id: Option<String>,
    details: Map<String, Value>,
    severity: AuditSeverity,
    detail_error: Option<String>,
}

impl AuditRecordInput {
    /// Starts an input for the given action description.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            user_id: None,
            patient_id: None,
            details: Map::new(),
            severity: AuditSeverity::default(),
            detail_error: None,
        }
    }

    /// Sets the acting principal.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the affected patient.
    #[must_use]
    pub fn patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    /// Overrides the default `INFO` severity.
    #[must_use]
    pub fn severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Adds one detail value. A value that cannot be encoded as JSON
    /// makes the whole entry fail at record time.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.details.insert(key, value);
            }
            Err(error) if self.detail_error.is_none() => {
                self.detail_error = Some(format!("detail '{key}' is not representable: {error}"));
            }
            Err(_) => {}
        }
        self
    }

    /// Merges an already encoded detail mapping.
    #[must_use]
    pub fn details(mut self, details: Map<String, Value>) -> Self {
        self.details.extend(details);
        self
    }
}

/// Audit recorder handle bound to one sink.
///
/// Clones share the sink. Ambient context is captured at construction and
/// never re-read while recording.
#[derive(Clone)]
pub struct AuditService {
    sink: Arc<dyn AuditSink>,
    context: Arc<AuditContext>,
    echo_to_stdout: bool,
}

impl AuditService {
    /// Creates a recorder from a sink implementation.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, context: AuditContext, echo_to_stdout: bool) -> Self {
        Self {
            sink,
            context: Arc::new(context),
            echo_to_stdout,
        }
    }

    /// Records one action. Failures are reported as warnings and never
    /// reach the caller.
    pub async fn record(&self, input: AuditRecordInput) {
        let action = input.action.clone();
        if let Err(error) = self.try_record(input).await {
            match &error {
                AppError::Write(_) => warn!(
                    destination = %self.sink.destination(),
                    action = %action,
                    %error,
                    "audit append failed"
                ),
                _ => warn!(action = %action, %error, "audit entry dropped"),
            }
        }
    }

    /// Records one action and returns the outcome.
    pub async fn try_record(&self, input: AuditRecordInput) -> AppResult<()> {
        let entry = self.build_entry(input)?;
        let line = AuditLine::render(&entry)?;
        self.sink.append_line(&line).await?;

        if self.echo_to_stdout {
            // Stdout may be closed; println! would panic.
            let _ = write_summary(&mut std::io::stdout().lock(), &entry);
        }

        Ok(())
    }

    /// Waits until every entry accepted so far is persisted. Entries
    /// recorded afterwards may be rejected.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.sink.shutdown().await
    }

    /// Returns the ambient context stamped on every entry.
    #[must_use]
    pub fn context(&self) -> &AuditContext {
        &self.context
    }

    /// Returns whether entries are echoed to standard output.
    #[must_use]
    pub fn echoes_to_stdout(&self) -> bool {
        self.echo_to_stdout
    }

    /// Returns the sink destination label.
    #[must_use]
    pub fn destination(&self) -> String {
        self.sink.destination()
    }

    /// Returns true when both handles append through the same sink.
    #[must_use]
    pub fn shares_sink_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sink, &other.sink)
    }

    fn build_entry(&self, input: AuditRecordInput) -> AppResult<AuditEntry> {
        if let Some(detail_error) = input.detail_error {
            return Err(AppError::Serialization(detail_error));
        }

        let action = NonEmptyString::new(input.action)
            .map_err(|_| AppError::Validation("audit action must not be empty".to_owned()))?;

        Ok(AuditEntry::new(
            Utc::now(),
            action,
            input.user_id,
            input.patient_id,
            &self.context,
            input.details,
            input.severity,
        ))
    }
}

fn write_summary(out: &mut impl Write, entry: &AuditEntry) -> std::io::Result<()> {
    writeln!(
        out,
        "[AUDIT] {} - User: {} - Patient: {}",
        entry.action().as_str(),
        entry.user_id().unwrap_or("None"),
        entry.patient_id().unwrap_or("None"),
    )
}

#[cfg(test)]
mod tests;
