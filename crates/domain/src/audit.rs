use carelog_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AuditSeverity;

/// Compliance tag stamped on every audit entry.
pub const COMPLIANCE_LEVEL: &str = "healthcare_audit";

const HEADER_SEPARATOR: &str = " - ";
const AUDIT_MARKER: &str = "AUDIT: ";

/// Ambient request context attached to every entry a recorder writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    /// Session identifier, if the process runs inside one.
    pub session_id: Option<String>,
    /// Client network address, if known.
    pub client_address: Option<String>,
}

/// One structured record of a single application action.
///
/// Entries are immutable once built and carry no identity beyond their
/// position in the audit stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    timestamp: DateTime<Utc>,
    action: NonEmptyString,
    user_id: Option<String>,
    patient_id: Option<String>,
    session_id: Option<String>,
    #[serde(rename = "ip_address")]
    client_address: Option<String>,
    #[serde(default)]
    details: Map<String, Value>,
    #[serde(default)]
    severity: AuditSeverity,
    compliance_level: String,
}

impl AuditEntry {
    /// Builds an entry stamped at `timestamp`.
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        action: NonEmptyString,
        user_id: Option<String>,
        patient_id: Option<String>,
        context: &AuditContext,
        details: Map<String, Value>,
        severity: AuditSeverity,
    ) -> Self {
        Self {
            timestamp,
            action,
            user_id,
            patient_id,
            session_id: context.session_id.clone(),
            client_address: context.client_address.clone(),
            details,
            severity,
            compliance_level: COMPLIANCE_LEVEL.to_owned(),
        }
    }

    /// Returns the instant the entry was created.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the action description.
    #[must_use]
    pub fn action(&self) -> &NonEmptyString {
        &self.action
    }

    /// Returns the acting principal.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the affected patient.
    #[must_use]
    pub fn patient_id(&self) -> Option<&str> {
        self.patient_id.as_deref()
    }

    /// Returns the ambient session identifier.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the ambient client address.
    #[must_use]
    pub fn client_address(&self) -> Option<&str> {
        self.client_address.as_deref()
    }

    /// Returns the free-form detail payload.
    #[must_use]
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Returns the entry severity.
    #[must_use]
    pub fn severity(&self) -> AuditSeverity {
        self.severity
    }

    /// Returns the compliance tag.
    #[must_use]
    pub fn compliance_level(&self) -> &str {
        self.compliance_level.as_str()
    }
}

/// A persisted audit line:
/// `<timestamp> - <LEVEL> - AUDIT: <json>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLine {
    /// Header timestamp, millisecond precision.
    pub logged_at: DateTime<Utc>,
    /// Header level.
    pub severity: AuditSeverity,
    /// Decoded JSON payload.
    pub entry: AuditEntry,
}

impl AuditLine {
    /// Renders an entry as one line, without the trailing newline.
    pub fn render(entry: &AuditEntry) -> AppResult<String> {
        let payload = serde_json::to_string(entry).map_err(|error| {
            AppError::Serialization(format!("failed to encode audit entry: {error}"))
        })?;

        Ok(format!(
            "{}{HEADER_SEPARATOR}{}{HEADER_SEPARATOR}{AUDIT_MARKER}{payload}",
            entry
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.severity().as_str(),
        ))
    }

    /// Parses one persisted line back into its header and entry.
    pub fn parse(line: &str) -> AppResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (timestamp, rest) = line
            .split_once(HEADER_SEPARATOR)
            .ok_or_else(|| AppError::Validation("audit line has no header".to_owned()))?;
        let (level, rest) = rest
            .split_once(HEADER_SEPARATOR)
            .ok_or_else(|| AppError::Validation("audit line has no level".to_owned()))?;
        let payload = rest.strip_prefix(AUDIT_MARKER).ok_or_else(|| {
            AppError::Validation("audit line is missing the AUDIT marker".to_owned())
        })?;

        let logged_at = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|error| {
                AppError::Validation(format!(
                    "invalid audit line timestamp '{timestamp}': {error}"
                ))
            })?
            .with_timezone(&Utc);
        let severity = level.parse::<AuditSeverity>()?;
        let entry = serde_json::from_str::<AuditEntry>(payload).map_err(|error| {
            AppError::Validation(format!("invalid audit line payload: {error}"))
        })?;

        Ok(Self {
            logged_at,
            severity,
            entry,
        })
    }
}
