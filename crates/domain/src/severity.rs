use std::fmt::{Display, Formatter};
use std::str::FromStr;

use carelog_core::AppError;
use serde::{Deserialize, Serialize};

/// Severity attached to every audit entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditSeverity {
    /// Routine action.
    #[default]
    Info,
    /// Action that deserves a reviewer's attention.
    Warning,
    /// Failed action.
    Error,
    /// Failure with patient-safety or compliance impact.
    Critical,
}

impl AuditSeverity {
    /// Returns the level name written into persisted line headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Returns all known severities, lowest first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AuditSeverity] = &[
            AuditSeverity::Info,
            AuditSeverity::Warning,
            AuditSeverity::Error,
            AuditSeverity::Critical,
        ];

        ALL
    }
}

impl Display for AuditSeverity {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AuditSeverity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| AppError::Configuration(format!("unknown audit severity '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use carelog_core::AppError;

    use super::AuditSeverity;

    #[test]
    fn parses_level_names_case_insensitively() {
        assert_eq!(
            AuditSeverity::from_str("error").ok(),
            Some(AuditSeverity::Error)
        );
        assert_eq!(
            AuditSeverity::from_str("CRITICAL").ok(),
            Some(AuditSeverity::Critical)
        );
    }

    #[test]
    fn rejects_unknown_level_names() {
        let result = AuditSeverity::from_str("debug");
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(AuditSeverity::default(), AuditSeverity::Info);
    }

    #[test]
    fn serializes_as_header_level_name() {
        for severity in AuditSeverity::all() {
            let encoded = serde_json::to_string(severity).unwrap_or_default();
            assert_eq!(encoded, format!("\"{}\"", severity.as_str()));
        }
    }
}
