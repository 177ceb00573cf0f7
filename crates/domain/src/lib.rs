//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod severity;

pub use audit::{AuditContext, AuditEntry, AuditLine, COMPLIANCE_LEVEL};
pub use severity::AuditSeverity;
