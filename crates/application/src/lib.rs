//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_service;

pub use audit_service::{AuditRecordInput, AuditService, AuditSink};
