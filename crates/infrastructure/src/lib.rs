//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod audit_recorder;
mod file_audit_sink;
mod in_memory_audit_sink;
mod queued_audit_sink;

pub use audit_recorder::{
    AuditDispatch, AuditRecorderSettings, DEFAULT_AUDIT_LOG_PATH, DEFAULT_AUDIT_QUEUE_CAPACITY,
    configure_audit_recorder, global_audit_recorder, install_global_audit_recorder,
};
pub use file_audit_sink::FileAuditSink;
pub use in_memory_audit_sink::InMemoryAuditSink;
pub use queued_audit_sink::{OverflowPolicy, QueuedAuditSink};
