use std::sync::Arc;

use async_trait::async_trait;
use carelog_core::{AppError, AppResult, NonEmptyString};
use carelog_domain::{AuditContext, AuditEntry, AuditLine, AuditSeverity};
use chrono::Utc;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{AuditRecordInput, AuditService, AuditSink, write_summary};

#[derive(Default)]
struct FakeAuditSink {
    lines: Mutex<Vec<String>>,
}

#[async_trait]
impl AuditSink for FakeAuditSink {
    async fn append_line(&self, line: &str) -> AppResult<()> {
        self.lines.lock().await.push(line.to_owned());
        Ok(())
    }

    fn destination(&self) -> String {
        "memory://fake".to_owned()
    }
}

struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append_line(&self, _line: &str) -> AppResult<()> {
        Err(AppError::Write("no space left on device".to_owned()))
    }

    fn destination(&self) -> String {
        "/full/disk/audit.log".to_owned()
    }
}

struct Unrepresentable;

impl Serialize for Unrepresentable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cyclic reference"))
    }
}

fn service_with(sink: Arc<FakeAuditSink>, context: AuditContext) -> AuditService {
    AuditService::new(sink, context, false)
}

async fn parsed_lines(sink: &FakeAuditSink) -> Vec<AuditLine> {
    sink.lines
        .lock()
        .await
        .iter()
        .map(|line| AuditLine::parse(line).unwrap_or_else(|_| unreachable!()))
        .collect()
}

#[tokio::test]
async fn record_persists_patient_access_scenario() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(sink.clone(), AuditContext::default());

    let started = Utc::now();
    service
        .record(
            AuditRecordInput::new("Patient record accessed")
                .user_id("dr_smith_123")
                .patient_id("patient_456")
                .detail("record_type", "medical_history"),
        )
        .await;
    let finished = Utc::now();

    let lines = parsed_lines(&sink).await;
    assert_eq!(lines.len(), 1);
    let entry = &lines[0].entry;
    assert_eq!(entry.action().as_str(), "Patient record accessed");
    assert_eq!(entry.user_id(), Some("dr_smith_123"));
    assert_eq!(entry.patient_id(), Some("patient_456"));
    assert_eq!(
        entry.details().get("record_type"),
        Some(&json!("medical_history"))
    );
    assert!(entry.timestamp() >= started && entry.timestamp() <= finished);
    assert_eq!(lines[0].severity, AuditSeverity::Info);
}

#[tokio::test]
async fn record_without_optional_fields_writes_empty_details() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(sink.clone(), AuditContext::default());

    service.record(AuditRecordInput::new("System startup")).await;

    let raw = sink.lines.lock().await.clone();
    assert_eq!(raw.len(), 1);
    let payload = raw[0].split_once("AUDIT: ").map(|(_, json)| json);
    let value = payload
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .unwrap_or_default();
    assert_eq!(value["user_id"], Value::Null);
    assert_eq!(value["patient_id"], Value::Null);
    assert_eq!(value["details"], json!({}));
}

#[tokio::test]
async fn record_stamps_ambient_context_captured_at_construction() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(
        sink.clone(),
        AuditContext {
            session_id: Some("sess-42".to_owned()),
            client_address: Some("192.168.1.20".to_owned()),
        },
    );

    service
        .record(AuditRecordInput::new("Prescription updated").severity(AuditSeverity::Warning))
        .await;

    let lines = parsed_lines(&sink).await;
    assert_eq!(lines[0].entry.session_id(), Some("sess-42"));
    assert_eq!(lines[0].entry.client_address(), Some("192.168.1.20"));
    assert_eq!(lines[0].severity, AuditSeverity::Warning);
}

#[tokio::test]
async fn unrepresentable_detail_drops_only_that_entry() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(sink.clone(), AuditContext::default());

    service
        .record(AuditRecordInput::new("Chart opened").detail("chart", 1))
        .await;
    service
        .record(AuditRecordInput::new("Chart linked").detail("link", Unrepresentable))
        .await;
    service
        .record(AuditRecordInput::new("Chart closed").detail("chart", 1))
        .await;

    let lines = parsed_lines(&sink).await;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].entry.action().as_str(), "Chart opened");
    assert_eq!(lines[1].entry.action().as_str(), "Chart closed");
}

#[tokio::test]
async fn try_record_reports_serialization_error() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(sink, AuditContext::default());

    let result = service
        .try_record(AuditRecordInput::new("Chart linked").detail("link", Unrepresentable))
        .await;

    assert!(matches!(result, Err(AppError::Serialization(_))));
}

#[tokio::test]
async fn empty_action_is_rejected_without_writing() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(sink.clone(), AuditContext::default());

    let result = service.try_record(AuditRecordInput::new("   ")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    service.record(AuditRecordInput::new("")).await;
    assert!(sink.lines.lock().await.is_empty());
}

#[tokio::test]
async fn write_failures_are_contained() {
    let service = AuditService::new(Arc::new(FailingAuditSink), AuditContext::default(), true);

    service
        .record(AuditRecordInput::new("Lab result viewed"))
        .await;

    let result = service
        .try_record(AuditRecordInput::new("Lab result viewed"))
        .await;
    assert!(matches!(result, Err(AppError::Write(_))));
}

#[tokio::test]
async fn clones_share_one_sink() {
    let sink = Arc::new(FakeAuditSink::default());
    let service = service_with(sink.clone(), AuditContext::default());
    let other = service_with(sink, AuditContext::default());
    let unrelated = service_with(Arc::new(FakeAuditSink::default()), AuditContext::default());

    assert!(service.shares_sink_with(&service.clone()));
    assert!(service.shares_sink_with(&other));
    assert!(!service.shares_sink_with(&unrelated));
}

#[tokio::test]
async fn accessors_expose_construction_settings() {
    let context = AuditContext {
        session_id: Some("sess-7".to_owned()),
        client_address: None,
    };
    let service = AuditService::new(Arc::new(FakeAuditSink::default()), context.clone(), true);

    assert_eq!(service.context(), &context);
    assert!(service.echoes_to_stdout());
    assert_eq!(service.destination(), "memory://fake");
    assert!(service.shutdown().await.is_ok());
    assert!(!service_with(Arc::new(FakeAuditSink::default()), context).echoes_to_stdout());
}

#[test]
fn summary_line_uses_none_for_missing_identifiers() {
    let entry = |user_id: Option<&str>, patient_id: Option<&str>| {
        AuditEntry::new(
            Utc::now(),
            NonEmptyString::new("Patient record accessed").unwrap_or_else(|_| unreachable!()),
            user_id.map(str::to_owned),
            patient_id.map(str::to_owned),
            &AuditContext::default(),
            serde_json::Map::new(),
            AuditSeverity::Info,
        )
    };

    let mut out = Vec::new();
    assert!(write_summary(&mut out, &entry(Some("dr_smith_123"), Some("patient_456"))).is_ok());
    assert!(write_summary(&mut out, &entry(None, None)).is_ok());

    assert_eq!(
        String::from_utf8(out).unwrap_or_default(),
        "[AUDIT] Patient record accessed - User: dr_smith_123 - Patient: patient_456\n\
         [AUDIT] Patient record accessed - User: None - Patient: None\n"
    );
}
