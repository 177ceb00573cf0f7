use async_trait::async_trait;
use carelog_application::AuditSink;
use carelog_core::AppResult;
use tokio::sync::Mutex;

/// In-memory audit sink used for local development and tests.
#[derive(Default)]
pub struct InMemoryAuditSink {
    lines: Mutex<Vec<String>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every appended line, oldest first.
    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append_line(&self, line: &str) -> AppResult<()> {
        self.lines.lock().await.push(line.to_owned());
        Ok(())
    }

    fn destination(&self) -> String {
        "memory".to_owned()
    }
}
