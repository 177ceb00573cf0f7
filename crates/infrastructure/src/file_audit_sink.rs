//! Append-only JSON-lines file sink.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use carelog_application::AuditSink;
use carelog_core::{AppError, AppResult};
use tokio::fs::OpenOptions;
use tokio::sync::Mutex;
use tracing::debug;

/// Sinks opened by this process, keyed by canonical destination.
static OPEN_FILE_SINKS: Mutex<BTreeMap<PathBuf, Arc<FileAuditSink>>> =
    Mutex::const_new(BTreeMap::new());

/// File-backed audit sink. Holds exactly one append handle per destination
/// for the lifetime of the process.
///
/// Each line is written on the blocking pool while the file lock is held, so
/// a caller that stops waiting never leaves half a line behind.
pub struct FileAuditSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl FileAuditSink {
    /// Opens (or creates) the destination in append mode, creating parent
    /// directories as needed.
    ///
    /// Repeated calls for the same destination, including concurrent ones,
    /// return the same sink.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Arc<Self>> {
        let path = canonical_destination(path.as_ref()).await?;

        let mut open_sinks = OPEN_FILE_SINKS.lock().await;
        if let Some(existing) = open_sinks.get(&path) {
            return Ok(existing.clone());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|error| {
                AppError::Configuration(format!(
                    "failed to open audit log '{}' for append: {error}",
                    path.display()
                ))
            })?
            .into_std()
            .await;

        debug!(destination = %path.display(), "audit log opened");

        let sink = Arc::new(Self {
            path: path.clone(),
            file: Arc::new(Mutex::new(file)),
        });
        open_sinks.insert(path, sink.clone());

        Ok(sink)
    }

    /// Returns the canonical destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append_line(&self, line: &str) -> AppResult<()> {
        let mut buffer = Vec::with_capacity(line.len() + 1);
        buffer.extend_from_slice(line.as_bytes());
        buffer.push(b'\n');

        let mut file = self.file.clone().lock_owned().await;
        let written = tokio::task::spawn_blocking(move || write_line(&mut *file, &buffer))
            .await
            .map_err(|error| {
                AppError::Internal(format!("audit append task failed: {error}"))
            })?;

        written.map_err(|error| {
            AppError::Write(format!(
                "failed to append to audit log '{}': {error}",
                self.path.display()
            ))
        })
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes one terminated line. A short write is closed with a newline so
/// the next line starts on its own.
fn write_line(out: &mut impl Write, line: &[u8]) -> std::io::Result<()> {
    let mut written = 0;
    while written < line.len() {
        match out.write(&line[written..]) {
            Ok(0) => {
                terminate_fragment(out, written);
                return Err(ErrorKind::WriteZero.into());
            }
            Ok(count) => written += count,
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => {
                terminate_fragment(out, written);
                return Err(error);
            }
        }
    }

    out.flush()
}

fn terminate_fragment(out: &mut impl Write, written: usize) {
    if written > 0 {
        let _ = out.write_all(b"\n");
    }
}

async fn canonical_destination(requested: &Path) -> AppResult<PathBuf> {
    let file_name = requested.file_name().ok_or_else(|| {
        AppError::Configuration(format!(
            "audit log destination '{}' does not name a file",
            requested.display()
        ))
    })?;
    let parent = requested
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    tokio::fs::create_dir_all(parent).await.map_err(|error| {
        AppError::Configuration(format!(
            "failed to create audit log directory '{}': {error}",
            parent.display()
        ))
    })?;
    let parent = tokio::fs::canonicalize(parent).await.map_err(|error| {
        AppError::Configuration(format!(
            "failed to resolve audit log directory '{}': {error}",
            parent.display()
        ))
    })?;

    Ok(parent.join(file_name))
}
