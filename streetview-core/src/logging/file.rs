use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Fields, LogBackend, LogError, LogRecord, RequiredFields, Severity};

/// Written when the file is opened; also proves the file is writable.
const HEADER_LINE: &str = "[Backup log file for when Elasticsearch writing fails]\n\n";

/// Local append-only fallback sink. One JSON record per line, flushed on
/// every call so nothing is lost if the process dies.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
    required: RequiredFields,
}

impl FileSink {
    /// Open (or create) the backup file. This is the only fallible step.
    pub fn open(path: impl AsRef<Path>, env: impl Into<String>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(HEADER_LINE.as_bytes())?;
        file.flush()?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            required: RequiredFields::new(env),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogBackend for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn log(&self, severity: Severity, message: &str, fields: &Fields) -> Result<(), LogError> {
        let record = LogRecord::new(severity, message, self.required.merge(fields));
        let line = serde_json::to_string(&record).map_err(|e| LogError::Write(e.to_string()))?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| LogError::Write("backup log file lock poisoned".into()))?;
        writeln!(file, "{line}").map_err(|e| LogError::Write(e.to_string()))?;
        file.flush().map_err(|e| LogError::Write(e.to_string()))
    }

    fn update_correlation_id(&self, correlation_id: Uuid) {
        self.required.set_correlation_id(correlation_id);
    }
}
