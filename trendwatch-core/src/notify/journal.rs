//! CSV signal journal.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use super::{Alert, AlertSink, SinkError};

/// Appends one row per alert. The header is written when the file is new or empty.
#[derive(Debug, Clone)]
pub struct CsvJournal {
    path: PathBuf,
}

impl CsvJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for CsvJournal {
    fn name(&self) -> &str {
        "csv_journal"
    }

    fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(&alert.row)?;
        writer.flush()?;
        Ok(())
    }
}
