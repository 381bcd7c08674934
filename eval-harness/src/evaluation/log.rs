//! Append-only JSONL evaluation log

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::EvaluationRecord;

/// Error type for evaluation log access
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Evaluation log backed by a JSON-lines file
#[derive(Debug, Clone)]
pub struct EvaluationLog {
    path: PathBuf,
}

impl EvaluationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append one record as a single line, creating the file if needed
    pub fn append(&self, record: &EvaluationRecord) -> Result<(), LogError> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append records in the order given
    pub fn append_all(&self, records: &[EvaluationRecord]) -> Result<(), LogError> {
        self.ensure_parent()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read every record; blank lines are skipped
    pub fn read_all(&self) -> Result<Vec<EvaluationRecord>, LogError> {
        let content = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut record: EvaluationRecord = serde_json::from_str(line)
                .map_err(|source| LogError::Parse { line: i + 1, source })?;
            record.normalize();
            records.push(record);
        }

        tracing::debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Like [`read_all`](Self::read_all), but a missing file is an empty log
    pub fn read_existing(&self) -> Result<Vec<EvaluationRecord>, LogError> {
        if self.exists() {
            self.read_all()
        } else {
            Ok(Vec::new())
        }
    }

    /// Replace the whole log with `records`
    pub fn rewrite(&self, records: &[EvaluationRecord]) -> Result<(), LogError> {
        self.ensure_parent()?;
        let tmp = self.sibling("tmp");
        {
            let mut writer = BufWriter::new(fs::File::create(&tmp)?);
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Copy the log to `<path>.backup`
    pub fn backup(&self) -> Result<PathBuf, LogError> {
        let backup = self.sibling("backup");
        fs::copy(&self.path, &backup)?;
        tracing::info!("Backed up {} to {}", self.path.display(), backup.display());
        Ok(backup)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    fn ensure_parent(&self) -> Result<(), LogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Run number for the next record of a question by an agent type
pub fn next_run_number(records: &[EvaluationRecord], fingerprint: &str, agent_type: &str) -> u32 {
    records
        .iter()
        .filter(|r| r.question_fingerprint == fingerprint && r.agent_type == agent_type)
        .map(|r| r.run_number)
        .max()
        .map_or(1, |n| n + 1)
}
