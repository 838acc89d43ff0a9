//! The persisted results file: a pretty-printed JSON array of
//! [`ResultRecord`]s, read once per batch and written once at the end.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HarvestError, Result};
use crate::model::{CoverageResult, ResultRecord};

#[derive(Debug)]
pub struct ResultsStore {
    path: PathBuf,
    records: Vec<ResultRecord>,
}

impl ResultsStore {
    /// Load the results at `path`. A missing file is an empty store; a
    /// corrupt one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let records = match std::fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), records = records.len(), "loaded results");
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Identifiers of every repository already recorded.
    pub fn processed(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.repo.clone()).collect()
    }

    pub fn append(&mut self, result: &CoverageResult) {
        self.records.push(ResultRecord::from(result));
    }

    /// Write all records, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.records)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)
            .map_err(|e| HarvestError::Io(e.error))?;
        debug!(path = %self.path.display(), records = self.records.len(), "saved results");
        Ok(())
    }
}

/// Success count and mean coverage over the successful records.
pub fn summarize(records: &[ResultRecord]) -> (usize, Option<f64>) {
    let values: Vec<f64> = records.iter().filter_map(|r| r.coverage).collect();
    let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);
    (values.len(), mean)
}
