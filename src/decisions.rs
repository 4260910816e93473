// Append-only decision log. One CSV line per operator decision; read back on
// startup so a review can be interrupted and resumed.

use crate::drive::RemoteFile;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const HEADER: &str = "id,name,folder,action\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Opensource,
    Skip,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Opensource => write!(f, "opensource"),
            Action::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub action: Action,
}

/// What was decided, in append order, with the last record per id winning.
#[derive(Debug, Clone, Default)]
pub struct Decisions {
    records: Vec<DecisionRecord>,
    latest: HashMap<String, Action>,
}

impl Decisions {
    pub fn from_records(records: Vec<DecisionRecord>) -> Self {
        let latest = records
            .iter()
            .map(|r| (r.id.clone(), r.action))
            .collect();
        Decisions { records, latest }
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn action(&self, id: &str) -> Option<Action> {
        self.latest.get(id).copied()
    }

    pub fn count(&self, action: Action) -> usize {
        self.latest.values().filter(|a| **a == action).count()
    }
}

/// Whether files skipped on an earlier run come back for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Drop everything already decided.
    #[default]
    Drop,
    /// Drop opensourced files but offer skipped ones again.
    Reconsider,
}

/// Files still needing a decision under `policy`. Opensourced files are
/// never offered again.
pub fn filter_undecided(
    files: Vec<RemoteFile>,
    decisions: &Decisions,
    policy: SkipPolicy,
) -> Vec<RemoteFile> {
    files
        .into_iter()
        .filter(|f| match (decisions.action(&f.id), policy) {
            (None, _) => true,
            (Some(Action::Skip), SkipPolicy::Reconsider) => true,
            (Some(_), _) => false,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DecisionLog {
    path: PathBuf,
}

impl DecisionLog {
    /// Open the log at `path`, writing the header if the file is missing or
    /// empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let empty = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if empty {
            let mut file = File::create(&path)?;
            file.write_all(HEADER.as_bytes())?;
            file.sync_all()?;
            debug!(path = %path.display(), "initialised decision log");
        }
        Ok(DecisionLog { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Decisions> {
        let mut rdr = csv::ReaderBuilder::new().from_path(&self.path)?;
        let headers = rdr.headers()?.clone();
        if headers.iter().collect::<Vec<_>>() != ["id", "name", "folder", "action"] {
            return Err(Error::validation(
                "decision log",
                format!("{}: unexpected header {:?}", self.path.display(), headers),
            ));
        }
        let mut records = Vec::new();
        for (i, row) in rdr.deserialize::<DecisionRecord>().enumerate() {
            let record = row.map_err(|e| {
                Error::validation(
                    "decision log",
                    format!("{} record {}: {e}", self.path.display(), i + 1),
                )
            })?;
            records.push(record);
        }
        info!(path = %self.path.display(), records = records.len(), "loaded decision log");
        Ok(Decisions::from_records(records))
    }

    /// Append one decision and sync it to disk before returning.
    pub fn append(&self, record: &DecisionRecord) -> Result<()> {
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        // A hand-edited log may have lost its final newline.
        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.serialize(record)?;
        wtr.flush()?;
        let file = wtr
            .into_inner()
            .map_err(|e| Error::Io(std::io::Error::new(e.error().kind(), e.to_string())))?;
        file.sync_data()?;
        debug!(id = %record.id, action = %record.action, "recorded decision");
        Ok(())
    }
}
