// Cached candidate listing: the walk's output as a plain CSV so a later run
// (or a curious human) can read it without touching Drive.

use crate::drive::{RemoteFile, UNKNOWN_FOLDER};
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct ListingRow {
    id: String,
    name: String,
    parent_folder: String,
    created_time: String,
    modified_time: String,
    size: Option<u64>,
}

fn format_time(t: &Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn parse_time(s: &str, line: usize) -> Result<Option<DateTime<Utc>>> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| Error::validation("cached listing", format!("row {line}: `{s}`: {e}")))
}

pub fn save(path: &Path, files: &[RemoteFile]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for f in files {
        wtr.serialize(ListingRow {
            id: f.id.clone(),
            name: f.name.clone(),
            parent_folder: f.folder_name().to_string(),
            created_time: format_time(&f.created_time),
            modified_time: format_time(&f.modified_time),
            size: f.size,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a listing written by [`save`]. The parent id is not cached, so
/// loaded files carry only the resolved folder name.
pub fn load(path: &Path) -> Result<Vec<RemoteFile>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut files = Vec::new();
    for (i, row) in rdr.deserialize::<ListingRow>().enumerate() {
        let row = row.map_err(|e| Error::validation("cached listing", e))?;
        let parent_folder = (row.parent_folder != UNKNOWN_FOLDER && !row.parent_folder.is_empty())
            .then_some(row.parent_folder);
        files.push(RemoteFile {
            id: row.id,
            name: row.name,
            created_time: parse_time(&row.created_time, i + 1)?,
            modified_time: parse_time(&row.modified_time, i + 1)?,
            size: row.size,
            parent_id: None,
            parent_folder,
        });
    }
    Ok(files)
}
