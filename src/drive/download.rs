// Single-file download from Drive to a local path, with a progress bar.

use super::client::DriveApi;
use crate::error::{Error, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Extract a Drive file id from a share link (`.../file/d/<id>/view`,
/// `...open?id=<id>`) or accept a bare id.
pub fn file_id_from_url(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some((_, rest)) = input.split_once("file/d/") {
        let id = rest.split(['/', '?', '#']).next().unwrap_or("");
        return (!id.is_empty()).then(|| id.to_string());
    }
    if let Some((_, query)) = input.split_once('?') {
        return query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == "id")
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.is_empty());
    }
    let bare = !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    bare.then(|| input.to_string())
}

/// Stream the file behind `url_or_id` into `output`, overwriting it.
/// `progress` is sized from the file's declared size when Drive reports one.
pub fn download(
    api: &dyn DriveApi,
    url_or_id: &str,
    output: &Path,
    progress: &ProgressBar,
) -> Result<u64> {
    let file_id = file_id_from_url(url_or_id).ok_or_else(|| {
        Error::NotFound(format!(
            "Could not extract file ID from the provided Google Drive URL: {url_or_id}"
        ))
    })?;

    match api.file(&file_id) {
        Ok(meta) => {
            if let Some(size) = meta.size {
                progress.set_length(size);
            }
            progress.set_message(meta.name);
        }
        Err(e) => warn!(%file_id, error = %e, "could not read file metadata; size unknown"),
    }

    let mut reader = api.media(&file_id)?;
    let mut writer = BufWriter::new(File::create(output)?);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::TransientIo(e)),
        };
        writer.write_all(&buf[..n])?;
        written += n as u64;
        progress.inc(n as u64);
    }
    writer.flush()?;
    progress.finish();
    info!(%file_id, bytes = written, path = %output.display(), "downloaded file");
    Ok(written)
}
