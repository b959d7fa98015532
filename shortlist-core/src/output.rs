//! # Atomic Output
//!
//! Artifacts are written to a temporary file next to the destination and
//! renamed into place only after the writer finished, so a failed run
//! never leaves a partial file behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::errors::ShortlistResult;

/// Write `path` through `fill`; the file appears only if `fill` succeeds.
pub fn write_atomic<P, F>(path: P, fill: F) -> ShortlistResult<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let path = path.as_ref();
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        fill(&mut writer)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| e.error)?;
    log::debug!("wrote {:?}", path);
    Ok(())
}
