//! Writing rendered text to disk.

use std::fs;
use std::path::Path;

use nml_core::{NmlError, NmlResult};

/// Write `text` to `path`, creating parent directories on demand.
pub fn write_output(path: &Path, text: &str) -> NmlResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| NmlError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| NmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "wrote output");
    Ok(())
}
