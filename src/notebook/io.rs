use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use crate::errors::NotebookError;
use crate::notebook::model::Notebook;

// @module: Notebook loading and persistence

/// Load and validate a notebook from disk
pub fn load(path: &Path) -> Result<Notebook, NotebookError> {
    if !path.is_file() {
        return Err(NotebookError::InputNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| NotebookError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let notebook = parse(&content).map_err(|message| NotebookError::ParseError {
        path: path.to_path_buf(),
        message,
    })?;

    debug!("Loaded {:?}: {} cells, nbformat {:?}", path, notebook.cells().len(), notebook.format_version());
    Ok(notebook)
}

/// Parse notebook JSON text
pub fn parse(content: &str) -> Result<Notebook, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Notebook::from_value(value)
}

/// Serialize a notebook the way Jupyter writes it: one-space indent, UTF-8,
/// trailing newline.
pub fn to_string(notebook: &Notebook) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    notebook.serialize(&mut serializer)?;
    buffer.push(b'\n');
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write a notebook atomically.
///
/// The document goes to a temporary file next to `path` which is then renamed
/// over the destination, so a failure never leaves a partial notebook behind.
pub fn write(notebook: &Notebook, path: &Path) -> Result<(), NotebookError> {
    let write_error = |message: String| NotebookError::WriteError {
        path: path.to_path_buf(),
        message,
    };

    let content = to_string(notebook).map_err(|e| write_error(e.to_string()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| write_error(e.to_string()))?;
    temp.write_all(content.as_bytes()).map_err(|e| write_error(e.to_string()))?;
    temp.flush().map_err(|e| write_error(e.to_string()))?;
    temp.persist(path).map_err(|e| write_error(e.error.to_string()))?;

    debug!("Wrote {:?} ({} bytes)", path, content.len());
    Ok(())
}
