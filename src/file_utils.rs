use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Suffix inserted before the extension of every output notebook
pub const OUTPUT_SUFFIX: &str = "_translated";

/// Notebook file extension
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @checks: `.ipynb` extension, case-insensitive
    pub fn is_notebook<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(NOTEBOOK_EXTENSION))
    }

    // @checks: File name stem ends with the output suffix
    pub fn is_translated_output<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(OUTPUT_SUFFIX))
    }

    // @generates: `<stem>_translated<.ext>` next to the input
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();

        let mut output_filename = format!("{}{}", stem, OUTPUT_SUFFIX);
        if let Some(ext) = input_file.extension() {
            output_filename.push('.');
            output_filename.push_str(&ext.to_string_lossy());
        }

        input_file.with_file_name(output_filename)
    }

    /// Find notebooks under a directory, skipping previous outputs
    pub fn find_notebooks<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            // Jupyter keeps autosaves in hidden checkpoint directories
            if path.components().any(|c| c.as_os_str() == ".ipynb_checkpoints") {
                continue;
            }
            if path.is_file() && Self::is_notebook(path) && !Self::is_translated_output(path) {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }
}
