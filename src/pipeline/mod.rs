/*!
 * Cell processing.
 *
 * - `router`: the cell classifier state machine
 * - `markdown_cell`: translation and image description of markdown cells
 * - `code_cell`: commenting of code cells with an integrity check
 * - `integrity`: executable-line comparison used by the code pipeline
 * - `orchestrator`: drives a whole notebook from load to write
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::AppError;
use crate::images::ImageResolver;
use crate::language_utils::{Labels, TargetLanguage};
use crate::notebook::Cell;
use crate::pipeline::integrity::CodeLanguage;
use crate::translation::ModelCapability;

pub mod code_cell;
pub mod integrity;
pub mod markdown_cell;
pub mod orchestrator;
pub mod router;

pub use self::orchestrator::{Orchestrator, RunReport, WorkflowState};
pub use self::router::{CellRouter, Dispatch, Route, RouterState};

/// Cooperative abort signal shared between the caller and running pipelines.
///
/// Pipelines check it before every capability call; calls already in flight
/// are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<(), AppError> {
        if self.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a cell pipeline needs besides the cell itself
#[derive(Clone, Copy)]
pub struct CellContext<'a> {
    pub language: TargetLanguage,
    pub labels: Labels,
    pub code_language: &'a CodeLanguage,
    pub capability: &'a dyn ModelCapability,
    pub images: &'a ImageResolver,
    pub cancel: &'a CancellationFlag,
}

/// What happened while processing one cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStats {
    /// Text blocks that received a translation
    pub translated_blocks: usize,
    /// Images that received a description
    pub described_images: usize,
    /// Failure markers written in place of an augmentation
    pub failure_markers: usize,
    /// The code cell kept its original source after an integrity violation
    pub integrity_fallback: bool,
}

/// A processed cell and what was done to it
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub cell: Cell,
    pub stats: CellStats,
}

impl ProcessingResult {
    /// The cell passed through untouched
    pub fn unchanged(cell: &Cell) -> Self {
        Self {
            cell: cell.clone(),
            stats: CellStats::default(),
        }
    }
}

// Markers are single-line so they read as one note under their caption
fn failure_marker(what: &str, cause: &dyn std::fmt::Display) -> String {
    let cause = cause.to_string();
    let cause = cause.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("[{} failed: {}]", what, cause)
}

/// Body of the note written when a translation could not be produced
pub fn translation_failure_marker(cause: &dyn std::fmt::Display) -> String {
    failure_marker("Translation", cause)
}

/// Body of the note written when an image could not be described
pub fn description_failure_marker(cause: &dyn std::fmt::Display) -> String {
    failure_marker("Image description", cause)
}

/// Body of the comment written when code could not be commented
pub fn commenting_failure_marker(cause: &dyn std::fmt::Display) -> String {
    failure_marker("Code commenting", cause)
}
