/*!
 * Document orchestration.
 *
 * Drives one notebook from input path to written output:
 *
 * 1. validate the input and derive `<stem>_translated<ext>`
 * 2. refuse an existing output unless overwriting was confirmed
 * 3. load the document and route every cell to its pipeline
 * 4. collect results into per-cell slots addressed by cell index
 * 5. rebuild the document with the original non-cell fields and write it
 *
 * Cells may be processed concurrently (`concurrency` > 1); results are always
 * reassembled in document order. Nothing is written when the run is cancelled
 * or fails fatally.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream;
use log::{debug, info, warn};

use crate::app_config::ImageConfig;
use crate::errors::{AppError, NotebookError};
use crate::file_utils::FileManager;
use crate::images::ImageResolver;
use crate::language_utils::TargetLanguage;
use crate::notebook::{Cell, Notebook, io};
use crate::pipeline::code_cell::process_code_cell;
use crate::pipeline::integrity::CodeLanguage;
use crate::pipeline::markdown_cell::process_markdown_cell;
use crate::pipeline::router::{CellRouter, Dispatch, Route};
use crate::pipeline::{CancellationFlag, CellContext, CellStats, ProcessingResult};
use crate::translation::ModelCapability;

/// State of one notebook run, owned by the orchestrator
#[derive(Debug)]
pub struct WorkflowState {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub language: TargetLanguage,
    pub document: Notebook,
    /// One slot per cell, filled as pipelines complete
    results: Vec<Option<Cell>>,
    /// Number of filled slots
    cursor: usize,
}

impl WorkflowState {
    pub fn new(input_path: PathBuf, output_path: PathBuf, language: TargetLanguage, document: Notebook) -> Self {
        let results = vec![None; document.cells().len()];
        Self {
            input_path,
            output_path,
            language,
            document,
            results,
            cursor: 0,
        }
    }

    /// Store the processed cell for position `index`
    pub fn record(&mut self, index: usize, cell: Cell) -> Result<(), AppError> {
        let slot = self
            .results
            .get_mut(index)
            .ok_or_else(|| AppError::Unknown(format!("no cell at index {}", index)))?;
        if slot.replace(cell).is_none() {
            self.cursor += 1;
        }
        Ok(())
    }

    /// Number of cells processed so far
    pub fn completed(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// New document with the original non-cell fields and the processed cells in order
    pub fn rebuild(self) -> Result<Notebook, AppError> {
        let cells = self
            .results
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or_else(|| AppError::Unknown(format!("cell {} was never processed", index))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.document.with_cells(cells))
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub markdown_cells: usize,
    pub code_cells: usize,
    pub passthrough_cells: usize,
    pub translated_blocks: usize,
    pub described_images: usize,
    pub failure_markers: usize,
    pub integrity_fallbacks: usize,
    pub elapsed: Duration,
}

impl RunReport {
    fn count(&mut self, route: Route, stats: &CellStats) {
        match route {
            Route::Markdown => self.markdown_cells += 1,
            Route::Code => self.code_cells += 1,
            Route::PassThrough => self.passthrough_cells += 1,
        }
        self.translated_blocks += stats.translated_blocks;
        self.described_images += stats.described_images;
        self.failure_markers += stats.failure_markers;
        if stats.integrity_fallback {
            self.integrity_fallbacks += 1;
        }
    }
}

/// Runs notebooks through the cell pipelines
#[derive(Clone)]
pub struct Orchestrator {
    capability: Arc<dyn ModelCapability>,
    image_config: ImageConfig,
    concurrency: usize,
    cancel: CancellationFlag,
}

impl Orchestrator {
    /// Create an orchestrator processing one cell at a time
    pub fn new(capability: Arc<dyn ModelCapability>, image_config: ImageConfig) -> Self {
        Self {
            capability,
            image_config,
            concurrency: 1,
            cancel: CancellationFlag::new(),
        }
    }

    /// Process up to `concurrency` cells at the same time
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that aborts running and future runs
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Process `input` and write `<stem>_translated<ext>` next to it
    pub async fn run(&self, input: &Path, language: TargetLanguage, force: bool) -> Result<RunReport, AppError> {
        self.run_with_progress(input, language, force, |_, _| {}).await
    }

    /// Same as [`Orchestrator::run`], calling `progress(completed, total)` after every cell
    pub async fn run_with_progress<F>(
        &self,
        input: &Path,
        language: TargetLanguage,
        force: bool,
        progress: F,
    ) -> Result<RunReport, AppError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let start_time = Instant::now();

        if !input.is_file() {
            return Err(NotebookError::InputNotFound(input.to_path_buf()).into());
        }

        let output_path = FileManager::generate_output_path(input);
        if output_path.exists() && !force {
            return Err(AppError::OutputExists(output_path));
        }

        let document = io::load(input)?;
        let code_language = CodeLanguage::from_notebook_language(document.language_name());
        let base_dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let images = ImageResolver::new(&self.image_config, base_dir);

        let mut state = WorkflowState::new(input.to_path_buf(), output_path, language, document);
        info!(
            "Processing {:?}: {} cells into {} ({} code)",
            state.input_path,
            state.total(),
            language,
            code_language
        );

        let ctx = CellContext {
            language,
            labels: language.labels(),
            code_language: &code_language,
            capability: self.capability.as_ref(),
            images: &images,
            cancel: &self.cancel,
        };

        let mut report = RunReport::default();
        let dispatches: Vec<Dispatch> = CellRouter::new(state.document.cells()).collect();
        let cells = state.document.cells().to_vec();

        let mut outcomes = stream::iter(dispatches)
            .map(|dispatch| {
                let cell = &cells[dispatch.index];
                async move {
                    let result = process_cell(dispatch, cell, &ctx).await;
                    (dispatch, result)
                }
            })
            .buffered(self.concurrency);

        // Drain every pipeline even after a failure so in-flight calls complete
        let mut first_error = None;
        while let Some((dispatch, result)) = outcomes.next().await {
            match result {
                Ok(processed) => {
                    report.count(dispatch.route, &processed.stats);
                    state.record(dispatch.index, processed.cell)?;
                    progress(state.completed(), state.total());
                }
                Err(e) => {
                    debug!("Cell {} aborted: {}", dispatch.index, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        drop(outcomes);

        if let Some(e) = first_error {
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let output_path = state.output_path.clone();
        let notebook = state.rebuild()?;
        io::write(&notebook, &output_path)?;

        report.output_path = output_path;
        report.elapsed = start_time.elapsed();
        if report.failure_markers > 0 {
            warn!(
                "{} augmentation(s) could not be produced and are marked in {:?}",
                report.failure_markers, report.output_path
            );
        }
        Ok(report)
    }
}

async fn process_cell(dispatch: Dispatch, cell: &Cell, ctx: &CellContext<'_>) -> Result<ProcessingResult, AppError> {
    match dispatch.route {
        Route::Markdown => process_markdown_cell(dispatch.index, cell, ctx).await,
        Route::Code => process_code_cell(dispatch.index, cell, ctx).await,
        Route::PassThrough => {
            debug!("Passing through {} cell {}", cell.kind(), dispatch.index);
            Ok(ProcessingResult::unchanged(cell))
        }
    }
}
