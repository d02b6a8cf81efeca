use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{AppError, NotebookError};
use crate::file_utils::FileManager;
use crate::language_utils::TargetLanguage;
use crate::pipeline::{CancellationFlag, Orchestrator, RunReport};
use crate::providers::openai::OpenAI;
use crate::translation::TranslationService;

// @module: Application controller for notebook processing

/// Outcome of processing a directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderSummary {
    // @field: Notebooks written
    pub processed: usize,
    // @field: Notebooks whose output already existed
    pub skipped: usize,
    // @field: Notebooks that failed
    pub failed: usize,
}

/// Main application controller for notebook translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Resolved target language
    language: TargetLanguage,
    // @field: Notebook runner shared by every file
    orchestrator: Orchestrator,
}

impl Controller {
    // @method: Create a controller talking to the configured endpoint
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        config.validate()?;
        let provider = OpenAI::new_with_config(&config.provider, &config.common);
        let service = TranslationService::new(provider);
        Self::with_capability(config, Arc::new(service))
    }

    /// Create a controller over any capability implementation
    pub fn with_capability(
        config: Config,
        capability: Arc<dyn crate::translation::ModelCapability>,
    ) -> Result<Self, AppError> {
        let language = config.language()?;
        let orchestrator = Orchestrator::new(capability, config.images.clone())
            .with_concurrency(config.common.concurrent_requests);
        Ok(Self {
            config,
            language,
            orchestrator,
        })
    }

    /// Send one small request to the configured endpoint to prove the credentials work
    pub async fn test_connection(config: &Config) -> Result<(), AppError> {
        config.validate()?;
        let service = TranslationService::new(OpenAI::new_with_config(&config.provider, &config.common));
        service.test_connection().await.map_err(|e| {
            error!("Connection test against {} failed: {}", config.provider.endpoint, e);
            AppError::Configuration(format!("Connection test failed: {}", e))
        })?;
        info!("Connection to {} ({}) works", config.provider.endpoint, config.provider.model);
        Ok(())
    }

    /// Flag that aborts the current run when set
    pub fn cancellation(&self) -> CancellationFlag {
        self.orchestrator.cancellation()
    }

    pub fn language(&self) -> TargetLanguage {
        self.language
    }

    /// Process one notebook
    pub async fn run(&self, input_file: &Path, force_overwrite: bool) -> Result<RunReport, AppError> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(input_file, &multi_progress, force_overwrite).await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<RunReport, AppError> {
        if !FileManager::is_notebook(input_file) {
            return Err(NotebookError::NotANotebook(input_file.to_path_buf()).into());
        }

        info!(
            "nbglot: {} - {} -> {}",
            self.config.provider.endpoint,
            self.config.provider.model,
            self.language.display_name()
        );

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cells ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(file_label(input_file));

        let pb = progress_bar.clone();
        let result = self
            .orchestrator
            .run_with_progress(input_file, self.language, force_overwrite, move |done, total| {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            })
            .await;

        progress_bar.finish_and_clear();

        let report = result?;
        log_report(&report);
        Ok(report)
    }

    /// Process every notebook under a directory.
    ///
    /// Failures are logged and counted; notebooks whose output exists are
    /// skipped unless `force_overwrite` is set.
    pub async fn run_folder(&self, input_dir: &Path, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow::anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let notebooks = FileManager::find_notebooks(input_dir)?;
        if notebooks.is_empty() {
            return Err(anyhow::anyhow!("No notebooks found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(notebooks.len() as u64));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} notebooks ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(style.progress_chars("█▓▒░"));

        let mut summary = FolderSummary::default();
        for notebook in &notebooks {
            if self.orchestrator.cancellation().is_cancelled() {
                warn!("Cancelled, {} notebook(s) left unprocessed", notebooks.len() - folder_pb.position() as usize);
                break;
            }
            folder_pb.set_message(format!("Processing: {}", file_label(notebook)));

            match self.run_with_progress(notebook, &multi_progress, force_overwrite).await {
                Ok(_) => summary.processed += 1,
                Err(AppError::OutputExists(path)) => {
                    warn!("Skipping {:?}, output already exists (use -f to force overwrite)", path);
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!("Error processing {}: {}", notebook.display(), e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed in {}: {} processed, {} skipped, {} errors",
            format_duration(start_time.elapsed()),
            summary.processed,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn log_report(report: &RunReport) {
    info!(
        "Cells: {} markdown, {} code, {} other. Translated {} block(s), described {} image(s)",
        report.markdown_cells,
        report.code_cells,
        report.passthrough_cells,
        report.translated_blocks,
        report.described_images
    );
    if report.integrity_fallbacks > 0 {
        warn!(
            "{} code cell(s) kept their original source because the model changed the code",
            report.integrity_fallbacks
        );
    }
    info!("Success: {} ({})", report.output_path.display(), format_duration(report.elapsed));
}

// Format duration in a human-readable format
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
