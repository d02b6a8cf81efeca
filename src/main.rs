// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use nbglot::app_config::{Config, LogLevel, Overrides};
use nbglot::file_utils::FileManager;
use nbglot::language_utils::TargetLanguage;
use nbglot::{AppError, Controller};

/// Exit status for bad input, configuration, or a refused overwrite
const EXIT_INPUT_ERROR: u8 = 2;
/// Exit status for failures while processing
const EXIT_PROCESSING_ERROR: u8 = 1;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for nbglot
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// nbglot - Jupyter notebook translation with AI
///
/// Appends translations of markdown prose, descriptions of images and
/// explanatory code comments to a copy of a Jupyter notebook.
#[derive(Parser, Debug)]
#[command(name = "nbglot")]
#[command(version)]
#[command(about = "AI-powered Jupyter notebook translator")]
#[command(long_about = "nbglot writes <name>_translated.ipynb next to each input notebook. Original text,
images and code are kept; translations, image descriptions and code comments are added.

EXAMPLES:
    nbglot lesson.ipynb -t Chinese              # Translate into Chinese
    nbglot lesson.ipynb -t es -f                # Spanish, overwrite an existing output
    nbglot -c                                   # Check configuration and exit
    nbglot --concurrency 4 course/              # Every notebook of a directory
    nbglot completions bash > nbglot.bash       # Generate bash completions

CONFIGURATION:
    Settings are read from conf.json (see --config), then from the per-user
    nbglot/conf.json, then defaults. API_KEY, MODEL_NAME and MODEL_BASE_URL
    override the file.

SUPPORTED LANGUAGES:
    Chinese, English, Spanish, French, German, Japanese, Korean, Russian,
    Portuguese, Italian (by name, native name or ISO code)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input notebook or directory of notebooks
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Target language (e.g. 'Chinese', 'fr', 'deu')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Check configuration and exit
    #[arg(short, long)]
    check_config: bool,

    /// Overwrite an existing output without asking
    #[arg(short, long)]
    force: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Configuration file path
    #[arg(long, default_value = "conf.json")]
    config: PathBuf,

    /// Model name
    #[arg(short, long, env = "MODEL_NAME")]
    model: Option<String>,

    /// OpenAI-compatible base URL
    #[arg(long, env = "MODEL_BASE_URL")]
    base_url: Option<String>,

    /// API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Number of cells processed at the same time
    #[arg(long)]
    concurrency: Option<usize>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The max level may be raised after init, so `self.level` is only the floor
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "nbglot", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<AppError>() {
                Some(app_error) if app_error.is_input_error() => ExitCode::from(EXIT_INPUT_ERROR),
                _ => ExitCode::from(EXIT_PROCESSING_ERROR),
            }
        }
    }
}

async fn run(options: CommandLineOptions) -> Result<ExitCode> {
    // Apply the command line level before anything is loaded
    if let Some(level) = &options.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load(&options.config)
        .map_err(|e| AppError::Configuration(format!("{:#}", e)))?;
    config.apply(Overrides {
        target_language: options.target_language.clone(),
        api_key: options.api_key.clone(),
        model: options.model.clone(),
        endpoint: options.base_url.clone(),
        concurrency: options.concurrency,
        log_level: options.log_level.clone().map(LogLevel::from),
    });
    log::set_max_level(config.log_level.to_level_filter());

    if options.check_config {
        return check_config(&config).await;
    }

    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| AppError::Configuration("INPUT_PATH is required when not using --check-config".to_string()))?;

    let controller = Controller::with_config(config)?;

    let cancel = controller.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests; nothing will be written");
            cancel.cancel();
        }
    });

    if input_path.is_dir() {
        let summary = controller.run_folder(&input_path, options.force).await?;
        if summary.failed > 0 || controller.cancellation().is_cancelled() {
            return Ok(ExitCode::from(EXIT_PROCESSING_ERROR));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let force = options.force || confirm_overwrite(&input_path)?;
    controller
        .run(&input_path, force)
        .await
        .with_context(|| format!("Failed to translate {}", input_path.display()))?;
    info!("🎉 Translation completed successfully!");
    Ok(ExitCode::SUCCESS)
}

/// Print the effective configuration and test the endpoint, or say why it is unusable
async fn check_config(config: &Config) -> Result<ExitCode> {
    config.validate()?;
    let language: TargetLanguage = config.language()?;
    println!("✅ Configuration is valid");
    println!("📡 API Base URL: {}", config.provider.endpoint);
    println!("🤖 Model: {}", config.provider.model);
    println!("🔑 API Key: {}", config.masked_api_key());
    println!("🌐 Target language: {} ({})", language.display_name(), language.native_name());
    Controller::test_connection(config).await?;
    println!("✅ Endpoint answered");
    Ok(ExitCode::SUCCESS)
}

/// Ask before overwriting an existing output when attached to a terminal
fn confirm_overwrite(input: &Path) -> Result<bool> {
    let output = FileManager::generate_output_path(input);
    if !output.exists() || !std::io::stdin().is_terminal() {
        return Ok(false);
    }

    eprint!("⚠️ Output file already exists: {}\nOverwrite? (y/N): ", output.display());
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
