/*!
 * Error types for the nbglot application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Recoverable errors (`ProviderError`, `ImageError`) are turned into visible
 * failure markers by the cell pipelines. Everything wrapped by `AppError` is fatal
 * for the run and aborts before any output is written.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The model answered with no usable content
    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether another attempt at the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) | Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur while resolving the bytes behind an image reference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// A `data:` URI or attachment payload could not be decoded
    #[error("Malformed inline image data: {0}")]
    MalformedInlineData(String),

    /// A network image could not be fetched
    #[error("Failed to fetch image: {status_or_cause}")]
    FetchError {
        /// HTTP status line or transport error description
        status_or_cause: String,
    },

    /// A local image is absent or unreadable
    #[error("Image file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The payload is larger than the configured bound
    #[error("Image payload too large: {size} bytes (limit {limit} bytes)")]
    PayloadTooLarge {
        /// Observed or announced payload size
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// An `attachment:` reference names an attachment the cell does not carry
    #[error("Cell has no attachment named '{0}'")]
    MissingAttachment(String),
}

/// Errors from loading or persisting a notebook document
#[derive(Error, Debug)]
pub enum NotebookError {
    /// The input path does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input path lacks the `.ipynb` extension
    #[error("Input must be a Jupyter notebook (.ipynb): {}", .0.display())]
    NotANotebook(PathBuf),

    /// The input file is not a readable notebook
    #[error("Failed to parse notebook {}: {message}", path.display())]
    ParseError {
        /// Notebook path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The output document could not be written
    #[error("Failed to write notebook {}: {message}", path.display())]
    WriteError {
        /// Output path
        path: PathBuf,
        /// I/O or serializer message
        message: String,
    },
}

/// Errors raised for target-language identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    /// The identifier does not name a supported target language
    #[error("Unsupported target language '{0}'. Supported: {1}")]
    UnsupportedLanguage(String, String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration or credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested target language is not supported
    #[error(transparent)]
    UnsupportedLanguage(#[from] LanguageError),

    /// Notebook loading or writing failed
    #[error(transparent)]
    Notebook(#[from] NotebookError),

    /// The derived output path already exists and no override was given
    #[error("Output file already exists: {} (use --force to overwrite)", .0.display())]
    OutputExists(PathBuf),

    /// The run was aborted before the document was written
    #[error("Processing cancelled; no output was written")]
    Cancelled,

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Whether the failure is attributable to the caller's input or configuration
    /// rather than to processing itself.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::UnsupportedLanguage(_)
                | Self::OutputExists(_)
                | Self::Notebook(NotebookError::InputNotFound(_))
                | Self::Notebook(NotebookError::NotANotebook(_))
                | Self::Notebook(NotebookError::ParseError { .. })
        )
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
