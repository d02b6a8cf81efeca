/*!
 * Tests for error types and conversions
 */

use std::path::PathBuf;

use nbglot::errors::{AppError, ImageError, LanguageError, NotebookError, ProviderError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 503,
        message: "Service unavailable".to_string(),
    };
    let display = error.to_string();
    assert!(display.contains("503"));
    assert!(display.contains("Service unavailable"));
}

#[test]
fn test_providerError_isRetryable_shouldSeparateTransientFromPermanent() {
    assert!(ProviderError::ConnectionError("reset".to_string()).is_retryable());
    assert!(ProviderError::RateLimitExceeded("slow down".to_string()).is_retryable());
    assert!(ProviderError::ApiError { status_code: 502, message: String::new() }.is_retryable());
    assert!(!ProviderError::ApiError { status_code: 400, message: String::new() }.is_retryable());
    assert!(!ProviderError::AuthenticationError("bad key".to_string()).is_retryable());
    assert!(!ProviderError::EmptyResponse.is_retryable());
}

#[test]
fn test_imageError_shouldDescribeCause() {
    let too_large = ImageError::PayloadTooLarge { size: 30, limit: 20 };
    assert!(too_large.to_string().contains("30 bytes"));
    let missing = ImageError::FileNotFound(PathBuf::from("img/a.png"));
    assert!(missing.to_string().contains("img/a.png"));
}

#[test]
fn test_appError_isInputError_shouldClassifyExitStatus() {
    let input_errors = [
        AppError::Configuration("missing API key".to_string()),
        AppError::UnsupportedLanguage(LanguageError::UnsupportedLanguage("xx".to_string(), String::new())),
        AppError::OutputExists(PathBuf::from("a_translated.ipynb")),
        AppError::Notebook(NotebookError::InputNotFound(PathBuf::from("a.ipynb"))),
        AppError::Notebook(NotebookError::NotANotebook(PathBuf::from("a.txt"))),
    ];
    for error in &input_errors {
        assert!(error.is_input_error(), "{} should be an input error", error);
    }

    let processing_errors = [
        AppError::Cancelled,
        AppError::Notebook(NotebookError::WriteError {
            path: PathBuf::from("a_translated.ipynb"),
            message: "disk full".to_string(),
        }),
        AppError::Provider(ProviderError::EmptyResponse),
        AppError::Unknown("boom".to_string()),
    ];
    for error in &processing_errors {
        assert!(!error.is_input_error(), "{} should be a processing error", error);
    }
}

#[test]
fn test_appError_outputExists_shouldMentionForce() {
    let error = AppError::OutputExists(PathBuf::from("lesson_translated.ipynb"));
    let display = error.to_string();
    assert!(display.contains("lesson_translated.ipynb"));
    assert!(display.contains("--force"));
}

#[test]
fn test_appError_fromIoError_shouldWrapAsFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let app_error: AppError = io_error.into();
    assert!(matches!(app_error, AppError::File(ref m) if m.contains("denied")));
}
