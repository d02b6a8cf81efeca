/*!
 * Controller lifecycle: configuration, single files and directories
 */

use std::fs;
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nbglot::app_config::{CommonConfig, Config, ProviderConfig};
use nbglot::app_controller::{Controller, FolderSummary};
use nbglot::errors::{AppError, NotebookError};
use nbglot::language_utils::TargetLanguage;

use crate::common::{
    StubCapability, create_temp_dir, create_test_file, create_test_notebook, init_test_logging, markdown_cell,
    read_notebook,
};

fn controller_for(language: &str) -> Controller {
    let config = Config {
        target_language: language.to_string(),
        ..Config::default()
    };
    Controller::with_capability(config, Arc::new(StubCapability::new())).unwrap()
}

#[test]
fn test_with_capability_withIsoCode_shouldResolveLanguage() {
    assert_eq!(controller_for("ja").language(), TargetLanguage::Japanese);
    assert_eq!(controller_for("Español").language(), TargetLanguage::Spanish);
}

#[test]
fn test_with_capability_withUnknownLanguage_shouldFailFast() {
    let config = Config {
        target_language: "Klingon".to_string(),
        ..Config::default()
    };
    let result = Controller::with_capability(config, Arc::new(StubCapability::new()));
    assert!(matches!(result, Err(AppError::UnsupportedLanguage(_))));
}

fn config_for(server: &MockServer) -> Config {
    Config {
        provider: ProviderConfig {
            endpoint: format!("{}/v1", server.uri()),
            api_key: "sk-test".to_string(),
            ..ProviderConfig::default()
        },
        common: CommonConfig {
            retry_count: 0,
            ..CommonConfig::default()
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn test_test_connection_withAnsweringEndpoint_shouldSucceed() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "OK"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(Controller::test_connection(&config_for(&server)).await.is_ok());
}

#[tokio::test]
async fn test_test_connection_withRejectedKey_shouldBeConfigurationError() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let err = Controller::test_connection(&config_for(&server)).await.unwrap_err();

    assert!(matches!(err, AppError::Configuration(ref m) if m.contains("Connection test failed")));
    assert!(err.is_input_error());
}

#[tokio::test]
async fn test_run_withNonNotebookInput_shouldRejectAsInputError() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "notes.txt", "Hello").unwrap();

    let err = controller_for("Chinese").run(&input, false).await.unwrap_err();

    assert!(matches!(err, AppError::Notebook(NotebookError::NotANotebook(_))));
    assert!(err.is_input_error());
}

#[tokio::test]
async fn test_run_shouldWriteTranslatedSibling() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_notebook(dir.path(), "intro.ipynb", vec![markdown_cell("Welcome")]).unwrap();

    let report = controller_for("ko").run(&input, false).await.unwrap();

    assert_eq!(report.output_path, dir.path().join("intro_translated.ipynb"));
    let output = read_notebook(&report.output_path);
    assert!(output.cells()[0].source().contains("**번역:**\n<TRANSLATED:Korean>Welcome"));
}

#[tokio::test]
async fn test_run_folder_shouldProcessSkipAndCountFailures() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("part2")).unwrap();
    create_test_notebook(root, "one.ipynb", vec![markdown_cell("One")]).unwrap();
    create_test_notebook(&root.join("part2"), "two.ipynb", vec![markdown_cell("Two")]).unwrap();
    create_test_notebook(root, "done.ipynb", vec![markdown_cell("Done")]).unwrap();
    create_test_file(root, "done_translated.ipynb", "{}").unwrap();
    create_test_file(root, "broken.ipynb", "not json").unwrap();

    let summary = controller_for("Chinese").run_folder(root, false).await.unwrap();

    assert_eq!(
        summary,
        FolderSummary {
            processed: 2,
            skipped: 1,
            failed: 1
        }
    );
    assert!(root.join("one_translated.ipynb").exists());
    assert!(root.join("part2/two_translated.ipynb").exists());
    assert!(!root.join("broken_translated.ipynb").exists());
    assert_eq!(fs::read_to_string(root.join("done_translated.ipynb")).unwrap(), "{}");
}

#[tokio::test]
async fn test_run_folder_withoutNotebooks_shouldFail() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "readme.md", "# nothing").unwrap();

    assert!(controller_for("Chinese").run_folder(dir.path(), false).await.is_err());
}

#[tokio::test]
async fn test_run_afterCancellation_shouldNotWrite() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_notebook(dir.path(), "late.ipynb", vec![markdown_cell("Late")]).unwrap();
    let controller = controller_for("Chinese");
    controller.cancellation().cancel();

    let result = controller.run(&input, false).await;

    assert!(matches!(result, Err(AppError::Cancelled)));
    assert!(!dir.path().join("late_translated.ipynb").exists());
}
