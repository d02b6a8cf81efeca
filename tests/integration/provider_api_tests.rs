/*!
 * Full runs against an OpenAI-compatible endpoint served by wiremock
 */

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nbglot::app_config::{CommonConfig, ImageConfig, ProviderConfig};
use nbglot::language_utils::TargetLanguage;
use nbglot::pipeline::Orchestrator;
use nbglot::providers::openai::OpenAI;
use nbglot::translation::TranslationService;

use crate::common::{cell_sources, code_cell, create_temp_dir, create_test_notebook, markdown_cell, read_notebook};

fn completion(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

fn service(server: &MockServer) -> Arc<TranslationService<OpenAI>> {
    let provider = ProviderConfig {
        endpoint: format!("{}/v1", server.uri()),
        api_key: "sk-test".to_string(),
        ..ProviderConfig::default()
    };
    let common = CommonConfig {
        retry_count: 1,
        retry_backoff_ms: 10,
        ..CommonConfig::default()
    };
    Arc::new(TranslationService::new(OpenAI::new_with_config(&provider, &common)))
}

#[tokio::test]
async fn test_run_withOpenAiEndpoint_shouldTranslateAndComment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("line comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("```python\n# 赋值\nx = 1\n```")))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("你好")))
        .mount(&server)
        .await;

    let dir = create_temp_dir().unwrap();
    let input = create_test_notebook(
        dir.path(),
        "api.ipynb",
        vec![markdown_cell("Hello"), markdown_cell("Hello"), code_cell("x = 1")],
    )
    .unwrap();
    let capability = service(&server);
    let orchestrator = Orchestrator::new(capability.clone(), ImageConfig::default());

    let report = orchestrator.run(&input, TargetLanguage::Chinese, false).await.unwrap();

    let sources = cell_sources(&read_notebook(&report.output_path));
    assert_eq!(sources[0], "Hello\n\n**翻译：**\n你好");
    assert_eq!(sources[1], sources[0]);
    assert_eq!(sources[2], "# 赋值\nx = 1");
    // The repeated paragraph is served from the cache
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(capability.cache().stats().0, 1);
}

#[tokio::test]
async fn test_run_withFailingEndpoint_shouldStillWriteMarkedOutput() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let dir = create_temp_dir().unwrap();
    let input = create_test_notebook(dir.path(), "down.ipynb", vec![markdown_cell("Hello"), code_cell("x = 1")]).unwrap();
    let orchestrator = Orchestrator::new(service(&server), ImageConfig::default());

    let report = orchestrator.run(&input, TargetLanguage::French, false).await.unwrap();

    let sources = cell_sources(&read_notebook(&report.output_path));
    assert!(sources[0].starts_with("Hello\n\n**Traduction :**\n[Translation failed: "));
    assert!(sources[1].starts_with("# [Code commenting failed: "));
    assert!(sources[1].ends_with("\nx = 1"));
    assert_eq!(report.failure_markers, 2);
    // Client errors are not retried
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
