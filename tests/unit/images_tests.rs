/*!
 * Tests for image reference classification and resolution
 */

use std::path::{Path, PathBuf};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nbglot::app_config::ImageConfig;
use nbglot::errors::ImageError;
use nbglot::images::{ImageResolver, ImageSource, classify};
use nbglot::notebook::{Cell, CellKind};

use crate::common::{PNG_1X1, create_temp_dir};

fn empty_cell() -> Cell {
    Cell::new(CellKind::Markdown, "")
}

#[test]
fn test_classify_shouldDispatchEachReferenceKind() {
    let base = Path::new("/notebooks");
    assert!(matches!(
        classify("data:image/png;base64,AAAA==", base),
        ImageSource::InlineData(_)
    ));
    assert_eq!(
        classify("https://example.com/x.png", base),
        ImageSource::Network("https://example.com/x.png".to_string())
    );
    assert_eq!(classify("./local.png", base), ImageSource::Local(PathBuf::from("/notebooks/./local.png")));
}

#[tokio::test]
async fn test_resolve_withNetworkImage_shouldUseAnnouncedContentType() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/figure"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_1X1.to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    let resolver = ImageResolver::new(&ImageConfig::default(), ".");

    let image = resolver
        .resolve(&format!("{}/figure", server.uri()), &empty_cell())
        .await
        .unwrap();

    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.data.as_ref(), PNG_1X1);
}

#[tokio::test]
async fn test_resolve_withServerError_shouldBeFetchError() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let resolver = ImageResolver::new(&ImageConfig::default(), ".");

    let err = resolver
        .resolve(&format!("{}/x.png", server.uri()), &empty_cell())
        .await
        .unwrap_err();

    assert!(matches!(err, ImageError::FetchError { ref status_or_cause } if status_or_cause.contains("500")));
}

#[tokio::test]
async fn test_resolve_withOversizedDownload_shouldBePayloadTooLarge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 4096], "image/png"))
        .mount(&server)
        .await;
    let config = ImageConfig {
        max_bytes: 1024,
        ..ImageConfig::default()
    };
    let resolver = ImageResolver::new(&config, ".");

    let err = resolver
        .resolve(&format!("{}/big.png", server.uri()), &empty_cell())
        .await
        .unwrap_err();

    assert!(matches!(err, ImageError::PayloadTooLarge { limit: 1024, .. }));
}

#[tokio::test]
async fn test_resolve_withSlowServer_shouldTimeOutAsFetchError() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(PNG_1X1.to_vec(), "image/png")
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let config = ImageConfig {
        fetch_timeout_secs: 1,
        ..ImageConfig::default()
    };
    let resolver = ImageResolver::new(&config, ".");

    let err = resolver
        .resolve(&format!("{}/slow.png", server.uri()), &empty_cell())
        .await
        .unwrap_err();

    assert!(matches!(err, ImageError::FetchError { ref status_or_cause } if status_or_cause.contains("timed out")));
}

#[tokio::test]
async fn test_resolve_withUnreachableHost_shouldBeFetchError() {
    let config = ImageConfig {
        fetch_timeout_secs: 2,
        ..ImageConfig::default()
    };
    let resolver = ImageResolver::new(&config, ".");

    let err = resolver.resolve("http://127.0.0.1:9/x.png", &empty_cell()).await.unwrap_err();

    assert!(matches!(err, ImageError::FetchError { .. }));
}

#[tokio::test]
async fn test_resolve_withLocalFiles_shouldReadOrReportMissing() {
    let dir = create_temp_dir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    std::fs::write(dir.path().join("img/plot.png"), PNG_1X1).unwrap();
    let resolver = ImageResolver::new(&ImageConfig::default(), dir.path());

    let image = resolver.resolve("img/plot.png", &empty_cell()).await.unwrap();
    assert_eq!(image.content_type, "image/png");

    let err = resolver.resolve("./local.png", &empty_cell()).await.unwrap_err();
    assert!(matches!(err, ImageError::FileNotFound(_)));
}

#[tokio::test]
async fn test_resolve_withMalformedDataUri_shouldBeMalformedInlineData() {
    let resolver = ImageResolver::new(&ImageConfig::default(), ".");
    let err = resolver
        .resolve("data:image/png;base64,@@not base64@@", &empty_cell())
        .await
        .unwrap_err();
    assert!(matches!(err, ImageError::MalformedInlineData(_)));
}
