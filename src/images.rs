/*!
 * Image source resolution.
 *
 * Turns the `src` of a markdown image reference into raw bytes plus a content
 * type. References are classified in a fixed priority order:
 *
 * 1. inline data: `data:` URIs and `attachment:` references to the cell's own
 *    attachments, decoded in place
 * 2. network references (`http://`, `https://`, protocol-relative `//host/...`),
 *    fetched with a bounded timeout
 * 3. everything else is a filesystem path, resolved against the notebook's
 *    directory when relative
 *
 * Payloads above the configured size bound are rejected, never truncated.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use reqwest::Client;
use url::Url;

use crate::app_config::ImageConfig;
use crate::errors::ImageError;
use crate::notebook::Cell;

/// Resolved image payload, consumed by the description call and then dropped
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBytes {
    /// Raw image bytes
    pub data: Bytes,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
}

impl ImageBytes {
    /// Render as a `data:` URI for multimodal requests
    pub fn to_data_uri(&self) -> String {
        use base64::engine::general_purpose::STANDARD;
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.data))
    }
}

/// Where an image reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// `data:` URI carrying the payload
    InlineData(String),
    /// Named attachment stored on the markdown cell
    Attachment(String),
    /// Remote image
    Network(String),
    /// File on disk, already resolved against the notebook directory
    Local(PathBuf),
}

/// Classify an image reference. First match wins.
pub fn classify(source_ref: &str, base_dir: &Path) -> ImageSource {
    let trimmed = source_ref.trim();
    let lowered = trimmed.to_ascii_lowercase();

    if lowered.starts_with("data:") {
        return ImageSource::InlineData(trimmed.to_string());
    }
    if lowered.starts_with("attachment:") {
        return ImageSource::Attachment(trimmed["attachment:".len()..].to_string());
    }
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return ImageSource::Network(trimmed.to_string());
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return ImageSource::Network(format!("https://{}", rest));
    }

    let path_str = if lowered.starts_with("file://") {
        &trimmed["file://".len()..]
    } else {
        trimmed
    };
    let path = Path::new(path_str);
    if path.is_absolute() {
        ImageSource::Local(path.to_path_buf())
    } else {
        ImageSource::Local(base_dir.join(path))
    }
}

/// Decode a `data:[<mime>][;base64],<payload>` URI
pub fn decode_data_uri(uri: &str, max_bytes: u64) -> Result<ImageBytes, ImageError> {
    let rest = uri
        .get("data:".len()..)
        .ok_or_else(|| ImageError::MalformedInlineData("not a data URI".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::MalformedInlineData("missing ',' separator".to_string()))?;

    let is_base64 = meta.to_ascii_lowercase().ends_with(";base64");
    let mime = meta.split(';').next().unwrap_or_default().trim();
    let content_type = if mime.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime.to_ascii_lowercase()
    };

    let data = if is_base64 {
        decode_base64(payload, max_bytes)?
    } else {
        check_size(payload.len() as u64, max_bytes)?;
        Bytes::copy_from_slice(payload.as_bytes())
    };

    Ok(ImageBytes { data, content_type })
}

/// Lenient base64 decoding: whitespace and padding are ignored
fn decode_base64(payload: &str, max_bytes: u64) -> Result<Bytes, ImageError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let unpadded = compact.trim_end_matches('=');
    check_size((unpadded.len() as u64 * 3) / 4, max_bytes)?;
    STANDARD_NO_PAD
        .decode(unpadded)
        .map(Bytes::from)
        .map_err(|e| ImageError::MalformedInlineData(e.to_string()))
}

fn check_size(size: u64, limit: u64) -> Result<(), ImageError> {
    if size > limit {
        Err(ImageError::PayloadTooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// Best-effort MIME type from content, then from the file extension
pub fn guess_content_type(data: &[u8], name: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    };
    mime.to_string()
}

/// Resolves image references for one notebook
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: Client,
    base_dir: PathBuf,
    max_bytes: u64,
    fetch_timeout: Duration,
}

impl ImageResolver {
    /// Create a resolver for a notebook located in `base_dir`
    pub fn new(config: &ImageConfig, base_dir: impl Into<PathBuf>) -> Self {
        let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs);
        let client = Client::builder().timeout(fetch_timeout).build().unwrap_or_else(|e| {
            warn!("Could not configure image HTTP client ({}), using defaults with per-request timeouts", e);
            Client::new()
        });
        Self {
            client,
            base_dir: base_dir.into(),
            max_bytes: config.max_bytes,
            fetch_timeout,
        }
    }

    /// Directory relative references are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a reference found in `cell` into bytes
    pub async fn resolve(&self, source_ref: &str, cell: &Cell) -> Result<ImageBytes, ImageError> {
        let source = classify(source_ref, &self.base_dir);
        debug!("Resolving image {:?} as {:?}", source_ref, source);

        match source {
            ImageSource::InlineData(uri) => decode_data_uri(&uri, self.max_bytes),
            ImageSource::Attachment(name) => self.resolve_attachment(&name, cell),
            ImageSource::Network(url) => self.fetch(&url).await,
            ImageSource::Local(path) => self.read_local(&path).await,
        }
    }

    fn resolve_attachment(&self, name: &str, cell: &Cell) -> Result<ImageBytes, ImageError> {
        let (payload, mime) = cell
            .attachment(name)
            .ok_or_else(|| ImageError::MissingAttachment(name.to_string()))?;
        let data = decode_base64(payload, self.max_bytes)?;
        Ok(ImageBytes {
            data,
            content_type: mime.to_string(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<ImageBytes, ImageError> {
        let parsed = Url::parse(url).map_err(|e| ImageError::FetchError {
            status_or_cause: format!("invalid URL: {}", e),
        })?;

        let transport_error = |e: reqwest::Error| ImageError::FetchError {
            status_or_cause: if e.is_timeout() {
                format!("timed out after {}s", self.fetch_timeout.as_secs())
            } else {
                e.to_string()
            },
        };

        let mut response = self
            .client
            .get(parsed.clone())
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::FetchError {
                status_or_cause: format!("HTTP {}", status),
            });
        }

        if let Some(announced) = response.content_length() {
            check_size(announced, self.max_bytes)?;
        }

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|v| v.starts_with("image/"));

        let mut buffer = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            check_size((buffer.len() + chunk.len()) as u64, self.max_bytes)?;
            buffer.extend_from_slice(&chunk);
        }
        let data = buffer.freeze();

        let content_type = header_type.unwrap_or_else(|| guess_content_type(&data, parsed.path()));
        Ok(ImageBytes { data, content_type })
    }

    async fn read_local(&self, path: &Path) -> Result<ImageBytes, ImageError> {
        let not_found = || ImageError::FileNotFound(path.to_path_buf());

        let metadata = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        check_size(metadata.len(), self.max_bytes)?;

        let data = tokio::fs::read(path).await.map_err(|_| not_found())?;
        let content_type = guess_content_type(&data, &path.to_string_lossy());
        Ok(ImageBytes {
            data: Bytes::from(data),
            content_type,
        })
    }
}
