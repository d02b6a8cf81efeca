/*!
 * Core capability service implementation.
 *
 * This module defines the `ModelCapability` seam used by the cell pipelines and
 * `TranslationService`, which implements it on top of any `Provider`.
 */

use async_trait::async_trait;
use log::debug;
use std::time::Instant;

use super::cache::{CapabilityCache, Operation};
use super::prompts;
use crate::errors::ProviderError;
use crate::images::ImageBytes;
use crate::language_utils::TargetLanguage;
use crate::pipeline::integrity::CodeLanguage;
use crate::providers::{ChatPrompt, Provider};

/// The three model-backed operations the pipelines depend on.
///
/// Each call is an independent request/response; no session state is shared
/// between calls.
#[async_trait]
pub trait ModelCapability: Send + Sync {
    /// Translate markdown text, preserving inline syntax
    async fn translate(&self, text: &str, language: TargetLanguage) -> Result<String, ProviderError>;

    /// Describe an image in one to three sentences
    async fn describe_image(&self, image: &ImageBytes, language: TargetLanguage) -> Result<String, ProviderError>;

    /// Add comments to code and translate existing ones, leaving statements untouched
    async fn comment_and_translate_code(
        &self,
        code: &str,
        language: TargetLanguage,
        code_language: &CodeLanguage,
    ) -> Result<String, ProviderError>;
}

/// Capability implementation over a model provider
#[derive(Debug)]
pub struct TranslationService<P: Provider> {
    /// Provider implementation
    provider: P,
    /// Results cache for repeated inputs
    cache: CapabilityCache,
}

impl<P: Provider> TranslationService<P> {
    /// Create a new service with caching enabled
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: CapabilityCache::default(),
        }
    }

    /// Underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Results cache
    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    /// Test the connection to the provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Send a prompt and return the trimmed, non-empty answer
    async fn ask(&self, operation: Operation, prompt: ChatPrompt) -> Result<String, ProviderError> {
        let start_time = Instant::now();
        let response = self.provider.complete(prompt).await?;
        let text = P::extract_text(&response);
        debug!("{:?} answered in {:?}", operation, start_time.elapsed());

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    /// Serve from cache or run `prompt` and remember the answer
    async fn cached(
        &self,
        operation: Operation,
        language: TargetLanguage,
        key: &[u8],
        prompt: ChatPrompt,
        postprocess: fn(&str) -> String,
    ) -> Result<String, ProviderError> {
        if let Some(hit) = self.cache.get(operation, language, key) {
            return Ok(hit);
        }
        let answer = postprocess(&self.ask(operation, prompt).await?);
        if answer.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        self.cache.store(operation, language, key, &answer);
        Ok(answer)
    }
}

#[async_trait]
impl<P: Provider> ModelCapability for TranslationService<P> {
    async fn translate(&self, text: &str, language: TargetLanguage) -> Result<String, ProviderError> {
        let prompt = ChatPrompt::text(prompts::TRANSLATOR_SYSTEM, prompts::translate_prompt(text, language));
        self.cached(Operation::Translate, language, text.as_bytes(), prompt, str::to_string)
            .await
    }

    async fn describe_image(&self, image: &ImageBytes, language: TargetLanguage) -> Result<String, ProviderError> {
        let prompt = ChatPrompt::with_image(prompts::describe_prompt(language), image.clone());
        self.cached(Operation::DescribeImage, language, &image.data, prompt, str::to_string)
            .await
    }

    async fn comment_and_translate_code(
        &self,
        code: &str,
        language: TargetLanguage,
        code_language: &CodeLanguage,
    ) -> Result<String, ProviderError> {
        let prompt = ChatPrompt::text(
            prompts::commenter_system(language),
            prompts::comment_prompt(code, language, code_language),
        );
        let key = format!("{}\0{}", code_language.name(), code);
        self.cached(
            Operation::CommentCode,
            language,
            key.as_bytes(),
            prompt,
            prompts::strip_code_fence,
        )
        .await
    }
}
