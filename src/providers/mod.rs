/*!
 * Provider implementations for the model backing the capabilities.
 *
 * This module contains the client implementations:
 * - OpenAI: any OpenAI-compatible chat-completions endpoint (OpenRouter by default)
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::images::ImageBytes;

/// A single-turn chat prompt, optionally carrying one image
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    /// System message
    pub system: Option<String>,
    /// User message text
    pub user: String,
    /// Image attached to the user message
    pub image: Option<ImageBytes>,
}

impl ChatPrompt {
    /// Text-only prompt
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
            image: None,
        }
    }

    /// Prompt with an attached image and no system message
    pub fn with_image(user: impl Into<String>, image: ImageBytes) -> Self {
        Self {
            system: None,
            user: user.into(),
            image: Some(image),
        }
    }
}

/// Common trait for all model providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a prompt using this provider
    async fn complete(&self, prompt: ChatPrompt) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

pub mod mock;
pub mod openai;
