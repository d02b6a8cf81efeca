/*!
 * Model capabilities for notebook translation.
 *
 * - `core`: the `ModelCapability` trait and `TranslationService`, its provider-backed implementation
 * - `cache`: in-memory caching of capability results
 * - `prompts`: prompt templates encoding each capability's contract
 */

pub use self::cache::CapabilityCache;
pub use self::core::{ModelCapability, TranslationService};

pub mod cache;
pub mod core;
pub mod prompts;
