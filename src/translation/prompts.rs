/*!
 * Prompt templates for the three model capabilities.
 *
 * Each template encodes the contract its pipeline relies on: translations and
 * descriptions come back as bare text, commented code comes back as bare code
 * with every executable statement untouched.
 */

use crate::language_utils::TargetLanguage;
use crate::pipeline::integrity::CodeLanguage;

/// System prompt for markdown translation
pub const TRANSLATOR_SYSTEM: &str =
    "You are a professional translator specialized in maintaining Markdown formatting.";

/// User prompt for markdown translation.
/// Placeholders: {target_language}, {text}
pub const TRANSLATE_TEMPLATE: &str = r#"Translate the following Markdown text into {target_language}.

Requirements:
1. Translate the actual text content into {target_language}; do not repeat the original.
2. Preserve all Markdown inline syntax exactly (headers, links, emphasis, inline code, tables).
3. Do not translate code, URLs, or link targets.
4. If the text is already in {target_language}, return it unchanged.
5. Return ONLY the translated text, with no additional commentary, notes, or quotation marks.

Text:
{text}"#;

/// User prompt for image descriptions.
/// Placeholders: {target_language}
pub const DESCRIBE_TEMPLATE: &str = r#"Describe this image in {target_language} in one to three sentences.
Mention the main subject and any text, chart, or diagram content that matters for understanding it.
Return ONLY the description, with no heading or additional commentary."#;

/// System prompt for code commenting.
/// Placeholders: {target_language}
pub const COMMENTER_SYSTEM: &str = "You are a coding expert who adds helpful comments in {target_language}.";

/// User prompt for code commenting.
/// Placeholders: {target_language}, {code_language}, {comment_prefix}, {code}
pub const COMMENT_TEMPLATE: &str = r#"Add explanatory comments to the following {code_language} code.

Requirements:
1. Add a comment for each logical step, written in {target_language}.
2. Translate any existing comments into {target_language}.
3. Use `{comment_prefix}` line comments placed above the line they explain.
4. Do NOT alter, reorder, add, or remove any executable statement. Keep indentation unchanged.
5. Return ONLY the commented code. Do not wrap it in a Markdown code block and do not add prose.

Code:
{code}"#;

/// Fill `{target_language}` in a template
fn with_language(template: &str, language: TargetLanguage) -> String {
    template.replace("{target_language}", language.display_name())
}

/// Prompt asking for a markdown translation
pub fn translate_prompt(text: &str, language: TargetLanguage) -> String {
    // Text goes in last so placeholders inside it are never substituted
    with_language(TRANSLATE_TEMPLATE, language).replace("{text}", text)
}

/// Prompt asking for an image description
pub fn describe_prompt(language: TargetLanguage) -> String {
    with_language(DESCRIBE_TEMPLATE, language)
}

/// System prompt for the code commenter
pub fn commenter_system(language: TargetLanguage) -> String {
    with_language(COMMENTER_SYSTEM, language)
}

/// Prompt asking for commented code
pub fn comment_prompt(code: &str, language: TargetLanguage, code_language: &CodeLanguage) -> String {
    with_language(COMMENT_TEMPLATE, language)
        .replace("{code_language}", code_language.name())
        .replace("{comment_prefix}", code_language.comment_prefix())
        .replace("{code}", code)
}

/// Remove a Markdown code fence wrapping the whole response.
///
/// Models often answer with ```` ```python ... ``` ```` despite being told not to.
/// Only a fence that opens on the first line and closes on the last is removed.
pub fn strip_code_fence(response: &str) -> String {
    // Leading indentation of the first line is significant in code
    let trimmed = response.trim_end().trim_start_matches(['\n', '\r']);
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed.to_string();
    };

    // Drop the info string on the opening line
    match body.split_once('\n') {
        Some((info, code)) if !info.contains('`') => code.trim_matches('\n').to_string(),
        _ => trimmed.to_string(),
    }
}
