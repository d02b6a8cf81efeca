use log::{debug, warn};

use crate::errors::AppError;
use crate::markdown::{self, Augmentation, MarkdownBlock};
use crate::notebook::Cell;
use crate::pipeline::{CellContext, CellStats, ProcessingResult, description_failure_marker, translation_failure_marker};

// @module: Markdown cell pipeline

/// Whether a text block carries anything worth translating (rules like `---` do not)
fn has_translatable_text(content: &str) -> bool {
    content.chars().any(char::is_alphabetic)
}

async fn translate_block(content: &str, ctx: &CellContext<'_>, stats: &mut CellStats) -> Augmentation {
    let body = match ctx.capability.translate(content, ctx.language).await {
        Ok(translation) => {
            stats.translated_blocks += 1;
            translation
        }
        Err(e) => {
            warn!("Translation failed, writing failure marker: {}", e);
            stats.failure_markers += 1;
            translation_failure_marker(&e)
        }
    };
    Augmentation {
        label: ctx.labels.translation_label,
        body,
    }
}

async fn describe_block(
    source_ref: &str,
    cell: &Cell,
    ctx: &CellContext<'_>,
    stats: &mut CellStats,
) -> Result<Augmentation, AppError> {
    let outcome = match ctx.images.resolve(source_ref, cell).await {
        Ok(image) => {
            debug!("Resolved image {} ({}, {} bytes)", source_ref, image.content_type, image.data.len());
            // Resolution can take a while; do not start a model call after an abort
            ctx.cancel.check()?;
            ctx.capability
                .describe_image(&image, ctx.language)
                .await
                .map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    };

    let body = match outcome {
        Ok(description) => {
            stats.described_images += 1;
            description
        }
        Err(cause) => {
            warn!("Could not describe image {}: {}", source_ref, cause);
            stats.failure_markers += 1;
            description_failure_marker(&cause)
        }
    };

    Ok(Augmentation {
        label: ctx.labels.description_label,
        body,
    })
}

/// Translate every text block and describe every image of a markdown cell.
///
/// Blocks are handled in source order. A failing block gets a failure marker
/// under its caption instead of aborting the cell; only cancellation is an
/// error.
pub async fn process_markdown_cell(index: usize, cell: &Cell, ctx: &CellContext<'_>) -> Result<ProcessingResult, AppError> {
    let segments = markdown::segment(cell.source());
    let mut augmentations = Vec::with_capacity(segments.len());
    let mut stats = CellStats::default();

    for segment in &segments {
        let augmentation = match &segment.block {
            MarkdownBlock::Blank => None,
            MarkdownBlock::Text { content } if !has_translatable_text(content) => None,
            MarkdownBlock::Text { content } => {
                ctx.cancel.check()?;
                Some(translate_block(content, ctx, &mut stats).await)
            }
            MarkdownBlock::Image { source_ref, .. } => {
                ctx.cancel.check()?;
                Some(describe_block(source_ref, cell, ctx, &mut stats).await?)
            }
        };
        augmentations.push(augmentation);
    }

    if augmentations.iter().all(Option::is_none) {
        debug!("Markdown cell {} has nothing to translate", index);
        return Ok(ProcessingResult::unchanged(cell));
    }

    let source = markdown::reassemble(&segments, &augmentations);
    debug!(
        "Markdown cell {}: {} translated, {} described, {} failed",
        index, stats.translated_blocks, stats.described_images, stats.failure_markers
    );

    Ok(ProcessingResult {
        cell: cell.with_source(&source),
        stats,
    })
}
