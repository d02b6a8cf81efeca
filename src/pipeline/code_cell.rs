use log::{debug, warn};

use crate::errors::AppError;
use crate::notebook::Cell;
use crate::pipeline::integrity::check_integrity;
use crate::pipeline::{CellContext, CellStats, ProcessingResult, commenting_failure_marker};

// @module: Code cell pipeline

/// Comment a code cell in one capability call.
///
/// The result is accepted only when its executable lines match the original;
/// otherwise the original code is kept. A failed call leaves the code intact
/// under a one-line failure comment.
pub async fn process_code_cell(index: usize, cell: &Cell, ctx: &CellContext<'_>) -> Result<ProcessingResult, AppError> {
    let original = cell.source();
    if original.trim().is_empty() {
        return Ok(ProcessingResult::unchanged(cell));
    }

    ctx.cancel.check()?;
    let commented = match ctx
        .capability
        .comment_and_translate_code(original, ctx.language, ctx.code_language)
        .await
    {
        Ok(commented) => commented,
        Err(e) => {
            warn!("Code cell {}: commenting failed, keeping original code: {}", index, e);
            let marker = ctx.code_language.comment(&commenting_failure_marker(&e));
            return Ok(ProcessingResult {
                cell: cell.with_source(&format!("{}\n{}", marker, original)),
                stats: CellStats {
                    failure_markers: 1,
                    ..CellStats::default()
                },
            });
        }
    };

    match check_integrity(original, &commented, ctx.code_language) {
        Ok(()) => {
            debug!("Code cell {} commented", index);
            Ok(ProcessingResult {
                cell: cell.with_source(&commented),
                stats: CellStats::default(),
            })
        }
        Err(violation) => {
            warn!("Code cell {}: model altered the code ({}), keeping original", index, violation);
            Ok(ProcessingResult {
                cell: cell.clone(),
                stats: CellStats {
                    integrity_fallback: true,
                    ..CellStats::default()
                },
            })
        }
    }
}
