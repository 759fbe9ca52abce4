use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, warn};

use quill_core::Tier;

use crate::extract::ExtractorSet;
use crate::types::{BudgetAllocation, FileInput, FileStat, PartialFile};

/// Fraction of the remaining budget past which a whitespace cut is accepted
const WORD_BOUNDARY_THRESHOLD: f64 = 0.8;

/// Allocate a batch of files against the tier's character budget
///
/// Files are processed in upload order. Images bypass the budget and become
/// data URLs; text files accumulate characters until the cap, after which
/// at most one file is truncated and the rest are excluded. Per-file
/// extraction failures are logged and skipped, never fatal.
pub fn allocate(files: &[FileInput], tier: Tier, extractors: &ExtractorSet) -> BudgetAllocation {
    let max_chars = tier.max_chars();
    let mut allocation = BudgetAllocation {
        max_chars,
        ..BudgetAllocation::default()
    };
    // set once the cap is hit; a word-boundary cut leaves counted chars
    // short of the cap, so the counter alone cannot close the budget
    let mut budget_closed = false;

    for file in files {
        let mime_type = file.mime_type();

        if mime_type.starts_with("image/") {
            let encoded = BASE64.encode(&file.bytes);
            allocation
                .image_parts
                .push(format!("data:{mime_type};base64,{encoded}"));
            continue;
        }

        let Some(extractor) = extractors.find(&mime_type) else {
            debug!(name = %file.name, %mime_type, "unsupported file type, skipping");
            continue;
        };

        let text = match extractor.extract(file) {
            Ok(text) => text,
            Err(error) => {
                warn!(name = %file.name, %mime_type, %error, "extraction failed, skipping file");
                continue;
            }
        };

        let stat = FileStat {
            name: file.name.clone(),
            size: file.size(),
        };

        // once a partial file has landed, everything after it falls here
        let remaining = max_chars.saturating_sub(allocation.total_raw_chars);
        if budget_closed || remaining == 0 {
            allocation.limit_exceeded = true;
            allocation.excluded_files.push(stat);
            continue;
        }

        let char_count = text.chars().count();
        if char_count <= remaining {
            allocation.extracted_parts.push(wrap(&file.name, &text));
            allocation.total_raw_chars += char_count;
            allocation.included_files.push(stat);
            continue;
        }

        let (truncated, included_chars) = truncate_at_word_boundary(&text, remaining);
        allocation.extracted_parts.push(wrap(&file.name, truncated));
        allocation.total_raw_chars += included_chars;
        allocation.limit_exceeded = true;
        allocation.partial_file = Some(PartialFile {
            name: stat.name,
            size: stat.size,
            included_chars,
        });
        budget_closed = true;
    }

    allocation
}

/// Tag extracted text with its filename so the downstream prompt can
/// attribute content to a source document
fn wrap(name: &str, text: &str) -> String {
    format!("--- START OF FILE: {name} ---\n\n{text}\n\n--- END OF FILE: {name} ---")
}

/// Cut `text` down to at most `limit` characters
///
/// Prefers the last whitespace found past 80% of the limit so words are not
/// split; falls back to the exact character limit. Counts characters, so a
/// cut never lands inside a multi-byte sequence.
fn truncate_at_word_boundary(text: &str, limit: usize) -> (&str, usize) {
    let mut cut_byte = text.len();
    let mut last_ws: Option<(usize, usize)> = None; // (byte offset, char count)

    for (count, (byte_offset, ch)) in text.char_indices().enumerate() {
        if count == limit {
            cut_byte = byte_offset;
            break;
        }
        if ch.is_whitespace() {
            last_ws = Some((byte_offset, count));
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let threshold = (limit as f64) * WORD_BOUNDARY_THRESHOLD;
    if let Some((byte_offset, char_count)) = last_ws {
        #[allow(clippy::cast_precision_loss)]
        if (char_count as f64) > threshold {
            return (&text[..byte_offset], char_count);
        }
    }

    (&text[..cut_byte], limit)
}
