//! Content preview derivation for note listings.

use crate::defaults::{PREVIEW_ELLIPSIS, PREVIEW_MAX_CHARS, PREVIEW_PREFIX_CHARS};

/// Shorten note content for display.
///
/// Content of at most [`PREVIEW_MAX_CHARS`] characters is returned unchanged.
/// Longer content keeps its first [`PREVIEW_PREFIX_CHARS`] characters followed
/// by [`PREVIEW_ELLIPSIS`]. Counting is per `char`, so a multi-byte code point
/// is never split.
pub fn content_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_MAX_CHARS) {
        None => content.to_string(),
        Some(_) => {
            let cut = content
                .char_indices()
                .nth(PREVIEW_PREFIX_CHARS)
                .map(|(idx, _)| idx)
                .unwrap_or(content.len());
            format!("{}{}", &content[..cut], PREVIEW_ELLIPSIS)
        }
    }
}
