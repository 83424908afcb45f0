//! Centralized default constants for jotbox.
//!
//! Every crate references these constants instead of defining its own magic
//! numbers. Runtime overrides live in [`crate::config`].

// =============================================================================
// NAMING
// =============================================================================

/// Maximum filename length in bytes (object-store key limit).
pub const FILENAME_MAX_LEN: usize = 1024;

/// Maximum owner length in bytes (bucket-name limit).
pub const OWNER_MAX_LEN: usize = 63;

// =============================================================================
// PREVIEW
// =============================================================================

/// Content longer than this many characters is truncated in previews.
pub const PREVIEW_MAX_CHARS: usize = 24;

/// Characters of content kept in front of the ellipsis.
pub const PREVIEW_PREFIX_CHARS: usize = 21;

/// Marker appended to truncated previews.
pub const PREVIEW_ELLIPSIS: &str = "...";

// =============================================================================
// STORES
// =============================================================================

/// Per store call timeout in milliseconds.
pub const STORE_TIMEOUT_MS: u64 = 10_000;

/// Content type recorded for note objects.
pub const NOTE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
