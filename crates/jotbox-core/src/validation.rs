//! Filename and owner validation.
//!
//! Both checks are pure and run before any store call, so a rejected name
//! never causes a side effect. Filenames double as blob object keys and owners
//! double as bucket names, which is where the limits come from.

use thiserror::Error;

use crate::defaults;

/// Reason a filename or owner was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must not contain a NUL character")]
    ContainsNul { field: &'static str },

    #[error("{field} must not contain a path separator")]
    ContainsSeparator { field: &'static str },

    #[error("{field} must not be \".\" or \"..\"")]
    Reserved { field: &'static str },

    #[error("{field} is {len} bytes long, the maximum is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

fn validate_name(field: &'static str, value: &str, max_len: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.contains('\0') {
        return Err(ValidationError::ContainsNul { field });
    }
    if value.contains('/') || value.contains('\\') {
        return Err(ValidationError::ContainsSeparator { field });
    }
    if value == "." || value == ".." {
        return Err(ValidationError::Reserved { field });
    }
    if value.len() > max_len {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max: max_len,
        });
    }
    Ok(())
}

/// Validate a note filename against a maximum byte length.
pub fn validate_filename(filename: &str, max_len: usize) -> Result<(), ValidationError> {
    validate_name("filename", filename, max_len)
}

/// Validate an owner namespace (bucket name).
pub fn validate_owner(owner: &str) -> Result<(), ValidationError> {
    validate_name("owner", owner, defaults::OWNER_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::FILENAME_MAX_LEN;

    #[test]
    fn test_valid_filenames() {
        assert!(validate_filename("groceries", FILENAME_MAX_LEN).is_ok());
        assert!(validate_filename("notes.txt", FILENAME_MAX_LEN).is_ok());
        assert!(validate_filename("...", FILENAME_MAX_LEN).is_ok());
        assert!(validate_filename("ünïcödé ✓", FILENAME_MAX_LEN).is_ok());
    }

    #[test]
    fn test_rejects_separator() {
        assert_eq!(
            validate_filename("a/b", FILENAME_MAX_LEN),
            Err(ValidationError::ContainsSeparator { field: "filename" })
        );
        assert!(validate_filename("a\\b", FILENAME_MAX_LEN).is_err());
    }

    #[test]
    fn test_rejects_nul() {
        assert_eq!(
            validate_filename("bad\0name", FILENAME_MAX_LEN),
            Err(ValidationError::ContainsNul { field: "filename" })
        );
    }

    #[test]
    fn test_rejects_dot_and_dot_dot() {
        assert!(matches!(
            validate_filename(".", FILENAME_MAX_LEN),
            Err(ValidationError::Reserved { .. })
        ));
        assert!(matches!(
            validate_filename("..", FILENAME_MAX_LEN),
            Err(ValidationError::Reserved { .. })
        ));
    }

    #[test]
    fn test_length_is_measured_in_bytes() {
        let exact = "a".repeat(FILENAME_MAX_LEN);
        assert!(validate_filename(&exact, FILENAME_MAX_LEN).is_ok());

        let over = "a".repeat(FILENAME_MAX_LEN + 1);
        assert_eq!(
            validate_filename(&over, FILENAME_MAX_LEN),
            Err(ValidationError::TooLong {
                field: "filename",
                len: FILENAME_MAX_LEN + 1,
                max: FILENAME_MAX_LEN,
            })
        );

        // 'é' is two bytes, so 3 of them exceed a 5-byte limit
        assert!(validate_filename("ééé", 5).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            validate_filename("", FILENAME_MAX_LEN),
            Err(ValidationError::Empty { field: "filename" })
        );
    }

    #[test]
    fn test_owner_rules() {
        assert!(validate_owner("alice").is_ok());
        assert!(validate_owner("").is_err());
        assert!(validate_owner("a/b").is_err());
        assert!(validate_owner(&"o".repeat(defaults::OWNER_MAX_LEN)).is_ok());

        let err = validate_owner(&"o".repeat(defaults::OWNER_MAX_LEN + 1)).unwrap_err();
        assert_eq!(err.to_string(), "owner is 64 bytes long, the maximum is 63");
    }
}
