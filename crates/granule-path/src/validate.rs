//! Validation for dot paths.

use crate::{PathError, SEPARATOR};

/// Maximum allowed path string length in bytes.
pub const MAX_PATH_LENGTH: usize = 1024;

/// Maximum allowed number of segments.
pub const MAX_PATH_DEPTH: usize = 256;

/// Validate a dot path.
///
/// # Errors
///
/// Returns an error if:
/// - a segment is empty (`"a..b"`, `".a"`, `"a."`)
/// - the path exceeds [`MAX_PATH_LENGTH`] bytes or [`MAX_PATH_DEPTH`] segments
///
/// The root path (`""`) is valid.
///
/// ```
/// use granule_path::validate_path;
///
/// validate_path("").unwrap();
/// validate_path("user.name").unwrap();
/// validate_path("user..name").unwrap_err();
/// ```
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Ok(());
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathError::TooLong);
    }
    let mut depth = 0;
    for segment in path.split(SEPARATOR) {
        if segment.is_empty() {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        depth += 1;
    }
    if depth > MAX_PATH_DEPTH {
        return Err(PathError::TooDeep);
    }
    Ok(())
}
