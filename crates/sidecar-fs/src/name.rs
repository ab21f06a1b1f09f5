//! File name validation

use crate::{Error, Result};

/// Validate that `name` is a single path component safe to join onto a
/// target directory.
///
/// Rejects empty names, `.`/`..`, and anything containing a separator or NUL,
/// so a data key can never address a file outside its directory.
pub fn validate_file_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative directory reference"
    } else if name.contains('/') || name.contains('\\') {
        "name contains a path separator"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };

    Err(Error::InvalidFileName {
        name: name.to_string(),
        reason,
    })
}
