use std::path::{Component, Path};

use crate::TransferError;

/// Validates a file name advertised by a responder.
///
/// The name is joined onto the local output directory, so it must be a
/// single bare component. Rejects:
/// - Empty names, `.` and `..`
/// - Any `/` or `\` separator
/// - Absolute paths and Windows prefixes (`C:`, `\\server`)
/// - Embedded NUL bytes
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidPath("empty file name".into()));
    }

    if name.contains('\0') {
        return Err(TransferError::InvalidPath(format!(
            "NUL byte in file name: {name:?}"
        )));
    }

    if name.contains(['/', '\\']) {
        return Err(TransferError::InvalidPath(format!(
            "directory separator in file name: {name}"
        )));
    }

    // Catches `C:` style drive prefixes on every platform.
    if name.len() >= 2 && name.as_bytes()[1] == b':' && name.as_bytes()[0].is_ascii_alphabetic() {
        return Err(TransferError::InvalidPath(format!(
            "drive prefix not allowed: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(TransferError::InvalidPath(format!(
            "not a bare file name: {name}"
        ))),
    }
}
