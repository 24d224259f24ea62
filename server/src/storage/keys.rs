//! Blob key naming
//!
//! Every uploaded object gets a fresh v4 UUID so identical submissions never
//! overwrite each other.

use uuid::Uuid;

/// Longest extension carried over from a submitted filename
pub const MAX_EXTENSION_LEN: usize = 16;

/// Suffix of form record blobs
pub const RECORD_SUFFIX: &str = ".json";

/// Extension of a submitted filename: the text after the last `.`.
///
/// Returns `None` when there is no dot, nothing after it, or the extension
/// contains anything other than ASCII alphanumerics.
pub fn file_extension(filename: &str) -> Option<&str> {
    // Browsers on Windows may send a full path
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (_, ext) = name.rsplit_once('.')?;

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(ext)
}

/// Key for an avatar image: `<uuid>.<ext>`, or a bare `<uuid>` if the
/// filename carries no usable extension
pub fn image_key(filename: &str) -> String {
    let id = Uuid::new_v4();
    match file_extension(filename) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Key for a serialized form record: `<uuid>.json`
pub fn record_key() -> String {
    format!("{}{}", Uuid::new_v4(), RECORD_SUFFIX)
}
