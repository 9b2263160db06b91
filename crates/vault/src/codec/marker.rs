//! The `UNENCRYPTED:` marker for values stored without encryption.

/// Prefix of a stored value that holds raw plaintext.
///
/// Reserved: `:` is outside the base64 alphabet, so no envelope starts with it.
pub const PLAINTEXT_MARKER: &str = "UNENCRYPTED:";

/// Prefix `plaintext` with [`PLAINTEXT_MARKER`].
pub fn mark(plaintext: &str) -> String {
    let mut stored = String::with_capacity(PLAINTEXT_MARKER.len() + plaintext.len());
    stored.push_str(PLAINTEXT_MARKER);
    stored.push_str(plaintext);
    stored
}

/// Return the raw value if `stored` carries the marker.
pub fn strip(stored: &str) -> Option<&str> {
    stored.strip_prefix(PLAINTEXT_MARKER)
}
