use sha2::{Digest, Sha256};
use stockwatch_core::Variant;

/// Order-independent digest of a variant set.
///
/// Each variant contributes `id`, availability and price; entries are sorted
/// before hashing so upstream reordering never looks like a change.
#[must_use]
pub fn content_hash(variants: &[Variant]) -> String {
    let mut entries: Vec<String> = variants
        .iter()
        .map(|v| format!("{}\u{1f}{}\u{1f}{}", v.id, u8::from(v.available), v.price))
        .collect();
    entries.sort_unstable();

    let mut hasher = Sha256::new();
    for entry in &entries {
        hasher.update(entry.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
