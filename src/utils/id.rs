use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Joins the parts with ':', hashes with Blake3 (16 bytes) and encodes the
/// result as base64url without padding. Returns a stable, compact
/// identifier (~22 characters) for any tuple of strings.
pub fn stable_id(parts: &[&str]) -> String {
    let hash = blake3::hash(parts.join(":").as_bytes());
    let hash_bytes = hash.as_bytes();
    // Take first 16 bytes for compact output
    let truncated = &hash_bytes[..16];
    URL_SAFE_NO_PAD.encode(truncated)
}

/// Same encoding over raw bytes; used for directory fingerprints.
pub fn digest_id(bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes);
    URL_SAFE_NO_PAD.encode(&hash.as_bytes()[..16])
}
