//! Content addressing.
//!
//! A content address is the SHA-256 digest of the UTF-8 text, encoded as
//! URL-safe base64 without padding. Statement identity hashes cover the whole
//! serialised statement; content hashes cover only the body, so reposts of the
//! same body by different authors share a content hash.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Hash `text` into its content address.
pub fn content_address(text: &str) -> String {
  URL_SAFE_NO_PAD.encode(Sha256::digest(text.as_bytes()))
}

/// Returns `true` if `hash` is the content address of `text`.
pub fn verify(text: &str, hash: &str) -> bool { content_address(text) == hash }
