//! Digests used in content-addressed file names.

use sha2::{Digest, Sha256};

/// Width of a digest in bytes (128 bits).
pub const DIGEST_BYTES: usize = 16;

/// Hash the given parts into a 32 character lowercase hex string.
///
/// Each part is terminated by a NUL byte so that `["ab", "c"]` and
/// `["a", "bc"]` produce different digests.
#[must_use]
pub fn digest<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    let hash = hasher.finalize();
    hex::encode(&hash[..DIGEST_BYTES])
}
