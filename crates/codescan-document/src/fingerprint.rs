// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page fingerprints: short SHA-256 digests used to correlate log lines.

use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 16;

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Truncated digest identifying a page image in diagnostics.
pub fn fingerprint(data: &[u8]) -> String {
    let mut digest = hash_bytes(data);
    digest.truncate(FINGERPRINT_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_known_value() {
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn fingerprint_is_digest_prefix() {
        assert_eq!(fingerprint(b"hello"), "2cf24dba5fb0a30e");
        assert_ne!(fingerprint(b"page one"), fingerprint(b"page two"));
    }
}
