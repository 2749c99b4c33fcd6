//! Password-keyed envelope for request and response payloads.
//!
//! Every payload travels as a 12-byte nonce followed by the AEAD
//! ciphertext, sealed with ChaCha20-Poly1305 under a SHA-256 digest of the
//! user's password. The tag makes a wrong password, a truncated frame, and
//! a tampered frame all fail the same way: `decrypt` returns `None`.

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Bytes the envelope adds on top of the cleartext length.
pub const ENVELOPE_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

fn cipher(password: &str) -> ChaCha20Poly1305 {
    let key = Sha256::digest(password.as_bytes());
    ChaCha20Poly1305::new(Key::from_slice(&key))
}

pub fn encrypt(password: &str, cleartext: &[u8]) -> Vec<u8> {
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let sealed = cipher(password)
        .encrypt(&nonce, cleartext)
        .expect("chacha20poly1305 never fails to seal");
    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&sealed);
    out
}

pub fn decrypt(password: &str, ciphertext: &[u8]) -> Option<Vec<u8>> {
    if ciphertext.len() < ENVELOPE_OVERHEAD {
        return None;
    }
    let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
    cipher(password).decrypt(Nonce::from_slice(nonce), sealed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let sealed = encrypt("hunter2", b"FS_SESSION 0 1\0");
        assert_eq!(sealed.len(), 15 + ENVELOPE_OVERHEAD);
        assert_eq!(
            decrypt("hunter2", &sealed).unwrap(),
            b"FS_SESSION 0 1\0".to_vec()
        );
    }

    #[test]
    fn wrong_password_fails() {
        let sealed = encrypt("hunter2", b"payload");
        assert_eq!(decrypt("hunter3", &sealed), None);
    }

    #[test]
    fn tampering_fails() {
        let mut sealed = encrypt("hunter2", b"payload");
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert_eq!(decrypt("hunter2", &sealed), None);
    }

    #[test]
    fn truncation_fails() {
        let sealed = encrypt("hunter2", b"payload");
        assert_eq!(decrypt("hunter2", &sealed[..ENVELOPE_OVERHEAD - 1]), None);
        assert_eq!(decrypt("hunter2", &[]), None);
    }

    #[test]
    fn nonces_differ_between_frames() {
        let a = encrypt("hunter2", b"same");
        let b = encrypt("hunter2", b"same");
        assert_ne!(a, b);
    }
}
