// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! AES-256-GCM encryption for bearer credentials at rest.
//!
//! Every call to [`CredentialCipher::encrypt`] uses a fresh random nonce.
//! The key is derived once, process-wide, by hashing the configured secret
//! with SHA-256 down to the cipher's 32-byte key size.
//!
//! Token layout: `base64( b64(nonce) ":" b64(tag) ":" b64(ciphertext) )`.
//! The delimiter is not part of the base64 alphabet, so component splits
//! are unambiguous, and the outer encoding yields a single opaque string
//! that is safe to store and transport.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

/// Size of the AES-256 key in bytes.
const KEY_LEN: usize = 32;

/// Size of the GCM nonce in bytes (96 bits, standard for GCM).
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Separator between the encoded token components.
const DELIMITER: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("cannot encrypt an empty credential")]
    EmptyPlaintext,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("malformed cipher token: {0}")]
    Malformed(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Symmetric cipher for opaque bearer credentials.
#[derive(Clone)]
pub struct CredentialCipher {
    key: [u8; KEY_LEN],
}

impl CredentialCipher {
    /// Derive the process-wide key from the configured secret.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Encrypt a plaintext credential into a single opaque token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Err(CipherError::EmptyPlaintext);
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CipherError::Encryption(format!("failed to create cipher: {e}")))?;

        // Fresh random nonce per call; reuse would break GCM entirely.
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let mut sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encryption(format!("{e}")))?;

        // aes-gcm appends the tag to the ciphertext; split it back out so
        // the token carries each component explicitly.
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        let ciphertext = sealed;

        let inner = format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            BASE64.encode(nonce),
            BASE64.encode(&tag),
            BASE64.encode(&ciphertext),
        );
        Ok(BASE64.encode(inner))
    }

    /// Decrypt a token produced by [`Self::encrypt`].
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let (nonce_bytes, tag, ciphertext) = parse_token(token)?;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CipherError::Decryption(format!("failed to create cipher: {e}")))?;

        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(nonce, sealed.as_ref())
            .map_err(|_| CipherError::Decryption("authentication tag mismatch".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CipherError::Decryption("plaintext is not valid UTF-8".to_string()))
    }

    /// Structural check: does `token` look like our cipher format?
    ///
    /// Used to keep credential ingestion idempotent: a token that already
    /// passes this check must never be encrypted a second time. Cheap, never
    /// panics, and does not attempt decryption.
    pub fn is_valid_token(token: &str) -> bool {
        parse_token(token).is_ok()
    }
}

/// Split a token into `(nonce, tag, ciphertext)`, validating component
/// count and byte lengths.
fn parse_token(token: &str) -> Result<([u8; NONCE_LEN], Vec<u8>, Vec<u8>), CipherError> {
    if token.is_empty() {
        return Err(CipherError::Malformed("empty token".to_string()));
    }

    let inner_bytes = BASE64
        .decode(token)
        .map_err(|_| CipherError::Malformed("outer encoding is not base64".to_string()))?;
    let inner = String::from_utf8(inner_bytes)
        .map_err(|_| CipherError::Malformed("token payload is not UTF-8".to_string()))?;

    let parts: Vec<&str> = inner.split(DELIMITER).collect();
    if parts.len() != 3 {
        return Err(CipherError::Malformed(format!(
            "expected 3 components, found {}",
            parts.len()
        )));
    }

    let nonce_bytes = BASE64
        .decode(parts[0])
        .map_err(|_| CipherError::Malformed("nonce is not base64".to_string()))?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(CipherError::Malformed(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce_bytes.len()
        )));
    }

    let tag = BASE64
        .decode(parts[1])
        .map_err(|_| CipherError::Malformed("tag is not base64".to_string()))?;
    if tag.len() != TAG_LEN {
        return Err(CipherError::Malformed(format!(
            "tag must be {TAG_LEN} bytes, got {}",
            tag.len()
        )));
    }

    let ciphertext = BASE64
        .decode(parts[2])
        .map_err(|_| CipherError::Malformed("ciphertext is not base64".to_string()))?;
    if ciphertext.is_empty() {
        return Err(CipherError::Malformed("empty ciphertext".to_string()));
    }

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_bytes);
    Ok((nonce, tag, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> CredentialCipher {
        CredentialCipher::new("test-encryption-secret")
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let c = cipher();
        let token = c.encrypt("privy-access-token-12345").unwrap();
        assert_ne!(token, "privy-access-token-12345");
        assert_eq!(c.decrypt(&token).unwrap(), "privy-access-token-12345");
    }

    #[test]
    fn repeated_encryption_uses_fresh_nonces() {
        let c = cipher();
        let a = c.encrypt("same-plaintext").unwrap();
        let b = c.encrypt("same-plaintext").unwrap();
        assert_ne!(a, b);
        assert_eq!(c.decrypt(&a).unwrap(), "same-plaintext");
        assert_eq!(c.decrypt(&b).unwrap(), "same-plaintext");
    }

    #[test]
    fn empty_plaintext_is_rejected() {
        assert!(matches!(
            cipher().encrypt(""),
            Err(CipherError::EmptyPlaintext)
        ));
    }

    #[test]
    fn structural_predicate_accepts_our_tokens_only() {
        let token = cipher().encrypt("secret").unwrap();
        assert!(CredentialCipher::is_valid_token(&token));

        assert!(!CredentialCipher::is_valid_token("plain-bearer-token-xyz"));
        assert!(!CredentialCipher::is_valid_token(""));
        assert!(!CredentialCipher::is_valid_token("not base64 at all!!!"));
        // Valid base64 but no delimited components inside.
        assert!(!CredentialCipher::is_valid_token(&BASE64.encode("hello")));
        // Right component count, wrong byte lengths.
        let inner = format!(
            "{}:{}:{}",
            BASE64.encode([0u8; 4]),
            BASE64.encode([0u8; 16]),
            BASE64.encode([1u8; 8])
        );
        assert!(!CredentialCipher::is_valid_token(&BASE64.encode(inner)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let c = cipher();
        let token = c.encrypt("secret-credential").unwrap();

        // Flip one byte of the ciphertext component and rebuild the token.
        let inner = String::from_utf8(BASE64.decode(&token).unwrap()).unwrap();
        let parts: Vec<&str> = inner.split(':').collect();
        let mut ct = BASE64.decode(parts[2]).unwrap();
        ct[0] ^= 0x01;
        let tampered_inner = format!("{}:{}:{}", parts[0], parts[1], BASE64.encode(&ct));
        let tampered = BASE64.encode(tampered_inner);

        assert!(matches!(
            c.decrypt(&tampered),
            Err(CipherError::Decryption(_))
        ));
    }

    #[test]
    fn decrypt_rejects_malformed_tokens() {
        let c = cipher();
        assert!(matches!(c.decrypt(""), Err(CipherError::Malformed(_))));
        assert!(matches!(
            c.decrypt("plain-token"),
            Err(CipherError::Malformed(_))
        ));
        assert!(matches!(
            c.decrypt(&BASE64.encode("a:b")),
            Err(CipherError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let token = CredentialCipher::new("secret-a").encrypt("data").unwrap();
        assert!(matches!(
            CredentialCipher::new("secret-b").decrypt(&token),
            Err(CipherError::Decryption(_))
        ));
    }
}
