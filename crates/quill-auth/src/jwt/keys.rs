//! RS256 key material.

use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};

use quill_core::error::{AppError, ErrorKind};
use quill_core::result::AppResult;

/// Reads and parses the PEM private key used for signing.
pub fn load_encoding_key(path: impl AsRef<Path>) -> AppResult<EncodingKey> {
    let pem = read_pem(path.as_ref(), "private")?;
    encoding_key_from_pem(&pem)
}

/// Reads and parses the PEM public key used for verification.
pub fn load_decoding_key(path: impl AsRef<Path>) -> AppResult<DecodingKey> {
    let pem = read_pem(path.as_ref(), "public")?;
    decoding_key_from_pem(&pem)
}

/// Parses a PEM RSA private key.
pub fn encoding_key_from_pem(pem: &[u8]) -> AppResult<EncodingKey> {
    EncodingKey::from_rsa_pem(pem).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid RSA private key: {e}"),
            e,
        )
    })
}

/// Parses a PEM RSA public key.
pub fn decoding_key_from_pem(pem: &[u8]) -> AppResult<DecodingKey> {
    DecodingKey::from_rsa_pem(pem).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid RSA public key: {e}"),
            e,
        )
    })
}

fn read_pem(path: &Path, which: &str) -> AppResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Cannot read {which} key at {}: {e}", path.display()),
            e,
        )
    })
}
