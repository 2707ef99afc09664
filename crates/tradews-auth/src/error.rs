//! Signing error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    /// The key material is not a parseable PKCS#8 PEM private key.
    #[error("Malformed private key: {0}")]
    MalformedKey(String),

    /// The key parsed but is not an Ed25519 key.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SignerResult<T> = Result<T, SignerError>;
