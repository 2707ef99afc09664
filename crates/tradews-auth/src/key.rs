//! Loading private key material.

use crate::error::{SignerError, SignerResult};
use crate::signer::Ed25519Signer;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use zeroize::Zeroizing;

/// Source of the PKCS#8 PEM private key.
///
/// Keys are loaded once at startup. Never log the loaded material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeySource {
    /// Load from environment variable (development).
    Env { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

impl KeySource {
    /// Read the PEM text. The buffer is wiped when dropped.
    pub fn read_pem(&self) -> SignerResult<Zeroizing<String>> {
        match self {
            Self::Env { var_name } => {
                let pem = std::env::var(var_name)
                    .map_err(|_| SignerError::EnvVarNotFound(var_name.clone()))?;
                debug!(var_name = %var_name, "Loaded private key from environment");
                Ok(Zeroizing::new(pem))
            }
            Self::File { path } => {
                let pem = std::fs::read_to_string(path)?;
                debug!(path = %path.display(), "Loaded private key from file");
                Ok(Zeroizing::new(pem))
            }
        }
    }

    /// Read and parse the key into a signer.
    pub fn load_signer(&self) -> SignerResult<Ed25519Signer> {
        let pem = self.read_pem()?;
        Ed25519Signer::from_pkcs8_pem(&pem)
    }
}
