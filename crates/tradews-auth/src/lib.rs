//! Request signing for the tradews trading client.
//!
//! - `canonical_query`: deterministic `key=value&...` string over sorted keys
//! - `Ed25519Signer`: signs canonical strings with a PKCS#8 PEM private key,
//!   producing base64 signatures for the session logon
//! - `KeySource`: where the PEM key material is loaded from

pub mod error;
pub mod key;
pub mod signer;

pub use error::{SignerError, SignerResult};
pub use key::KeySource;
pub use signer::{canonical_query, Ed25519Signer};
