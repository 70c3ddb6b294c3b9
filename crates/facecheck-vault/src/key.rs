//! Vault key material.
//!
//! Either derived from a passphrase or kept as 32 random bytes in a key file
//! that is created on first use.

use std::fmt;
use std::path::Path;

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const KEY_BYTES: usize = 32;

/// Prefix mixed into passphrase derivation so the same passphrase used
/// elsewhere does not yield the same key.
const PASSPHRASE_DOMAIN: &[u8] = b"facecheck-vault/v1\0";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write key file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("key file {path} must hold exactly 32 bytes, found {len}")]
    BadLength { path: String, len: usize },
    #[error("passphrase must not be empty")]
    EmptyPassphrase,
}

/// AES-256 key for the vault.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultKey([u8; KEY_BYTES]);

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// SHA-256 over a domain prefix and the passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, KeyError> {
        if passphrase.is_empty() {
            return Err(KeyError::EmptyPassphrase);
        }
        let mut hasher = Sha256::new();
        hasher.update(PASSPHRASE_DOMAIN);
        hasher.update(passphrase.as_bytes());
        let mut bytes = [0u8; KEY_BYTES];
        bytes.copy_from_slice(&hasher.finalize());
        Ok(Self(bytes))
    }

    /// Read the key file, or generate one (mode 0600) if it does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self, KeyError> {
        let display = path.display().to_string();
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let len = bytes.len();
                let bytes: [u8; KEY_BYTES] = bytes
                    .try_into()
                    .map_err(|_| KeyError::BadLength { path: display, len })?;
                tracing::debug!(path = %path.display(), "vault key loaded");
                Ok(Self(bytes))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let key = Self::generate();
                crate::write_private(path.to_path_buf(), key.0.to_vec())
                    .await
                    .map_err(|source| KeyError::Write {
                        path: display,
                        source,
                    })?;
                tracing::info!(path = %path.display(), "generated new vault key");
                Ok(key)
            }
            Err(source) => Err(KeyError::Read {
                path: display,
                source,
            }),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_passphrase_derivation_deterministic() {
        let a = VaultKey::from_passphrase("correct horse").unwrap();
        let b = VaultKey::from_passphrase("correct horse").unwrap();
        let c = VaultKey::from_passphrase("battery staple").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(matches!(
            VaultKey::from_passphrase(""),
            Err(KeyError::EmptyPassphrase)
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let key = VaultKey::generate();
        assert_eq!(format!("{key:?}"), "VaultKey(<redacted>)");
    }

    #[tokio::test]
    async fn test_load_or_create_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("vault.key");

        let first = VaultKey::load_or_create(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), KEY_BYTES);
        let second = VaultKey::load_or_create(&path).await.unwrap();
        assert_eq!(first, second);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_bad_key_file_length() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vault.key");
        std::fs::write(&path, b"short").unwrap();
        assert!(matches!(
            VaultKey::load_or_create(&path).await,
            Err(KeyError::BadLength { len: 5, .. })
        ));
    }
}
