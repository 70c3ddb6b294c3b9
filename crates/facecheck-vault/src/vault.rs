//! Encrypted file-per-key store.
//!
//! Layout: `<dir>/<sha256(key) hex>.bin`, content `nonce(12) || ciphertext`.
//! The key name is bound as AES-GCM associated data, so a file renamed to
//! another key's slot fails to decrypt.

use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use facecheck_core::{SecureStore, StorageError};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::key::VaultKey;

const NONCE_LEN: usize = 12;
const ENTRY_EXT: &str = "bin";

/// [`SecureStore`] backed by AES-256-GCM encrypted files in one directory.
pub struct FileVault {
    dir: PathBuf,
    cipher: Aes256Gcm,
}

impl FileVault {
    pub fn new(dir: impl Into<PathBuf>, key: &VaultKey) -> Self {
        Self {
            dir: dir.into(),
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the value for `key`. Key names never appear on disk.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.dir.join(format!("{name}.{ENTRY_EXT}"))
    }

    fn seal(&self, key: &str, value: &str) -> Result<Vec<u8>, StorageError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: value.as_bytes(),
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| crypto_error(key, "encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, key: &str, sealed: &[u8]) -> Result<String, StorageError> {
        if sealed.len() < NONCE_LEN {
            return Err(crypto_error(key, "entry truncated"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| crypto_error(key, "decryption failed (wrong key or tampered entry)"))?;
        String::from_utf8(plaintext).map_err(|_| crypto_error(key, "entry is not valid UTF-8"))
    }
}

fn crypto_error(key: &str, message: &str) -> StorageError {
    StorageError::Crypto {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl SecureStore for FileVault {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key);
        let sealed = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(key)(err)),
        };
        tracing::debug!(key, path = %path.display(), "vault read");
        self.open(key, &sealed).map(Some)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        let sealed = self.seal(key, value)?;
        let bytes = sealed.len();

        crate::write_private(path.clone(), sealed)
            .await
            .map_err(io_error(key))?;

        tracing::debug!(key, path = %path.display(), bytes, "vault write");
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, path = %path.display(), "vault delete");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(key)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facecheck_core::{Embedding, TemplateStore};
    use tempfile::TempDir;

    fn vault(tmp: &TempDir) -> FileVault {
        FileVault::new(tmp.path().join("vault"), &VaultKey::from_passphrase("pw").unwrap())
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        assert_eq!(v.get_item("k").await.unwrap(), None);
        v.set_item("k", "[0.5,0.5]").await.unwrap();
        assert_eq!(v.get_item("k").await.unwrap().as_deref(), Some("[0.5,0.5]"));
        v.set_item("k", "[1.0]").await.unwrap();
        assert_eq!(v.get_item("k").await.unwrap().as_deref(), Some("[1.0]"));
    }

    #[tokio::test]
    async fn test_not_plaintext_on_disk() {
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        v.set_item("face_embedding", "[0.123456]").await.unwrap();

        let raw = std::fs::read(v.entry_path("face_embedding")).unwrap();
        let needle = b"0.123456";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));

        let names: Vec<String> = std::fs::read_dir(v.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].contains("face_embedding"));
        assert!(names[0].ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_wrong_key_is_crypto_error() {
        let tmp = TempDir::new().unwrap();
        vault(&tmp).set_item("k", "secret").await.unwrap();

        let other = FileVault::new(
            tmp.path().join("vault"),
            &VaultKey::from_passphrase("other").unwrap(),
        );
        assert!(matches!(
            other.get_item("k").await,
            Err(StorageError::Crypto { .. })
        ));
    }

    #[tokio::test]
    async fn test_swapped_entry_rejected() {
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        v.set_item("a", "alpha").await.unwrap();
        std::fs::copy(v.entry_path("a"), v.entry_path("b")).unwrap();
        assert!(matches!(v.get_item("b").await, Err(StorageError::Crypto { .. })));
    }

    #[tokio::test]
    async fn test_truncated_entry_rejected() {
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        std::fs::create_dir_all(v.dir()).unwrap();
        std::fs::write(v.entry_path("k"), [1u8, 2, 3]).unwrap();
        assert!(matches!(v.get_item("k").await, Err(StorageError::Crypto { .. })));
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        v.delete_item("k").await.unwrap();
        v.set_item("k", "x").await.unwrap();
        v.delete_item("k").await.unwrap();
        v.delete_item("k").await.unwrap();
        assert_eq!(v.get_item("k").await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_entry_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        v.set_item("k", "x").await.unwrap();
        let mode = std::fs::metadata(v.entry_path("k")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_same_key() {
        let tmp = TempDir::new().unwrap();
        let v = vault(&tmp);
        for round in 0..50 {
            let a = format!("[{round}.0]");
            let b = format!("[{round}.5]");
            let (ra, rb) = tokio::join!(v.set_item("k", &a), v.set_item("k", &b));
            ra.unwrap();
            rb.unwrap();
            let stored = v.get_item("k").await.unwrap().unwrap();
            assert!(stored == a || stored == b, "unexpected value {stored}");
        }

        let names: Vec<_> = std::fs::read_dir(v.dir()).unwrap().collect();
        assert_eq!(names.len(), 1, "temp files left behind");
    }

    #[tokio::test]
    async fn test_template_store_over_vault() {
        let tmp = TempDir::new().unwrap();
        let templates = TemplateStore::new(vault(&tmp));
        templates
            .save(&Embedding::new(vec![0.0, 2.0, 0.0]))
            .await
            .unwrap();

        let reopened = TemplateStore::new(vault(&tmp));
        let loaded = reopened.load().await.unwrap().unwrap();
        assert_eq!(loaded.as_slice(), &[0.0, 1.0, 0.0]);

        reopened.clear().await.unwrap();
        assert!(templates.load().await.unwrap().is_none());
    }
}
