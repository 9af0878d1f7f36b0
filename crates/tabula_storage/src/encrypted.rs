//! Encrypted file manager wrapper.
//!
//! Wraps any other [`FileManager`] with AES-256-GCM encryption at rest.
//!
//! ## Envelope
//!
//! ```text
//! | magic "TBEN" (4) | version (1) | nonce (12) | ciphertext || tag (16) |
//! ```
//!
//! The magic and version bytes are authenticated as associated data, so a
//! tampered header fails decryption just like a tampered body. A fresh
//! random nonce is drawn for every write.

use crate::error::{StorageError, StorageResult};
use crate::manager::FileManager;
use aes_gcm::aead::{generic_array::GenericArray, Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const MAGIC: &[u8; 4] = b"TBEN";
const VERSION: u8 = 1;
const HEADER_SIZE: usize = MAGIC.len() + 1;

/// Encryption key for table files.
///
/// The key is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::encryption(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives a key from a password using HKDF-SHA256.
    ///
    /// HKDF is not a password hash. Use it with high-entropy secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if key expansion fails.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> StorageResult<Self> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hk = Hkdf::<Sha256>::new(Some(salt), password);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(b"tabula-table-key-v1", &mut bytes)
            .map_err(|_| StorageError::encryption("HKDF expand failed"))?;
        Ok(Self { bytes })
    }

    /// Returns the raw key bytes.
    ///
    /// Don't log or persist the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A file manager that encrypts everything it hands to an inner manager.
///
/// An empty inner file reads as an empty table, so a missing file behaves
/// the same with and without encryption.
///
/// # Example
///
/// ```no_run
/// use tabula_storage::{DefaultFileManager, EncryptedFileManager, EncryptionKey, FileManager};
///
/// let key = EncryptionKey::generate();
/// let inner = DefaultFileManager::new("appdata/secret/Users.json");
/// let manager = EncryptedFileManager::new(Box::new(inner), &key);
/// manager.write(b"[]").unwrap();
/// ```
pub struct EncryptedFileManager {
    inner: Box<dyn FileManager>,
    cipher: Aes256Gcm,
}

impl EncryptedFileManager {
    /// Wraps `inner` with encryption under `key`.
    #[must_use]
    pub fn new(inner: Box<dyn FileManager>, key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { inner, cipher }
    }

    fn seal(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let mut header = [0u8; HEADER_SIZE];
        header[..MAGIC.len()].copy_from_slice(MAGIC);
        header[MAGIC.len()] = VERSION;

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: &header,
                },
            )
            .map_err(|_| StorageError::encryption("encryption error"))?;

        let mut blob = Vec::with_capacity(HEADER_SIZE + NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&header);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend(ciphertext);
        Ok(blob)
    }

    fn open(&self, blob: &[u8]) -> StorageResult<Vec<u8>> {
        if blob.len() < HEADER_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(StorageError::corrupted("encrypted table file too short"));
        }
        if &blob[..MAGIC.len()] != MAGIC {
            return Err(StorageError::corrupted("not an encrypted table file"));
        }
        let version = blob[MAGIC.len()];
        if version != VERSION {
            return Err(StorageError::corrupted(format!(
                "unsupported encryption envelope version {version}"
            )));
        }

        let (header, rest) = blob.split_at(HEADER_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| StorageError::encryption("decryption failed: wrong key or tampered file"))
    }
}

impl std::fmt::Debug for EncryptedFileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileManager")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl FileManager for EncryptedFileManager {
    fn read(&self) -> StorageResult<Vec<u8>> {
        let blob = self.inner.read()?;
        if blob.is_empty() {
            return Ok(blob);
        }
        self.open(&blob)
    }

    fn write(&self, data: &[u8]) -> StorageResult<()> {
        let blob = self.seal(data)?;
        self.inner.write(&blob)
    }

    fn exists(&self) -> StorageResult<bool> {
        self.inner.exists()
    }

    fn clear(&self) -> StorageResult<bool> {
        self.inner.clear()
    }

    fn path(&self) -> &Path {
        self.inner.path()
    }
}
