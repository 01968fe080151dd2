//! Password encryption of whole backup archives.
//!
//! An artifact is the serialized [`EncryptedBackupHeader`] followed by the
//! cipher stream header and the ciphertext. The header carries everything
//! needed to re-derive the key except the password itself.

use crate::config::KdfParams;
use crate::crypto::{CryptoEngine, STREAM_HEADER_LEN};
use crate::error::{BackupError, Result};
use crate::header::{EncryptedBackupHeader, V1_HEADER_LEN};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub struct BackupEncryption<'a> {
    engine: &'a CryptoEngine,
    kdf: KdfParams,
}

impl<'a> BackupEncryption<'a> {
    /// `kdf` is the cost written into new artifacts. Decryption always uses
    /// the cost recorded in the artifact's own header.
    pub fn new(engine: &'a CryptoEngine, kdf: KdfParams) -> Self {
        Self { engine, kdf }
    }

    pub fn encrypt_bytes(&self, plaintext: &[u8], password: &str, user_id: &str) -> Result<Vec<u8>> {
        let KdfParams {
            ops_limit,
            mem_limit,
        } = self.kdf;
        let salt = self.engine.generate_salt();
        let identity_hash = self
            .engine
            .hash_identity(user_id, &salt, ops_limit, mem_limit)?;
        let header = EncryptedBackupHeader::new(salt, identity_hash, ops_limit, mem_limit);
        let key = self.engine.derive_key(password, &salt, ops_limit, mem_limit)?;
        let sealed = self.engine.encrypt_stream(plaintext, key.as_bytes())?;

        let mut artifact = header.serialize();
        artifact.extend_from_slice(&sealed);
        debug!(
            plaintext_bytes = plaintext.len(),
            artifact_bytes = artifact.len(),
            "payload encrypted"
        );
        Ok(artifact)
    }

    pub fn decrypt_bytes(
        &self,
        artifact: &[u8],
        password: &str,
        user_id: &str,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let (header, payload) = EncryptedBackupHeader::split(artifact)?;
        self.verify_identity(&header, user_id)?;

        if payload.len() < STREAM_HEADER_LEN {
            return Err(BackupError::InvalidHeaderLength {
                expected: STREAM_HEADER_LEN,
                actual: payload.len(),
            });
        }
        let key = self
            .engine
            .derive_key(password, &header.salt, header.ops_limit, header.mem_limit)?;
        let (stream_header, ciphertext) = payload.split_at(STREAM_HEADER_LEN);
        self.engine
            .decrypt_stream(stream_header, ciphertext, key.as_bytes())
    }

    fn verify_identity(&self, header: &EncryptedBackupHeader, user_id: &str) -> Result<()> {
        let expected =
            self.engine
                .hash_identity(user_id, &header.salt, header.ops_limit, header.mem_limit)?;
        if bool::from(expected[..].ct_eq(&header.identity_hash[..])) {
            Ok(())
        } else {
            warn!("backup identity hash does not match the current account");
            Err(BackupError::IdentityMismatch)
        }
    }

    /// Encrypt the file at `input` into a new artifact at `output`.
    pub fn encrypt_backup(
        &self,
        input: &Path,
        output: &Path,
        password: &str,
        user_id: &str,
    ) -> Result<PathBuf> {
        let plaintext = Zeroizing::new(fs::read(input)?);
        let artifact = self.encrypt_bytes(&plaintext, password, user_id)?;
        write_atomic(output, &artifact)?;
        info!(path = %output.display(), bytes = artifact.len(), "encrypted backup written");
        Ok(output.to_path_buf())
    }

    /// Decrypt the artifact at `input` into `output`. Nothing is written on failure.
    pub fn decrypt_backup(
        &self,
        input: &Path,
        output: &Path,
        password: &str,
        user_id: &str,
    ) -> Result<PathBuf> {
        let artifact = fs::read(input)?;
        let plaintext = self.decrypt_bytes(&artifact, password, user_id)?;
        write_atomic(output, &plaintext)?;
        info!(path = %output.display(), bytes = plaintext.len(), "backup decrypted");
        Ok(output.to_path_buf())
    }
}

/// Parse just the header of the artifact at `path`.
pub fn read_header(path: &Path) -> Result<EncryptedBackupHeader> {
    let mut head = Vec::with_capacity(V1_HEADER_LEN);
    File::open(path)?
        .take(V1_HEADER_LEN as u64)
        .read_to_end(&mut head)?;
    let (header, _) = EncryptedBackupHeader::split(&head)?;
    Ok(header)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
