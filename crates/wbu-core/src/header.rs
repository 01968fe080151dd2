//! Fixed-length header prefixed to every encrypted backup artifact.
//!
//! Layout (big-endian integers):
//!
//! ```text
//! magic (4) | reserved (1) | version (2) | salt (16) | identity hash (32)
//!           | ops limit (4) | mem limit (4) | [nonce (24), version 1 only]
//! ```

use crate::error::{BackupError, Result};
use serde::Serialize;

pub const BACKUP_MAGIC: &[u8; 4] = b"WBUA";
pub const CURRENT_VERSION: u16 = 2;
pub const SALT_LEN: usize = 16;
pub const IDENTITY_HASH_LEN: usize = 32;
pub const LEGACY_NONCE_LEN: usize = 24;

const MAGIC_END: usize = 4;
const VERSION_START: usize = MAGIC_END + 1;
const SALT_START: usize = VERSION_START + 2;
const HASH_START: usize = SALT_START + SALT_LEN;
const OPS_START: usize = HASH_START + IDENTITY_HASH_LEN;
const MEM_START: usize = OPS_START + 4;
const NONCE_START: usize = MEM_START + 4;

pub const V2_HEADER_LEN: usize = NONCE_START;
pub const V1_HEADER_LEN: usize = NONCE_START + LEGACY_NONCE_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "version")]
pub enum HeaderVersion {
    /// Legacy layout. The nonce is carried but the stream header supersedes it.
    V1 {
        #[serde(serialize_with = "hex_bytes")]
        nonce: [u8; LEGACY_NONCE_LEN],
    },
    V2,
}

impl HeaderVersion {
    pub fn tag(&self) -> u16 {
        match self {
            HeaderVersion::V1 { .. } => 1,
            HeaderVersion::V2 => 2,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            HeaderVersion::V1 { .. } => V1_HEADER_LEN,
            HeaderVersion::V2 => V2_HEADER_LEN,
        }
    }

    fn len_for_tag(tag: u16) -> Option<usize> {
        match tag {
            1 => Some(V1_HEADER_LEN),
            2 => Some(V2_HEADER_LEN),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedBackupHeader {
    #[serde(flatten)]
    pub version: HeaderVersion,
    #[serde(serialize_with = "hex_bytes")]
    pub salt: [u8; SALT_LEN],
    #[serde(serialize_with = "hex_bytes")]
    pub identity_hash: [u8; IDENTITY_HASH_LEN],
    pub ops_limit: u32,
    pub mem_limit: u32,
}

impl EncryptedBackupHeader {
    /// A header in the current layout.
    pub fn new(
        salt: [u8; SALT_LEN],
        identity_hash: [u8; IDENTITY_HASH_LEN],
        ops_limit: u32,
        mem_limit: u32,
    ) -> Self {
        Self {
            version: HeaderVersion::V2,
            salt,
            identity_hash,
            ops_limit,
            mem_limit,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.version.encoded_len()];
        buf[..MAGIC_END].copy_from_slice(BACKUP_MAGIC);
        // buf[MAGIC_END] is reserved and stays zero
        buf[VERSION_START..SALT_START].copy_from_slice(&self.version.tag().to_be_bytes());
        buf[SALT_START..HASH_START].copy_from_slice(&self.salt);
        buf[HASH_START..OPS_START].copy_from_slice(&self.identity_hash);
        buf[OPS_START..MEM_START].copy_from_slice(&self.ops_limit.to_be_bytes());
        buf[MEM_START..NONCE_START].copy_from_slice(&self.mem_limit.to_be_bytes());
        if let HeaderVersion::V1 { nonce } = &self.version {
            buf[NONCE_START..V1_HEADER_LEN].copy_from_slice(nonce);
        }
        buf
    }

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < SALT_START {
            return Err(unreadable(format!("header too short ({} bytes)", buf.len())));
        }
        if &buf[..MAGIC_END] != BACKUP_MAGIC {
            return Err(unreadable("invalid magic number"));
        }
        let tag = u16::from_be_bytes(array(&buf[VERSION_START..SALT_START])?);
        let expected = HeaderVersion::len_for_tag(tag)
            .ok_or_else(|| unreadable(format!("unsupported header version {tag}")))?;
        if buf.len() != expected {
            return Err(unreadable(format!(
                "header length {} does not match version {tag} ({expected})",
                buf.len()
            )));
        }

        let version = match tag {
            1 => HeaderVersion::V1 {
                nonce: array(&buf[NONCE_START..V1_HEADER_LEN])?,
            },
            _ => HeaderVersion::V2,
        };
        Ok(Self {
            version,
            salt: array(&buf[SALT_START..HASH_START])?,
            identity_hash: array(&buf[HASH_START..OPS_START])?,
            ops_limit: u32::from_be_bytes(array(&buf[OPS_START..MEM_START])?),
            mem_limit: u32::from_be_bytes(array(&buf[MEM_START..NONCE_START])?),
        })
    }

    /// Parse the header at the start of an artifact and return the payload behind it.
    pub fn split(artifact: &[u8]) -> Result<(Self, &[u8])> {
        if artifact.len() < SALT_START {
            return Err(unreadable("artifact too short to hold a header"));
        }
        let tag = u16::from_be_bytes(array(&artifact[VERSION_START..SALT_START])?);
        let len = HeaderVersion::len_for_tag(tag)
            .ok_or_else(|| unreadable(format!("unsupported header version {tag}")))?;
        if artifact.len() < len {
            return Err(unreadable("artifact truncated inside the header"));
        }
        let (head, payload) = artifact.split_at(len);
        Ok((Self::parse(head)?, payload))
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| unreadable("header field has wrong width"))
}

fn unreadable(reason: impl Into<String>) -> BackupError {
    BackupError::UnreadableMetadata(reason.into())
}

fn hex_bytes<S: serde::Serializer>(bytes: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}
