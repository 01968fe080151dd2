//! Password key derivation and the streaming cipher used for backup payloads.
//!
//! KDF: Argon2id v1.3, parallelism 1, cost taken from the backup header
//! (`m_cost = mem_limit / 1024` KiB, as libsodium's `crypto_pwhash`).
//! Cipher: libsodium `crypto_secretstream_xchacha20poly1305`. The whole
//! payload is pushed as one chunk tagged `TAG_FINAL`.
//!
//! Stream wire format:
//!   [ stream header (24 bytes) | tag byte + ciphertext + MAC (17 bytes overhead) ]

use crate::config::KdfParams;
use crate::error::{BackupError, Result};
use crate::header::{IDENTITY_HASH_LEN, SALT_LEN};
use argon2::{Algorithm, Argon2, Params, Version};
use libsodium_sys as sodium;
use rand::rngs::OsRng;
use rand::RngCore;
use std::mem::MaybeUninit;
use std::os::raw::c_ulonglong;
use std::ptr;
use std::sync::Once;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const KEY_LEN: usize = 32;
pub const STREAM_HEADER_LEN: usize =
    sodium::crypto_secretstream_xchacha20poly1305_HEADERBYTES as usize;
/// Per-chunk overhead: encrypted tag byte plus the 16-byte MAC.
pub const STREAM_ABYTES: usize = sodium::crypto_secretstream_xchacha20poly1305_ABYTES as usize;

const TAG_FINAL: u8 = sodium::crypto_secretstream_xchacha20poly1305_TAG_FINAL as u8;

/// Upper bound accepted for a header's memory cost (1 GiB).
pub const MAX_MEM_LIMIT: u32 = 1 << 30;
pub const MAX_OPS_LIMIT: u32 = 64;

const SELF_TEST_PARAMS: KdfParams = KdfParams {
    ops_limit: 1,
    mem_limit: 8 * 1024,
};

static RNG_FALLBACK_WARNING: Once = Once::new();

/// 32-byte backup key derived from the user password. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct BackupKey([u8; KEY_LEN]);

impl BackupKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BackupKey(..)")
    }
}

/// Handle proving the crypto backend passed its start-up self-test.
///
/// Obtain one with [`CryptoEngine::init`] and pass it to whatever needs to
/// derive keys or encrypt.
#[derive(Debug, Clone)]
pub struct CryptoEngine {
    _loaded: (),
}

impl CryptoEngine {
    pub fn init() -> Result<Self> {
        // SAFETY: sodium_init is thread-safe and idempotent.
        if unsafe { sodium::sodium_init() } < 0 {
            return Err(BackupError::NativeLibraryUnavailable(
                "sodium_init failed".to_string(),
            ));
        }
        let engine = Self { _loaded: () };
        engine
            .self_test()
            .map_err(|e| BackupError::NativeLibraryUnavailable(e.to_string()))?;
        debug!("crypto engine self-test passed");
        Ok(engine)
    }

    fn self_test(&self) -> Result<()> {
        let salt = [0x5Au8; SALT_LEN];
        let key = self.derive_key(
            "self-test",
            &salt,
            SELF_TEST_PARAMS.ops_limit,
            SELF_TEST_PARAMS.mem_limit,
        )?;
        let sealed = self.encrypt_stream(b"self-test", key.as_bytes())?;
        let (stream_header, ciphertext) = sealed.split_at(STREAM_HEADER_LEN);
        let opened = self.decrypt_stream(stream_header, ciphertext, key.as_bytes())?;
        if opened.as_slice() != b"self-test" {
            return Err(BackupError::DecryptionFailed);
        }
        Ok(())
    }

    pub fn derive_key(
        &self,
        password: &str,
        salt: &[u8; SALT_LEN],
        ops_limit: u32,
        mem_limit: u32,
    ) -> Result<BackupKey> {
        let mut output = [0u8; KEY_LEN];
        argon2id(ops_limit, mem_limit)?
            .hash_password_into(password.as_bytes(), salt, &mut output)
            .map_err(|e| BackupError::KeyDerivationFailed(e.to_string()))?;
        Ok(BackupKey(output))
    }

    /// Salted hash of the account identifier stored in the backup header.
    pub fn hash_identity(
        &self,
        user_id: &str,
        salt: &[u8; SALT_LEN],
        ops_limit: u32,
        mem_limit: u32,
    ) -> Result<[u8; IDENTITY_HASH_LEN]> {
        let mut output = [0u8; IDENTITY_HASH_LEN];
        argon2id(ops_limit, mem_limit)?
            .hash_password_into(user_id.as_bytes(), salt, &mut output)
            .map_err(|e| BackupError::KeyDerivationFailed(e.to_string()))?;
        Ok(output)
    }

    pub fn generate_salt(&self) -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        fill_random(&mut OsRng, &mut salt);
        salt
    }

    pub fn encrypt_stream(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        seal(plaintext, key, TAG_FINAL)
    }

    pub fn decrypt_stream(
        &self,
        stream_header: &[u8],
        ciphertext: &[u8],
        key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        if stream_header.len() != STREAM_HEADER_LEN {
            return Err(BackupError::InvalidHeaderLength {
                expected: STREAM_HEADER_LEN,
                actual: stream_header.len(),
            });
        }
        check_key(key)?;
        if ciphertext.len() < STREAM_ABYTES {
            return Err(BackupError::DecryptionFailed);
        }

        let mut state = MaybeUninit::<sodium::crypto_secretstream_xchacha20poly1305_state>::uninit();
        // SAFETY: header is HEADERBYTES long and key is KEYBYTES long (checked above).
        let rc = unsafe {
            sodium::crypto_secretstream_xchacha20poly1305_init_pull(
                state.as_mut_ptr(),
                stream_header.as_ptr(),
                key.as_ptr(),
            )
        };
        if rc != 0 {
            return Err(BackupError::DecryptionFailed);
        }
        // SAFETY: init_pull returned 0 and filled the state.
        let mut state = StreamState(unsafe { state.assume_init() });

        let mut plaintext = Zeroizing::new(vec![0u8; ciphertext.len() - STREAM_ABYTES]);
        let mut written: c_ulonglong = 0;
        let mut tag: u8 = 0;
        // SAFETY: the output buffer holds clen - ABYTES bytes, the most pull writes.
        let rc = unsafe {
            sodium::crypto_secretstream_xchacha20poly1305_pull(
                &mut state.0,
                plaintext.as_mut_ptr(),
                &mut written,
                &mut tag,
                ciphertext.as_ptr(),
                ciphertext.len() as c_ulonglong,
                ptr::null(),
                0,
            )
        };
        if rc != 0 || tag != TAG_FINAL {
            return Err(BackupError::DecryptionFailed);
        }
        plaintext.truncate(written as usize);
        Ok(plaintext)
    }
}

/// libsodium stream state, wiped on drop.
struct StreamState(sodium::crypto_secretstream_xchacha20poly1305_state);

impl Drop for StreamState {
    fn drop(&mut self) {
        self.0.k.zeroize();
        self.0.nonce.zeroize();
    }
}

/// Push `plaintext` as the single chunk of a new stream, tagged `tag`.
fn seal(plaintext: &[u8], key: &[u8], tag: u8) -> Result<Vec<u8>> {
    check_key(key)?;
    let mut out = vec![0u8; STREAM_HEADER_LEN + plaintext.len() + STREAM_ABYTES];

    let mut state = MaybeUninit::<sodium::crypto_secretstream_xchacha20poly1305_state>::uninit();
    // SAFETY: out starts with HEADERBYTES writable bytes and key is KEYBYTES long.
    let rc = unsafe {
        sodium::crypto_secretstream_xchacha20poly1305_init_push(
            state.as_mut_ptr(),
            out.as_mut_ptr(),
            key.as_ptr(),
        )
    };
    if rc != 0 {
        return Err(BackupError::EncryptionInitialisationFailed);
    }
    // SAFETY: init_push returned 0 and filled the state.
    let mut state = StreamState(unsafe { state.assume_init() });

    let mut written: c_ulonglong = 0;
    let body = &mut out[STREAM_HEADER_LEN..];
    // SAFETY: body holds mlen + ABYTES bytes, exactly what push writes.
    let rc = unsafe {
        sodium::crypto_secretstream_xchacha20poly1305_push(
            &mut state.0,
            body.as_mut_ptr(),
            &mut written,
            plaintext.as_ptr(),
            plaintext.len() as c_ulonglong,
            ptr::null(),
            0,
            tag,
        )
    };
    if rc != 0 || written as usize != plaintext.len() + STREAM_ABYTES {
        return Err(BackupError::EncryptionFailed);
    }
    Ok(out)
}

fn argon2id(ops_limit: u32, mem_limit: u32) -> Result<Argon2<'static>> {
    if ops_limit > MAX_OPS_LIMIT || mem_limit > MAX_MEM_LIMIT {
        return Err(BackupError::KeyDerivationFailed(format!(
            "cost out of range (ops {ops_limit}, mem {mem_limit})"
        )));
    }
    let params = Params::new(mem_limit / 1024, ops_limit, 1, Some(KEY_LEN))
        .map_err(|e| BackupError::KeyDerivationFailed(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(BackupError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    Ok(())
}

/// Fill `out` from `primary`, falling back to the thread-local CSPRNG when it fails.
fn fill_random<R: RngCore>(primary: &mut R, out: &mut [u8]) {
    if let Err(e) = primary.try_fill_bytes(out) {
        RNG_FALLBACK_WARNING.call_once(|| {
            warn!(error = %e, "primary RNG unavailable, falling back to thread RNG");
        });
        rand::thread_rng().fill_bytes(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams {
        ops_limit: 1,
        mem_limit: 64 * 1024,
    };

    fn engine() -> CryptoEngine {
        CryptoEngine::init().unwrap()
    }

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!()
        }
        fn next_u64(&mut self) -> u64 {
            unreachable!()
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!()
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no entropy",
            )))
        }
    }

    #[test]
    fn derive_key_is_deterministic() {
        let engine = engine();
        let salt = [1u8; SALT_LEN];
        let a = engine.derive_key("hunter2", &salt, FAST.ops_limit, FAST.mem_limit).unwrap();
        let b = engine.derive_key("hunter2", &salt, FAST.ops_limit, FAST.mem_limit).unwrap();
        let c = engine.derive_key("hunter3", &salt, FAST.ops_limit, FAST.mem_limit).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
        assert_eq!(a.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn derive_key_depends_on_salt() {
        let engine = engine();
        let a = engine.derive_key("pw", &[1u8; SALT_LEN], 1, 64 * 1024).unwrap();
        let b = engine.derive_key("pw", &[2u8; SALT_LEN], 1, 64 * 1024).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn derive_key_rejects_bad_cost() {
        let engine = engine();
        let salt = [1u8; SALT_LEN];
        assert!(matches!(
            engine.derive_key("pw", &salt, 0, 64 * 1024),
            Err(BackupError::KeyDerivationFailed(_))
        ));
        assert!(matches!(
            engine.derive_key("pw", &salt, 1, 1024),
            Err(BackupError::KeyDerivationFailed(_))
        ));
        assert!(matches!(
            engine.derive_key("pw", &salt, 1, u32::MAX),
            Err(BackupError::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn identity_hash_differs_from_key() {
        let engine = engine();
        let salt = [3u8; SALT_LEN];
        let hash = engine.hash_identity("alice", &salt, 1, 64 * 1024).unwrap();
        let other = engine.hash_identity("bob", &salt, 1, 64 * 1024).unwrap();
        assert_ne!(hash, other);
    }

    #[test]
    fn stream_roundtrip() {
        let engine = engine();
        let key = engine.derive_key("pw", &[4u8; SALT_LEN], 1, 64 * 1024).unwrap();
        let large = vec![0xEEu8; 100_000];
        for plaintext in [&b""[..], &b"x"[..], large.as_slice()] {
            let sealed = engine.encrypt_stream(plaintext, key.as_bytes()).unwrap();
            assert_eq!(sealed.len(), STREAM_HEADER_LEN + plaintext.len() + STREAM_ABYTES);
            let (header, ct) = sealed.split_at(STREAM_HEADER_LEN);
            let opened = engine.decrypt_stream(header, ct, key.as_bytes()).unwrap();
            assert_eq!(opened.as_slice(), plaintext);
        }
    }

    #[test]
    fn fresh_stream_header_per_encryption() {
        let engine = engine();
        let key = [9u8; KEY_LEN];
        let a = engine.encrypt_stream(b"same", &key).unwrap();
        let b = engine.encrypt_stream(b"same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_password_fails_decryption() {
        let engine = engine();
        let salt = [5u8; SALT_LEN];
        let key = engine.derive_key("right", &salt, 1, 64 * 1024).unwrap();
        let wrong = engine.derive_key("wrong", &salt, 1, 64 * 1024).unwrap();
        let sealed = engine.encrypt_stream(b"secret messages", key.as_bytes()).unwrap();
        let (header, ct) = sealed.split_at(STREAM_HEADER_LEN);
        assert!(matches!(
            engine.decrypt_stream(header, ct, wrong.as_bytes()),
            Err(BackupError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampering_is_detected() {
        let engine = engine();
        let key = [2u8; KEY_LEN];
        let mut sealed = engine.encrypt_stream(b"payload", &key).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        let (header, ct) = sealed.split_at(STREAM_HEADER_LEN);
        assert!(matches!(
            engine.decrypt_stream(header, ct, &key),
            Err(BackupError::DecryptionFailed)
        ));
        assert!(matches!(
            engine.decrypt_stream(header, &ct[..4], &key),
            Err(BackupError::DecryptionFailed)
        ));
    }

    #[test]
    fn length_checks() {
        let engine = engine();
        assert!(matches!(
            engine.encrypt_stream(b"x", &[0u8; 16]),
            Err(BackupError::InvalidKeyLength { expected: 32, actual: 16 })
        ));
        assert!(matches!(
            engine.decrypt_stream(&[0u8; 19], &[0u8; 32], &[0u8; KEY_LEN]),
            Err(BackupError::InvalidHeaderLength { expected: 24, actual: 19 })
        ));
        assert!(matches!(
            engine.decrypt_stream(&[0u8; STREAM_HEADER_LEN], &[0u8; 32], &[0u8; 31]),
            Err(BackupError::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn non_final_chunk_is_rejected() {
        let engine = engine();
        let key = [7u8; KEY_LEN];
        let sealed = seal(b"partial", &key, 0).unwrap();
        let (header, ct) = sealed.split_at(STREAM_HEADER_LEN);
        assert!(matches!(
            engine.decrypt_stream(header, ct, &key),
            Err(BackupError::DecryptionFailed)
        ));
    }

    #[test]
    fn decrypts_libsodium_stream() {
        let engine = engine();
        let key: Vec<u8> = (0u8..32).collect();
        let header = hex::decode("a80719290365f90e754ae8150ea7097bd622d3bd6df296a8").unwrap();
        let ct = hex::decode(
            "3496b4b5e599e8b0e977e2542904196e7628c2fce89fa031f2c451ccee9e5e0faa020c43b4f95555de",
        )
        .unwrap();
        let opened = engine.decrypt_stream(&header, &ct, &key).unwrap();
        assert_eq!(opened.as_slice(), b"wire backup known answer");
    }

    #[test]
    fn kdf_matches_libsodium_pwhash() {
        let engine = engine();
        let salt = [0x42u8; SALT_LEN];
        let identity = engine.hash_identity("alice", &salt, 1, 64 * 1024).unwrap();
        assert_eq!(
            hex::encode(identity),
            "dd48d8395d06eea304dcd6a7d109fbebfe5cea0167e19a9c0bfd9bce5ec1a27e"
        );
        let key = engine.derive_key("hunter2", &salt, 1, 64 * 1024).unwrap();
        assert_eq!(
            hex::encode(key.as_bytes()),
            "0dc5eb9aa17ebf89ce07852becd97217c5f8adc99df024894bdf920af76200a2"
        );
    }

    #[test]
    fn salt_falls_back_when_primary_rng_fails() {
        let mut salt = [0u8; SALT_LEN];
        fill_random(&mut BrokenRng, &mut salt);
        assert_ne!(salt, [0u8; SALT_LEN]);
    }

    #[test]
    fn salts_are_random() {
        let engine = engine();
        assert_ne!(engine.generate_salt(), engine.generate_salt());
    }
}
