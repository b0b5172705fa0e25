//! Address Codec - hardware addresses encrypted at rest
//!
//! AES-256-GCM with a 32-byte key generated once and kept next to the
//! registry. Every call to [`AddressCodec::encrypt`] draws a fresh random
//! 96-bit nonce; the stored blob is
//!
//! ```text
//! nonce (12 bytes) ‖ ciphertext ‖ GCM tag (16 bytes)
//! ```
//!
//! There is no key rotation: replacing the key file invalidates every stored
//! address, which then fails with `AuthenticationFailure` on decrypt.

use crate::error::{AtndError, AtndResult};
use crate::registry::HardwareAddress;
use crate::storage::write_new_secret;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;
use zeroize::Zeroizing;

/// Key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Authenticated cipher for stored addresses
pub struct AddressCodec {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for AddressCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressCodec").finish_non_exhaustive()
    }
}

impl AddressCodec {
    /// Build a codec from raw key bytes.
    pub fn from_key(key: &[u8; KEY_LEN]) -> AtndResult<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|e| AtndError::Crypto(format!("Key creation failed: {}", e)))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Load the key at `path`, generating and persisting a new one if absent.
    ///
    /// The key file is created owner-only and never overwritten.
    pub fn load_or_create(path: &Path) -> AtndResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let key = generate_key()?;
                write_new_secret(path, &key[..])?;
                info!(path = %path.display(), "generated new address encryption key");
                Zeroizing::new(key.to_vec())
            }
            Err(e) => return Err(AtndError::persistence(path, e)),
        };

        let key: Zeroizing<[u8; KEY_LEN]> =
            Zeroizing::new(bytes.as_slice().try_into().map_err(|_| {
                AtndError::persistence(
                    path,
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("key file must be exactly {} bytes, found {}", KEY_LEN, bytes.len()),
                    ),
                )
            })?);

        Self::from_key(&key)
    }

    /// Encrypt `address` under a fresh nonce.
    pub fn encrypt(&self, address: &HardwareAddress) -> AtndResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AtndError::Crypto("RNG failure".to_string()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = address.expose().as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|e| AtndError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(blob)
    }

    /// Authenticate and decrypt a blob produced by [`AddressCodec::encrypt`].
    pub fn decrypt(&self, blob: &[u8]) -> AtndResult<HardwareAddress> {
        if blob.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AtndError::AuthenticationFailure);
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AtndError::AuthenticationFailure)?;

        let mut in_out = Zeroizing::new(ciphertext.to_vec());
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), in_out.as_mut_slice())
            .map_err(|_| AtndError::AuthenticationFailure)?;

        // Authentic but not an address: data we did not write
        let text = std::str::from_utf8(plaintext).map_err(|_| AtndError::AuthenticationFailure)?;
        HardwareAddress::parse(text).map_err(|_| AtndError::AuthenticationFailure)
    }
}

/// Generate a fresh random key.
pub fn generate_key() -> AtndResult<Zeroizing<[u8; KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    SystemRandom::new()
        .fill(&mut key[..])
        .map_err(|_| AtndError::Crypto("RNG failure".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OWNER_ONLY;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn test_codec() -> AddressCodec {
        AddressCodec::from_key(&[42u8; KEY_LEN]).unwrap()
    }

    fn addr(s: &str) -> HardwareAddress {
        HardwareAddress::parse(s).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let codec = test_codec();
        let blob = codec.encrypt(&addr("01:23:45:67:89:ab")).unwrap();

        assert_eq!(blob.len(), NONCE_LEN + 17 + AES_256_GCM.tag_len());
        assert_eq!(codec.decrypt(&blob).unwrap().expose(), "01:23:45:67:89:ab");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let codec = test_codec();
        let a = addr("01:23:45:67:89:ab");

        let blob1 = codec.encrypt(&a).unwrap();
        let blob2 = codec.encrypt(&a).unwrap();

        assert_ne!(blob1[..NONCE_LEN], blob2[..NONCE_LEN]);
        assert_ne!(blob1, blob2);
        assert_eq!(codec.decrypt(&blob1).unwrap(), codec.decrypt(&blob2).unwrap());
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let blob = test_codec().encrypt(&addr("01:23:45:67:89:ab")).unwrap();
        let other = AddressCodec::from_key(&[99u8; KEY_LEN]).unwrap();

        assert!(matches!(
            other.decrypt(&blob),
            Err(AtndError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_decrypt_truncated() {
        let codec = test_codec();
        let blob = codec.encrypt(&addr("01:23:45:67:89:ab")).unwrap();

        for len in [0, 5, NONCE_LEN, NONCE_LEN + 10, blob.len() - 1] {
            assert!(
                matches!(codec.decrypt(&blob[..len]), Err(AtndError::AuthenticationFailure)),
                "truncated to {} bytes",
                len
            );
        }
    }

    #[test]
    fn test_decrypt_authentic_non_address_rejected() {
        let codec = test_codec();

        // Seal arbitrary bytes with the same key, bypassing address validation
        let nonce_bytes = [7u8; NONCE_LEN];
        let mut in_out = b"not an address".to_vec();
        codec
            .key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .unwrap();
        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&in_out);

        assert!(matches!(
            codec.decrypt(&blob),
            Err(AtndError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_load_or_create_generates_then_reuses_key() {
        let temp_dir = TempDir::new().unwrap();
        let key_path = temp_dir.path().join(".atnd_key");

        let first = AddressCodec::load_or_create(&key_path).unwrap();
        let stored = fs::read(&key_path).unwrap();
        assert_eq!(stored.len(), KEY_LEN);

        let mode = fs::metadata(&key_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, OWNER_ONLY);

        let blob = first.encrypt(&addr("01:23:45:67:89:ab")).unwrap();

        let second = AddressCodec::load_or_create(&key_path).unwrap();
        assert_eq!(fs::read(&key_path).unwrap(), stored);
        assert_eq!(second.decrypt(&blob).unwrap().expose(), "01:23:45:67:89:ab");
    }

    #[test]
    fn test_load_rejects_wrong_length_key() {
        let temp_dir = TempDir::new().unwrap();
        let key_path = temp_dir.path().join(".atnd_key");
        fs::write(&key_path, [1u8; 16]).unwrap();

        match AddressCodec::load_or_create(&key_path) {
            Err(AtndError::Persistence { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData)
            }
            other => panic!("expected persistence error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_generated_keys_differ() {
        let k1 = generate_key().unwrap();
        let k2 = generate_key().unwrap();
        assert_ne!(*k1, *k2);
        assert_ne!(*k1, [0u8; KEY_LEN]);
    }
}
