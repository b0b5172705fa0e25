//! Property-based tests for address encryption and validation
//!
//! Tests for:
//! - Roundtrip: decrypt(encrypt(a)) == a for every valid address
//! - Tamper detection: any single flipped byte fails authentication
//! - Validator: accepts every well-formed address, rejects malformed octets

use super::address_codec::{AddressCodec, KEY_LEN};
use crate::error::AtndError;
use crate::registry::{is_valid_address, HardwareAddress};
use proptest::prelude::*;

/// Strategy producing `xx:xx:xx:xx:xx:xx` in mixed case
fn address_strategy() -> impl Strategy<Value = String> {
    (prop::array::uniform6(any::<u8>()), any::<bool>()).prop_map(|(octets, upper)| {
        let text = octets
            .iter()
            .map(|o| format!("{:02x}", o))
            .collect::<Vec<_>>()
            .join(":");
        if upper {
            text.to_ascii_uppercase()
        } else {
            text
        }
    })
}

proptest! {
    /// Property: Encryption roundtrip preserves the (normalized) address
    #[test]
    fn roundtrip_preserves_address(raw in address_strategy(), key_byte in any::<u8>()) {
        let codec = AddressCodec::from_key(&[key_byte; KEY_LEN]).unwrap();
        let address = HardwareAddress::parse(&raw).unwrap();

        let blob = codec.encrypt(&address).unwrap();
        let decrypted = codec.decrypt(&blob).unwrap();

        prop_assert_eq!(decrypted.expose(), raw.to_ascii_lowercase());
    }

    /// Property: Flipping any single byte of the blob fails authentication
    #[test]
    fn single_byte_flip_fails_authentication(
        raw in address_strategy(),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let codec = AddressCodec::from_key(&[42u8; KEY_LEN]).unwrap();
        let mut blob = codec.encrypt(&HardwareAddress::parse(&raw).unwrap()).unwrap();

        let i = index.index(blob.len());
        blob[i] ^= mask;

        prop_assert!(matches!(codec.decrypt(&blob), Err(AtndError::AuthenticationFailure)));
    }

    /// Property: Validator accepts every generated address
    #[test]
    fn validator_accepts_well_formed(raw in address_strategy()) {
        prop_assert!(is_valid_address(&raw));
    }

    /// Property: Replacing any hex digit with a non-hex character is rejected
    #[test]
    fn validator_rejects_non_hex_octet(
        raw in address_strategy(),
        octet in 0usize..6,
        digit in 0usize..2,
        bad in "[g-zG-Z_ !?.]",
    ) {
        let mut chars: Vec<char> = raw.chars().collect();
        chars[octet * 3 + digit] = bad.chars().next().unwrap();
        let mutated: String = chars.into_iter().collect();

        prop_assert!(!is_valid_address(&mutated));
    }
}
