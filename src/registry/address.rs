//! Bluetooth hardware address (BD_ADDR)
//!
//! A validated, lowercase `xx:xx:xx:xx:xx:xx` string. The type is a secret
//! at rest: `Debug` is redacted, there is no `Display`, and the buffer is
//! zeroized on drop. Use [`HardwareAddress::expose`] only where the raw text
//! must leave the process (the probe command line).

use crate::error::AtndError;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Length of `xx:xx:xx:xx:xx:xx`
const ADDRESS_LEN: usize = 17;

/// Validated hardware address
#[derive(Clone, PartialEq, Eq)]
pub struct HardwareAddress(Zeroizing<String>);

impl HardwareAddress {
    /// Parse and normalize `raw` (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self, AtndError> {
        if !is_valid_address(raw) {
            return Err(AtndError::InvalidAddress);
        }
        Ok(Self(Zeroizing::new(raw.to_ascii_lowercase())))
    }

    /// Raw address text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for HardwareAddress {
    type Err = AtndError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HardwareAddress(<redacted>)")
    }
}

/// Whether `addr` is six colon-separated two-digit hex octets.
pub fn is_valid_address(addr: &str) -> bool {
    let bytes = addr.as_bytes();
    if bytes.len() != ADDRESS_LEN {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| {
        if i % 3 == 2 {
            *b == b':'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}
