//! Cryptographic primitives for addresses at rest
//!
//! This module implements:
//! - AES-256-GCM encryption of hardware addresses (address_codec)
//! - One-time generation of the local key file
pub mod address_codec;

#[cfg(test)]
mod proptests;

pub use address_codec::{generate_key, AddressCodec, KEY_LEN};
