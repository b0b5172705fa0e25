//! Member registry: validated addresses and the file-backed store

pub mod address;
pub mod store;

pub use address::{is_valid_address, HardwareAddress};
pub use store::{MemberRecord, RegistryStore};
