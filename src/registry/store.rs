//! Registry Store - persisted member name → encrypted address map
//!
//! The in-memory copy is the source of truth while the process runs; the
//! JSON file is rewritten in full (temp file + rename) on every mutation.
//!
//! ## File format
//!
//! ```text
//! {
//!   "members": [
//!     { "name": "alice", "encoded_address": "<base64 nonce‖ciphertext‖tag>" }
//!   ]
//! }
//! ```
//!
//! ## Locking
//!
//! One `RwLock`. Reads share it; mutations hold it exclusively across the
//! disk write so two mutations cannot interleave their files. A mutation is
//! applied to a copy, and the copy only replaces the live state once the write
//! has succeeded.

use super::address::HardwareAddress;
use crate::crypto::AddressCodec;
use crate::error::{AtndError, AtndResult};
use crate::storage::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// One registered member as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Display name (unique key)
    pub name: String,

    /// Encrypted Bluetooth address
    #[serde(with = "base64_bytes")]
    pub encoded_address: Vec<u8>,
}

/// Whole registry file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    members: Vec<MemberRecord>,
}

impl RegistryFile {
    fn position(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Names must be non-blank and unique; a hand-edited file may break either.
    fn check_names(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.members.len());
        for member in &self.members {
            if member.name.trim().is_empty() {
                return Err("registry contains a member with a blank name".to_string());
            }
            if !seen.insert(member.name.as_str()) {
                return Err(format!("registry lists member {:?} more than once", member.name));
            }
        }
        Ok(())
    }
}

/// File-backed member registry
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    codec: Arc<AddressCodec>,
    state: RwLock<RegistryFile>,
}

impl RegistryStore {
    /// Load the registry at `path`, creating an empty one if absent.
    pub fn load(path: impl Into<PathBuf>, codec: Arc<AddressCodec>) -> AtndResult<Self> {
        let path = path.into();

        let state = match fs::read(&path) {
            Ok(bytes) => {
                let state = serde_json::from_slice::<RegistryFile>(&bytes).map_err(|e| {
                    AtndError::persistence(&path, io::Error::new(io::ErrorKind::InvalidData, e))
                })?;
                state.check_names().map_err(|msg| {
                    AtndError::persistence(&path, io::Error::new(io::ErrorKind::InvalidData, msg))
                })?;
                state
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let empty = RegistryFile::default();
                persist(&path, &empty)?;
                info!(path = %path.display(), "created empty member registry");
                empty
            }
            Err(e) => return Err(AtndError::persistence(&path, e)),
        };

        debug!(
            path = %path.display(),
            members = state.members.len(),
            "member registry loaded"
        );

        Ok(Self {
            path,
            codec,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register `name` with `raw_address`, replacing any existing address.
    pub fn set_member(&self, name: &str, raw_address: &str) -> AtndResult<()> {
        if name.trim().is_empty() {
            return Err(AtndError::InvalidName(name.to_string()));
        }
        let address = HardwareAddress::parse(raw_address)?;
        let encoded_address = self.codec.encrypt(&address)?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = state.clone();
        let updated = match next.position(name) {
            Some(i) => {
                next.members[i].encoded_address = encoded_address;
                true
            }
            None => {
                next.members.push(MemberRecord {
                    name: name.to_string(),
                    encoded_address,
                });
                false
            }
        };

        persist(&self.path, &next)?;
        *state = next;

        info!(member = %name, updated, "member registered");
        Ok(())
    }

    /// Remove `name` from the registry.
    pub fn delete_member(&self, name: &str) -> AtndResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let index = state
            .position(name)
            .ok_or_else(|| AtndError::MemberNotFound(name.to_string()))?;

        let mut next = state.clone();
        next.members.remove(index);

        persist(&self.path, &next)?;
        *state = next;

        info!(member = %name, "member deleted");
        Ok(())
    }

    /// Snapshot of registered names.
    pub fn members(&self) -> Vec<String> {
        self.read().members.iter().map(|m| m.name.clone()).collect()
    }

    /// Encrypted address stored for `name`.
    pub fn find_encrypted_address(&self, name: &str) -> AtndResult<Vec<u8>> {
        self.read()
            .members
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.encoded_address.clone())
            .ok_or_else(|| AtndError::MemberNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryFile> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn persist(path: &Path, state: &RegistryFile) -> AtndResult<()> {
    let json = serde_json::to_vec_pretty(state)
        .map_err(|e| AtndError::persistence(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    write_atomic(path, &json)
}

/// Standard padded base64 for `Vec<u8>` fields
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
