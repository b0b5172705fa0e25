//! Status Cache - in-memory "last seen" per member
//!
//! Not persisted: after a restart every member starts without a `last_seen`
//! until probed present again. Guarded by its own lock, independent of the
//! registry's.

use super::Attendance;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

/// Last positive observation per tracked member
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: RwLock<HashMap<String, Option<SystemTime>>>,
}

impl StatusCache {
    /// Cache tracking `names`, none of them seen yet.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names.into_iter().map(|n| (n.into(), None)).collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Start tracking `name`; an existing observation is kept.
    pub fn track(&self, name: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(None);
    }

    /// Stop tracking `name`.
    pub fn remove(&self, name: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Record that `name` was present at `seen_at`.
    ///
    /// Untracked names are ignored, so a probe that finishes after its member
    /// was deleted does not bring the entry back. Returns whether an entry was
    /// updated.
    pub fn update(&self, name: &str, seen_at: SystemTime) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(name) {
            Some(slot) => {
                *slot = Some(seen_at);
                true
            }
            None => false,
        }
    }

    pub fn last_seen(&self, name: &str) -> Option<SystemTime> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .flatten()
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Observed members, oldest observation first.
    pub fn snapshot(&self) -> Vec<Attendance> {
        let mut seen: Vec<Attendance> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|(name, seen_at)| {
                seen_at.map(|seen_at| Attendance {
                    name: name.clone(),
                    seen_at,
                })
            })
            .collect();

        seen.sort_by(|a, b| a.seen_at.cmp(&b.seen_at).then_with(|| a.name.cmp(&b.name)));
        seen
    }
}
