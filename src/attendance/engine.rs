//! Attendance Engine - the facade callers talk to
//!
//! Composes the registry, the address codec, a presence probe and the status
//! cache. Two capacity-1 gates serialize the radio work:
//!
//! - the sweep gate admits one whole-roster search at a time
//! - the probe gate admits one individual probe at a time, shared by single
//!   searches and the per-member probes of a sweep
//!
//! Both are `tokio::sync::Semaphore`s (FIFO), always acquired through
//! [`OpContext::run`] so a cancelled waiter leaves the queue and a cancelled
//! holder releases its permit when its future is dropped.
//!
//! Member mutations touch the registry and then the status cache. A separate
//! membership mutex serializes each pair, so a concurrent register and remove
//! of the same name cannot leave a registered member untracked. The registry
//! and status locks themselves are still never held together.

use super::status::StatusCache;
use super::Attendance;
use crate::context::OpContext;
use crate::crypto::AddressCodec;
use crate::error::{AtndError, AtndResult};
use crate::probe::PresenceProbe;
use crate::registry::RegistryStore;
use crate::storage::StoragePaths;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

/// Attendance engine
#[derive(Debug)]
pub struct AttendanceEngine<P> {
    registry: RegistryStore,
    codec: Arc<AddressCodec>,
    probe: P,
    status: StatusCache,
    membership: Mutex<()>,
    sweep_gate: Semaphore,
    probe_gate: Semaphore,
}

impl<P: PresenceProbe> AttendanceEngine<P> {
    /// Load (or create) the key and registry at `paths` and start tracking
    /// every registered member.
    pub fn open(paths: &StoragePaths, probe: P) -> AtndResult<Self> {
        let codec = Arc::new(AddressCodec::load_or_create(&paths.key_file)?);
        let registry = RegistryStore::load(&paths.registry_file, Arc::clone(&codec))?;
        let status = StatusCache::new(registry.members());

        info!(
            registry = %registry.path().display(),
            members = registry.len(),
            "attendance engine ready"
        );

        Ok(Self {
            registry,
            codec,
            probe,
            status,
            membership: Mutex::new(()),
            sweep_gate: Semaphore::new(1),
            probe_gate: Semaphore::new(1),
        })
    }

    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    /// Register `name`, or replace the address of an existing member.
    pub fn register_or_update(&self, name: &str, raw_address: &str) -> AtndResult<()> {
        let _membership = self.membership();
        self.registry.set_member(name, raw_address)?;
        self.status.track(name);
        Ok(())
    }

    /// Remove `name` and forget when it was last seen.
    pub fn remove(&self, name: &str) -> AtndResult<()> {
        let _membership = self.membership();
        self.registry.delete_member(name)?;
        self.status.remove(name);
        Ok(())
    }

    fn membership(&self) -> MutexGuard<'_, ()> {
        self.membership.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn list_members(&self) -> Vec<String> {
        self.registry.members()
    }

    /// Probe one member.
    ///
    /// Returns `Some` when the device answered (and records the sighting),
    /// `None` when it did not.
    pub async fn search_one(&self, ctx: &OpContext, name: &str) -> AtndResult<Option<Attendance>> {
        let blob = self.registry.find_encrypted_address(name)?;
        let address = self.codec.decrypt(&blob)?;

        let _permit = acquire(ctx, &self.probe_gate, "probe").await?;
        debug!(member = %name, "probing");

        if !self.probe.ping(ctx, &address).await? {
            debug!(member = %name, "not in range");
            return Ok(None);
        }

        let seen_at = SystemTime::now();
        if !self.status.update(name, seen_at) {
            // Deleted while the probe was running
            debug!(member = %name, "seen after removal, not recorded");
        }
        info!(member = %name, "member present");

        Ok(Some(Attendance {
            name: name.to_string(),
            seen_at,
        }))
    }

    /// Probe every registered member in registry order.
    ///
    /// The first hard error aborts the sweep and the members found so far
    /// are not returned (their sightings stay recorded in the status cache).
    pub async fn search_all(&self, ctx: &OpContext) -> AtndResult<Vec<Attendance>> {
        let _permit = acquire(ctx, &self.sweep_gate, "sweep").await?;

        let roster = self.registry.members();
        info!(members = roster.len(), "sweep started");

        let mut present = Vec::new();
        for name in &roster {
            match self.search_one(ctx, name).await {
                Ok(Some(attendance)) => present.push(attendance),
                Ok(None) => {}
                Err(e) => {
                    warn!(member = %name, error = %e, "sweep aborted");
                    return Err(e);
                }
            }
        }

        info!(present = present.len(), members = roster.len(), "sweep finished");
        Ok(present)
    }

    /// Members seen since startup, oldest sighting first.
    pub fn status(&self) -> Vec<Attendance> {
        self.status.snapshot()
    }

    pub fn last_seen(&self, name: &str) -> Option<SystemTime> {
        self.status.last_seen(name)
    }

    /// Whether a whole-roster search holds the sweep gate.
    pub fn is_sweeping(&self) -> bool {
        self.sweep_gate.available_permits() == 0
    }

    /// Whether an individual probe holds the probe gate.
    pub fn is_probing(&self) -> bool {
        self.probe_gate.available_permits() == 0
    }
}

/// Wait for `gate` unless `ctx` fires first.
async fn acquire<'a>(
    ctx: &OpContext,
    gate: &'a Semaphore,
    which: &'static str,
) -> AtndResult<SemaphorePermit<'a>> {
    let permit = ctx.run(gate.acquire()).await.map_err(|e| {
        debug!(gate = which, error = %e, "gave up waiting");
        e
    })?;
    // The gates are never closed; treat it like a shutdown if one ever is.
    permit.map_err(|_| AtndError::Cancelled)
}
