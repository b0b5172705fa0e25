//! Mock presence probe for testing
//!
//! Deterministic stand-in for the Bluetooth tooling: scripted outcomes per
//! address, configurable latency, and bookkeeping of how many probes ran and
//! how many overlapped.

use super::traits::PresenceProbe;
use crate::context::OpContext;
use crate::error::{AtndError, AtndResult};
use crate::registry::HardwareAddress;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Scripted result for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Present,
    Absent,
    AdapterDown,
    UtilityMissing,
}

/// Mock probe
#[derive(Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

#[derive(Default)]
struct MockState {
    outcomes: HashMap<String, MockOutcome>,
    default_outcome: Option<MockOutcome>,
    latency: Duration,
    probed: Vec<String>,
}

impl MockProbe {
    /// Create new mock probe (every address absent, no latency)
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for one address
    pub fn set_outcome(&self, address: &str, outcome: MockOutcome) {
        let mut state = self.state();
        state.outcomes.insert(address.to_ascii_lowercase(), outcome);
    }

    /// Outcome for addresses without a scripted one
    pub fn set_default_outcome(&self, outcome: MockOutcome) {
        self.state().default_outcome = Some(outcome);
    }

    /// Simulated time each probe takes
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Number of probes started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of probes observed running at the same time
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Addresses probed so far, in order
    pub fn probed_addresses(&self) -> Vec<String> {
        self.state().probed.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the in-flight counter even when the probe future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresenceProbe for MockProbe {
    async fn ping(&self, ctx: &OpContext, address: &HardwareAddress) -> AtndResult<bool> {
        ctx.check()?;

        let (outcome, latency) = {
            let mut state = self.state();
            state.probed.push(address.expose().to_string());
            let outcome = state
                .outcomes
                .get(address.expose())
                .copied()
                .or(state.default_outcome)
                .unwrap_or(MockOutcome::Absent);
            (outcome, state.latency)
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !latency.is_zero() {
            ctx.run(tokio::time::sleep(latency)).await?;
        } else {
            // Still yield so overlapping callers get a chance to interleave
            tokio::task::yield_now().await;
        }

        match outcome {
            MockOutcome::Present => Ok(true),
            MockOutcome::Absent => Ok(false),
            MockOutcome::AdapterDown => Err(AtndError::AdapterUnavailable),
            MockOutcome::UtilityMissing => Err(AtndError::ProbeUtilityMissing("l2ping".to_string())),
        }
    }
}
