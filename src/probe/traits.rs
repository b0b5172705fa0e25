//! Presence probe trait abstraction
//!
//! The engine only ever talks to `PresenceProbe`, so tests substitute
//! `MockProbe` for the real Bluetooth tooling.

use crate::context::OpContext;
use crate::error::AtndResult;
use crate::registry::HardwareAddress;
use async_trait::async_trait;

/// One reachability test against one hardware address
///
/// Outcomes:
/// - `Ok(true)`: the device answered
/// - `Ok(false)`: no answer, or an unrecognized failure (treated as absence)
/// - `Err(ProbeUtilityMissing)` / `Err(AdapterUnavailable)`: hardware-side failure
/// - `Err(Cancelled)` / `Err(DeadlineExceeded)`: `ctx` fired first
///
/// Implementations must return promptly once `ctx` fires and must not leave
/// anything running behind them.
#[async_trait]
pub trait PresenceProbe: Send + Sync {
    async fn ping(&self, ctx: &OpContext, address: &HardwareAddress) -> AtndResult<bool>;
}
