//! Presence probing
//!
//! `PresenceProbe` is the seam; `L2pingProbe` shells out to BlueZ `l2ping`,
//! `MockProbe` replaces it in tests.

pub mod l2ping;
pub mod mock;
pub mod traits;

pub use l2ping::{L2pingConfig, L2pingProbe};
pub use mock::{MockOutcome, MockProbe};
pub use traits::PresenceProbe;
