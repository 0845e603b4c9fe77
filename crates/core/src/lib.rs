//! Core functionality for the Callguard call relay.
//!
//! This crate owns the debounce lock store that keeps the relay from
//! calling the same number twice inside the cooldown window, plus the
//! clock, error and logging plumbing shared by the other crates.

pub mod clock;
pub mod error;
pub mod lock_store;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LockStoreError, LockStoreResult};
pub use lock_store::{DispatchReservation, LockStore, Reservation, LOCK_TTL_MS};
