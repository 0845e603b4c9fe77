//! Call debounce lock store
//!
//! Remembers when each destination was last dispatched to and suppresses
//! further dispatches to it for [`LOCK_TTL_MS`]. The whole map is written to
//! a JSON file after every change so the cooldown survives restarts:
//!
//! ```json
//! {"+15551234567": 1700000000000}
//! ```
//!
//! Durability is best-effort. A missing or corrupt file loads as an empty
//! store, and a failed write is logged while the in-memory state stays
//! authoritative for the rest of the process.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::LockStoreResult;

/// Cooldown window after a successful dispatch (30 minutes)
pub const LOCK_TTL_MS: u64 = 30 * 60 * 1000;

#[derive(Debug, Default)]
struct LockState {
    /// Last successful dispatch per identifier (Unix ms)
    locks: HashMap<String, u64>,
    /// Identifiers with a dispatch currently outstanding
    in_flight: HashSet<String>,
}

/// Outcome of [`LockStore::try_reserve`].
#[derive(Debug)]
pub enum Reservation {
    /// Caller may dispatch. Commit the reservation once the call is placed.
    Acquired(DispatchReservation),
    /// Identifier is inside its cooldown window.
    Locked {
        /// Timestamp of the dispatch that started the window
        locked_at_ms: u64,
    },
    /// Another request is dispatching to this identifier right now.
    InFlight,
}

/// Persistent, time-windowed debounce cache keyed by destination identifier.
pub struct LockStore {
    path: Option<PathBuf>,
    state: Mutex<LockState>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockStore")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

impl LockStore {
    /// Store with no backing file. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    /// In-memory store reading time from `clock`.
    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            path: None,
            state: Mutex::new(LockState::default()),
            clock,
        }
    }

    /// Load the store from `path`, starting empty if the file is absent or
    /// unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self::load_with_clock(path, Arc::new(SystemClock))
    }

    /// Same as [`LockStore::load`] with an explicit clock.
    pub fn load_with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let locks = match read_lock_file(&path) {
            Ok(Some(locks)) => {
                info!(path = %path.display(), entries = locks.len(), "Loaded lock file");
                locks
            }
            Ok(None) => {
                debug!(path = %path.display(), "No lock file present, starting empty");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load lock file, starting empty");
                HashMap::new()
            }
        };

        Self {
            path: Some(path),
            state: Mutex::new(LockState {
                locks,
                in_flight: HashSet::new(),
            }),
            clock,
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether `identifier` is inside its cooldown window right now.
    pub fn is_locked(&self, identifier: &str) -> bool {
        self.is_locked_at(identifier, self.clock.now_ms())
    }

    /// Whether `identifier` is inside its cooldown window at `now_ms`.
    ///
    /// Pure read. Expired entries are left in place.
    pub fn is_locked_at(&self, identifier: &str, now_ms: u64) -> bool {
        self.state()
            .locks
            .get(identifier)
            .is_some_and(|&ts| within_window(ts, now_ms))
    }

    /// Timestamp of the last recorded dispatch, expired or not.
    pub fn locked_at(&self, identifier: &str) -> Option<u64> {
        self.state().locks.get(identifier).copied()
    }

    /// Record a dispatch to `identifier` now and persist the store.
    pub fn set_lock(&self, identifier: &str) {
        self.set_lock_at(identifier, self.clock.now_ms());
    }

    /// Record a dispatch to `identifier` at `now_ms` and persist the store.
    ///
    /// Overwrites any previous timestamp. Persistence failures are logged
    /// and swallowed.
    pub fn set_lock_at(&self, identifier: &str, now_ms: u64) {
        let mut state = self.state();
        state.locks.insert(identifier.to_string(), now_ms);
        self.flush(&state.locks);
    }

    /// Atomically check the cooldown and mark `identifier` as in flight.
    ///
    /// Two concurrent requests for the same identifier cannot both get
    /// [`Reservation::Acquired`]. Dropping the reservation without
    /// committing releases it and leaves the lock map untouched.
    pub fn try_reserve(self: &Arc<Self>, identifier: &str) -> Reservation {
        let now_ms = self.clock.now_ms();
        let mut state = self.state();

        if let Some(&ts) = state.locks.get(identifier) {
            if within_window(ts, now_ms) {
                return Reservation::Locked { locked_at_ms: ts };
            }
        }

        if !state.in_flight.insert(identifier.to_string()) {
            return Reservation::InFlight;
        }

        Reservation::Acquired(DispatchReservation {
            store: Arc::clone(self),
            identifier: identifier.to_string(),
            committed: false,
        })
    }

    /// Drop every entry whose window has closed by `now_ms`.
    ///
    /// Returns the number of entries removed. The file is rewritten only
    /// when something was removed.
    pub fn prune_expired(&self, now_ms: u64) -> usize {
        let mut state = self.state();
        let before = state.locks.len();
        state.locks.retain(|_, ts| within_window(*ts, now_ms));
        let removed = before - state.locks.len();
        if removed > 0 {
            self.flush(&state.locks);
        }
        removed
    }

    /// Number of entries, including expired ones.
    pub fn len(&self) -> usize {
        self.state().locks.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current time according to the store's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn commit(&self, identifier: &str) {
        let now_ms = self.clock.now_ms();
        let mut state = self.state();
        state.in_flight.remove(identifier);
        state.locks.insert(identifier.to_string(), now_ms);
        // Written while still holding the mutex: the file must never lag a
        // later commit. The file is one small JSON object.
        self.flush(&state.locks);
    }

    fn release(&self, identifier: &str) {
        self.state().in_flight.remove(identifier);
    }

    // The map stays consistent across a panic in another holder, so a
    // poisoned mutex is recovered rather than propagated.
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, locks: &HashMap<String, u64>) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_lock_file(path, locks) {
            warn!(path = %path.display(), error = %e, "Failed to write lock file");
        }
    }
}

/// Permission to dispatch to one identifier, obtained from
/// [`LockStore::try_reserve`].
#[derive(Debug)]
pub struct DispatchReservation {
    store: Arc<LockStore>,
    identifier: String,
    committed: bool,
}

impl DispatchReservation {
    /// Identifier this reservation covers.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Record the successful dispatch: start the cooldown and persist.
    pub fn commit(mut self) {
        self.store.commit(&self.identifier);
        self.committed = true;
    }
}

impl Drop for DispatchReservation {
    fn drop(&mut self) {
        if !self.committed {
            self.store.release(&self.identifier);
        }
    }
}

fn within_window(locked_at_ms: u64, now_ms: u64) -> bool {
    now_ms.saturating_sub(locked_at_ms) < LOCK_TTL_MS
}

/// Read the lock file. `Ok(None)` means there is no file.
fn read_lock_file(path: &Path) -> LockStoreResult<Option<HashMap<String, u64>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Some(HashMap::new()));
    }
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Overwrite the lock file with the full map.
///
/// Written to a sibling temp file first and renamed over the target, so a
/// crash mid-write leaves the previous file intact.
fn write_lock_file(path: &Path, locks: &HashMap<String, u64>) -> LockStoreResult<()> {
    let bytes = serde_json::to_vec(locks)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
