//! In-process [`CallPlacer`] that records every call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DispatchError, DispatchResult};
use crate::{CallId, CallPlacer};

/// One call seen by [`RecordingCallPlacer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub from: String,
    pub to: String,
    pub message: String,
}

/// Records calls instead of placing them.
///
/// Destinations registered with [`RecordingCallPlacer::fail_for`] are
/// rejected with a 400. Call ids are `CA` followed by a sequence number.
#[derive(Debug, Default)]
pub struct RecordingCallPlacer {
    calls: Mutex<Vec<PlacedCall>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    next_id: AtomicU64,
}

impl RecordingCallPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Reject every call to `to`.
    pub fn fail_for(&self, to: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(to.to_string());
    }

    /// Calls recorded so far, failed ones included, in arrival order.
    pub fn calls(&self) -> Vec<PlacedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Destinations called so far, in arrival order.
    pub fn destinations(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.to).collect()
    }
}

#[async_trait]
impl CallPlacer for RecordingCallPlacer {
    async fn place_call(&self, from: &str, to: &str, message: &str) -> DispatchResult<CallId> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PlacedCall {
                from: from.to_string(),
                to: to.to_string(),
                message: message.to_string(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(to);
        if failing {
            return Err(DispatchError::Rejected {
                status: 400,
                message: format!("call to {to} rejected"),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CallId(format!("CA{n:032}")))
    }
}
