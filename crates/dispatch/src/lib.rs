//! Outbound call placement for Callguard.
//!
//! The relay only needs one capability from a telephony provider: place a
//! call that speaks a message and hand back the provider's call id. That
//! capability is the [`CallPlacer`] trait. [`TwilioCallPlacer`] talks to the
//! Twilio REST API and [`RecordingCallPlacer`] stands in for it in tests.

pub mod error;
pub mod mock;
pub mod twilio;
pub mod twiml;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{DispatchError, DispatchResult};
pub use mock::{PlacedCall, RecordingCallPlacer};
pub use twilio::{TwilioCallPlacer, TwilioConfig, DEFAULT_TWILIO_API_BASE};

/// Opaque identifier the provider assigns to a placed call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

impl CallId {
    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// External capability that places one outbound voice call.
#[async_trait]
pub trait CallPlacer: Send + Sync {
    /// Call `to` from `from` and speak `message`.
    ///
    /// No retry is attempted; a failure is final for this dispatch.
    async fn place_call(&self, from: &str, to: &str, message: &str) -> DispatchResult<CallId>;
}
