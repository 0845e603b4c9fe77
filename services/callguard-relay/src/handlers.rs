use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use callguard_core::Reservation;
use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::request::CallRequest;
use crate::state::AppState;

pub const SKIP_CALLED_RECENTLY: &str = "called recently";
pub const SKIP_IN_PROGRESS: &str = "call in progress";

/// Result for one destination, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallOutcome {
    Placed {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
        #[serde(rename = "callSid")]
        call_sid: String,
    },
    Skipped {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
        skipped: bool,
        reason: &'static str,
    },
    Failed {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct RelayResponse {
    /// False when at least one dispatch failed
    pub success: bool,
    pub calls: Vec<CallOutcome>,
}

pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "ok",
        "service": "callguard-relay",
        "timestamp": Utc::now().to_rfc3339()
    })))
}

pub async fn relay_calls(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RelayResponse>, RelayError> {
    let Json(body) = payload.map_err(|e| RelayError::Validation(e.body_text()))?;
    let request = CallRequest::from_json(&body)?;

    // Each dispatch runs as its own task so a client hanging up mid-request
    // cannot drop a placed call before its lock is committed.
    let message: Arc<str> = Arc::from(request.message);
    let handles = request.phones.iter().map(|phone| {
        let state = state.clone();
        let phone = phone.clone();
        let message = message.clone();
        tokio::spawn(async move { dispatch_one(&state, &phone, &message).await })
    });
    let joined = join_all(handles).await;

    let calls: Vec<CallOutcome> = joined
        .into_iter()
        .zip(request.phones)
        .map(|(result, phone)| {
            result.unwrap_or_else(|e| {
                error!(phone = %phone, error = %e, "Dispatch task did not complete");
                CallOutcome::Failed {
                    phone_number: phone,
                    error: format!("dispatch task failed: {e}"),
                }
            })
        })
        .collect();

    let success = !calls.iter().any(|c| matches!(c, CallOutcome::Failed { .. }));
    Ok(Json(RelayResponse { success, calls }))
}

async fn dispatch_one(state: &AppState, phone: &str, message: &str) -> CallOutcome {
    let reservation = match state.locks.try_reserve(phone) {
        Reservation::Acquired(reservation) => reservation,
        Reservation::Locked { locked_at_ms } => {
            debug!(phone, locked_at_ms, "Skipping recently called number");
            return skipped(phone, SKIP_CALLED_RECENTLY);
        }
        Reservation::InFlight => {
            debug!(phone, "Skipping number with a call already in progress");
            return skipped(phone, SKIP_IN_PROGRESS);
        }
    };

    match state
        .placer
        .place_call(&state.from_number, phone, message)
        .await
    {
        Ok(call_id) => {
            reservation.commit();
            info!(phone, call_sid = %call_id, "Call placed");
            CallOutcome::Placed {
                phone_number: phone.to_string(),
                call_sid: call_id.0,
            }
        }
        Err(e) => {
            // Reservation drops here and releases the number without a lock.
            warn!(phone, error = %e, "Call dispatch failed");
            CallOutcome::Failed {
                phone_number: phone.to_string(),
                error: e.to_string(),
            }
        }
    }
}

fn skipped(phone: &str, reason: &'static str) -> CallOutcome {
    CallOutcome::Skipped {
        phone_number: phone.to_string(),
        skipped: true,
        reason,
    }
}
