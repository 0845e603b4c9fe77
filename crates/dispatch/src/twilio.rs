//! Twilio Programmable Voice client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::{twiml, CallId, CallPlacer};

/// Public Twilio API endpoint.
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Credentials and transport settings for [`TwilioCallPlacer`].
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Scheme and host, without a trailing path
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// [`CallPlacer`] backed by `POST /2010-04-01/Accounts/{sid}/Calls.json`.
pub struct TwilioCallPlacer {
    client: Client,
    config: TwilioConfig,
}

impl TwilioCallPlacer {
    pub fn new(config: TwilioConfig) -> DispatchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::InvalidConfig(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl CallPlacer for TwilioCallPlacer {
    async fn place_call(&self, from: &str, to: &str, message: &str) -> DispatchResult<CallId> {
        let twiml = twiml::say(message);
        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from), ("To", to), ("Twiml", twiml.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| body.clone());
            warn!(to, status = status.as_u16(), "Twilio rejected call");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: CallResource = serde_json::from_str(&body)
            .map_err(|e| DispatchError::MalformedResponse(e.to_string()))?;
        let sid = resource
            .sid
            .ok_or_else(|| DispatchError::MalformedResponse("missing sid".to_string()))?;

        debug!(to, call_sid = %sid, "Twilio accepted call");
        Ok(CallId(sid))
    }
}
