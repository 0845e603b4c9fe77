//! Inbound relay request validation.

use serde_json::Value;

use crate::error::RelayError;

/// Upper bound on destinations per request.
pub const MAX_PHONE_NUMBERS: usize = 5;

/// A validated relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub phones: Vec<String>,
    pub message: String,
}

impl CallRequest {
    /// Validate a decoded JSON body of the form
    /// `{"phone": ["+1555..."], "message": "text"}`.
    pub fn from_json(body: &Value) -> Result<Self, RelayError> {
        let phones = match body.get("phone") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(RelayError::Validation(
                    "phone must be a non-empty array".to_string(),
                ))
            }
        };

        if phones.len() > MAX_PHONE_NUMBERS {
            return Err(RelayError::Validation(format!(
                "Maximum {MAX_PHONE_NUMBERS} phone numbers allowed"
            )));
        }

        let phones = phones
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
                _ => Err(RelayError::Validation(
                    "phone entries must be non-empty strings".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let message = match body.get("message") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(RelayError::Validation(
                    "message must be a text string".to_string(),
                ))
            }
        };

        Ok(CallRequest { phones, message })
    }
}
