use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, HandlerError};
use crate::model::{Response, ResponseValue};

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status_code: u16,
    /// Unix milliseconds at which the dispatch completed.
    pub timestamp: u64,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(status_code: u16, data: T) -> Self {
        Self {
            status_code,
            timestamp: now_millis(),
            data,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            status_code: self.status_code,
            timestamp: self.timestamp,
            data: f(self.data),
        }
    }
}

impl Envelope<ResponseValue> {
    /// Recover the concrete response type.
    pub fn downcast<P: Response>(self) -> Result<Envelope<P>, HandlerError> {
        let data = self.data.downcast::<P>()?;
        Ok(Envelope {
            status_code: self.status_code,
            timestamp: self.timestamp,
            data,
        })
    }
}

/// Result of a failed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub timestamp: u64,
    pub error_code: String,
    pub error_type: ErrorKind,
    /// Human-readable description of the failure.
    pub data: String,
}

impl From<&HandlerError> for ErrorEnvelope {
    fn from(err: &HandlerError) -> Self {
        Self {
            status_code: err.status_code(),
            timestamp: now_millis(),
            error_code: err.error_code().to_string(),
            error_type: err.kind(),
            data: err.to_string(),
        }
    }
}

/// Transport-neutral rendering of a dispatch outcome.
///
/// `status` mirrors the envelope's status code so adapters can map it onto
/// their own protocol without parsing `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
