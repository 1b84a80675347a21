//! Response definitions
//!
//! Represents the outcome of an invocation as returned to the caller.

use crate::error::LedgerError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    AlreadyExists = 0x02,
    Conflict = 0x03,
    Error = 0x04,
}

/// A response to an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (JSON on success, error message otherwise)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a failure response carrying a message
    pub fn failure(status: Status, message: &str) -> Self {
        Self {
            status,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Map an error onto its status code
    pub fn from_error(error: &LedgerError) -> Self {
        let status = match error {
            LedgerError::NotFound { .. } => Status::NotFound,
            LedgerError::AlreadyExists { .. } => Status::AlreadyExists,
            LedgerError::Conflict(_) => Status::Conflict,
            _ => Status::Error,
        };
        Self::failure(status, &error.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Payload as UTF-8 text (lossy), empty when there is none
    pub fn payload_text(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
