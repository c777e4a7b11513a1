//! Wire status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed, HTTP-analogous status enum carried by broadcast and deliver
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Status {
    Unknown = 0,
    Success = 200,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl Status {
    /// The numeric wire code.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Parse a wire code. Unlisted codes are not representable.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Status::Unknown),
            200 => Some(Status::Success),
            400 => Some(Status::BadRequest),
            403 => Some(Status::Forbidden),
            404 => Some(Status::NotFound),
            500 => Some(Status::InternalServerError),
            503 => Some(Status::ServiceUnavailable),
            _ => None,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    const fn name(self) -> &'static str {
        match self {
            Status::Unknown => "UNKNOWN",
            Status::Success => "SUCCESS",
            Status::BadRequest => "BAD_REQUEST",
            Status::Forbidden => "FORBIDDEN",
            Status::NotFound => "NOT_FOUND",
            Status::InternalServerError => "INTERNAL_SERVER_ERROR",
            Status::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.name())
    }
}
