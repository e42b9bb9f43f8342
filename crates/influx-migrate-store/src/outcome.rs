use crate::http::HttpResponse;

/// What a store said about a write or backfill request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub success: bool,
    /// HTTP status, or 0 when no response was received.
    pub status_code: u16,
    pub body: String,
}

impl WriteOutcome {
    /// Nothing needed sending.
    pub fn no_op() -> Self {
        Self {
            success: true,
            status_code: 204,
            body: String::new(),
        }
    }

    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            success: response.is_success(),
            status_code: response.status,
            body: response.body_lossy(),
        }
    }

    /// The request never produced a response.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: 0,
            body: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: 501,
            body: message.into(),
        }
    }

    /// A 2xx response whose body still reports an error.
    pub fn rejected(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            body: message.into(),
        }
    }
}
