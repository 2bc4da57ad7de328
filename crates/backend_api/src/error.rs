use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum BackendApiError {
    InvalidBaseUrl(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    RateLimited,
    AuthFailed,
    MissingCsrfToken,
    Serde(JsonError),
    Cancelled,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<String>,
    message: Option<String>,
}

impl fmt::Display for BackendApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::RateLimited => write!(f, "rate limited, try again later"),
            Self::AuthFailed => write!(f, "authentication failed, check the token"),
            Self::MissingCsrfToken => write!(f, "CSRF token missing from index page"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for BackendApiError {}

impl From<reqwest::Error> for BackendApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for BackendApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Pull a human-readable message out of an error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload
            .error
            .or(payload.message)
            .filter(|value| !value.trim().is_empty())
        {
            return message;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::parse_error_message;
    use reqwest::StatusCode;

    #[test]
    fn prefers_error_field_from_json_body() {
        let message =
            parse_error_message(StatusCode::BAD_REQUEST, r#"{"error":"cwd not allowed"}"#);
        assert_eq!(message, "cwd not allowed");
    }

    #[test]
    fn falls_back_to_message_field() {
        let message =
            parse_error_message(StatusCode::NOT_FOUND, r#"{"message":"job not found"}"#);
        assert_eq!(message, "job not found");
    }

    #[test]
    fn falls_back_to_raw_body_then_canonical_reason() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "tunnel offline"),
            "tunnel offline"
        );
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "  "),
            "Bad Gateway"
        );
    }
}
