//! Typed failures returned by the content API.

use serde::Deserialize;
use thiserror::Error;

/// Every way a content API call can fail.
///
/// `Unauthorized` is the one variant callers should not handle themselves:
/// the session store reacts to it by signing out (see `ui::SessionClient`).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server rejected the credential token (HTTP 401).
    #[error("authorization rejected")]
    Unauthorized,

    /// The requested resource does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Any other 4xx, with the server's explanation when it gave one.
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// 5xx.
    #[error("server error ({status})")]
    Server { status: u16 },

    /// The request never produced a response (connection, DNS, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The upload response carried neither `url` nor `file_url`.
    #[error("upload response did not include a file URL")]
    MissingUploadUrl,

    /// The configured base URL or a request path is not a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// FastAPI-style error body: `detail` is either a message or a list of
/// validation problems.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Problems(Vec<Problem>),
}

#[derive(Deserialize)]
struct Problem {
    msg: String,
}

impl ApiError {
    /// Map a non-success status and its body to a typed failure.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound,
            400..=499 => ApiError::Rejected {
                status,
                detail: extract_detail(body).unwrap_or_else(|| format!("HTTP {status}")),
            },
            _ => ApiError::Server { status },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    /// Short message suitable for showing next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            ApiError::NotFound => "The requested item no longer exists.".to_string(),
            ApiError::Rejected { detail, .. } => detail.clone(),
            ApiError::Server { .. } => "The server ran into a problem. Please try again.".to_string(),
            ApiError::Transport(_) => "Could not reach the server. Check your connection and try again.".to_string(),
            ApiError::Decode(_) => "The server sent a response we could not read.".to_string(),
            ApiError::MissingUploadUrl => "The upload finished but no file URL came back.".to_string(),
            ApiError::InvalidUrl(_) => "The API address is misconfigured.".to_string(),
        }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Detail::Message(message) if !message.is_empty() => Some(message),
        Detail::Problems(problems) => problems.into_iter().next().map(|p| p.msg),
        Detail::Message(_) => None,
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status.as_u16(), "")
        } else {
            // Strip the URL so nothing request-specific ends up in logs
            ApiError::Transport(e.without_url().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from_status(401, ""), ApiError::Unauthorized);
        assert_eq!(ApiError::from_status(404, "{}"), ApiError::NotFound);
        assert_eq!(ApiError::from_status(502, ""), ApiError::Server { status: 502 });
        assert!(matches!(
            ApiError::from_status(409, ""),
            ApiError::Rejected { status: 409, .. }
        ));
    }

    #[test]
    fn test_rejection_uses_server_detail() {
        let err = ApiError::from_status(400, r#"{"detail": "Username already registered"}"#);
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 400,
                detail: "Username already registered".to_string()
            }
        );
        assert_eq!(err.user_message(), "Username already registered");
    }

    #[test]
    fn test_rejection_uses_first_validation_problem() {
        let body = r#"{"detail": [{"loc": ["body", "title"], "msg": "field required", "type": "missing"}]}"#;
        let err = ApiError::from_status(422, body);
        assert_eq!(err.user_message(), "field required");
    }

    #[test]
    fn test_rejection_without_body() {
        let err = ApiError::from_status(400, "<html>bad</html>");
        assert_eq!(err.user_message(), "HTTP 400");
    }

    #[test]
    fn test_transience() {
        assert!(ApiError::Transport("reset".into()).is_transient());
        assert!(ApiError::Server { status: 503 }.is_transient());
        assert!(!ApiError::NotFound.is_transient());
        assert!(!ApiError::Unauthorized.is_transient());
    }
}
