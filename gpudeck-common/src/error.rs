use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Failure of one backend call, classified the way pages need to render it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Request never completed (DNS, refused, timeout, truncated body).
    #[error("network error: {0}")]
    Network(String),

    /// 401. Pages treat this as "no session" and show empty data.
    #[error("not authenticated")]
    Unauthorized,

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Http {
        status: u16,
        message: Option<String>,
    },

    /// Body did not match the expected contract.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// 4xx other than 401: the server rejected what the user submitted.
    pub fn is_client_error(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => (400..500).contains(status),
            ApiError::NotFound { .. } => true,
            _ => false,
        }
    }

    /// Text shown to the user in a banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.trim().to_string(),
            ApiError::NotFound { resource, id } => format!("{} {} not found", resource, id),
            ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Build an `Http` error from a status and a raw body.
    ///
    /// The body is parsed as JSON best-effort; `detail`, `message` then `error`
    /// are tried in that order. A `detail` list (validation errors) is
    /// flattened to its `msg` entries.
    pub fn from_status_body(status: u16, body: &str) -> Self {
        if status == 401 {
            return ApiError::Unauthorized;
        }
        ApiError::Http {
            status,
            message: extract_error_message(body),
        }
    }
}

pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string())
            }
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<String> = items
                    .iter()
                    .filter_map(|it| {
                        it.get("msg")
                            .and_then(|m| m.as_str())
                            .or_else(|| it.as_str())
                            .map(|s| s.to_string())
                    })
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            Some(serde_json::Value::Object(inner)) => {
                if let Some(m) = inner.get("message").and_then(|m| m.as_str()) {
                    return Some(m.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_wins_over_message() {
        let e = ApiError::from_status_body(400, r#"{"detail":"GPU sold out","message":"x"}"#);
        assert_eq!(e.user_message(), "GPU sold out");
    }

    #[test]
    fn validation_detail_list_is_flattened() {
        let body = r#"{"detail":[{"loc":["body","name"],"msg":"field required"},{"msg":"bad gpu"}]}"#;
        let e = ApiError::from_status_body(422, body);
        assert_eq!(e.user_message(), "field required; bad gpu");
        assert!(e.is_client_error());
    }

    #[test]
    fn non_json_body_falls_back_to_generic_text() {
        let e = ApiError::from_status_body(502, "<html>Bad gateway</html>");
        assert_eq!(e.user_message(), GENERIC_ERROR_MESSAGE);
        assert!(!e.is_client_error());
    }

    #[test]
    fn status_401_is_unauthorized() {
        assert!(ApiError::from_status_body(401, "{}").is_unauthorized());
    }

    #[test]
    fn error_field_is_used_last() {
        let e = ApiError::from_status_body(409, r#"{"error":"already cancelled"}"#);
        assert_eq!(e.user_message(), "already cancelled");
    }
}
