use thiserror::Error;

/// Failure of a single remote call, classified once at the HTTP boundary.
///
/// `Display` renders the outward-facing message a page shows the user; the
/// raw status and TMDB's own `status_message` stay available for callers
/// that need to branch (the login handshake, the 401 session cascade).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request or connection timed out.
    #[error("Request timed out. Please check your internet connection and try again.")]
    Timeout,

    /// No response was received at all.
    #[error("No response from server. Please check your internet connection.")]
    Offline,

    /// The server answered with a non-success status. `remote_message` is
    /// TMDB's `status_message` when the error body carried one.
    #[error("{}", http_message(.status))]
    Http {
        status: u16,
        remote_message: Option<String>,
    },

    /// HTTP success but the payload did not match the expected schema.
    #[error("Received an unexpected response from the server.")]
    Decode(#[source] serde_json::Error),

    /// HTTP success but the response envelope reports a logical failure.
    #[error("{0}")]
    Protocol(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A 401 means the session or credentials are invalid; authenticated
    /// callers must treat it as session-invalid.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// TMDB's `status_message` from the error body, when present.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Http { remote_message, .. } => remote_message.as_deref(),
            _ => None,
        }
    }
}

fn http_message(status: &u16) -> &'static str {
    match *status {
        401 => "Authentication failed. Please check your credentials.",
        404 => "The requested resource was not found.",
        429 => "Rate limit exceeded. Please try again later.",
        500..=599 => "The TMDB server is currently unavailable. Please try again later.",
        _ => "An error occurred while making the request.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses_map_to_user_facing_messages() {
        let not_found = ApiError::Http {
            status: 404,
            remote_message: None,
        };
        assert_eq!(
            not_found.to_string(),
            "The requested resource was not found."
        );

        let rate_limited = ApiError::Http {
            status: 429,
            remote_message: None,
        };
        assert_eq!(
            rate_limited.to_string(),
            "Rate limit exceeded. Please try again later."
        );

        for status in [500, 502, 503, 504] {
            let err = ApiError::Http {
                status,
                remote_message: None,
            };
            assert_eq!(
                err.to_string(),
                "The TMDB server is currently unavailable. Please try again later."
            );
        }

        let teapot = ApiError::Http {
            status: 418,
            remote_message: None,
        };
        assert_eq!(
            teapot.to_string(),
            "An error occurred while making the request."
        );
    }

    #[test]
    fn unauthorized_is_detected_only_for_401() {
        let unauthorized = ApiError::Http {
            status: 401,
            remote_message: Some("Invalid username and/or password".to_string()),
        };
        assert!(unauthorized.is_unauthorized());
        assert_eq!(
            unauthorized.remote_message(),
            Some("Invalid username and/or password")
        );

        assert!(!ApiError::Timeout.is_unauthorized());
        assert!(!ApiError::Http {
            status: 404,
            remote_message: None
        }
        .is_unauthorized());
    }
}
