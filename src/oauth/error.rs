//! # OAuth 2.0 Errors
//!
//! The error codes of RFC 6749 §5.2 and §4.1.2.1, rendered in the wire
//! JSON shape. Token-endpoint callers serialize the error as a JSON body;
//! authorization-endpoint callers append the querystring form to a
//! validated redirect URI.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// OAuth 2.0 error codes.
#[derive(Error, Debug, Deserialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// The request is missing a required parameter, includes an
    /// unsupported parameter value, repeats a parameter, or is otherwise
    /// malformed.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// Client authentication failed (e.g., unknown client, no client
    /// authentication included, or unsupported authentication method).
    #[error(r#"{{"error": "invalid_client", "error_description": "{0}"}}"#)]
    InvalidClient(String),

    /// The provided authorization grant (e.g., authorization code) or
    /// refresh token is invalid, expired, revoked, does not match the
    /// redirection URI used in the authorization request, or was issued
    /// to another client.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    InvalidGrant(String),

    /// The authenticated client is not authorized to use this
    /// authorization grant type or response type.
    #[error(r#"{{"error": "unauthorized_client", "error_description": "{0}"}}"#)]
    UnauthorizedClient(String),

    /// The authorization grant type is not supported by the authorization
    /// server.
    #[error(r#"{{"error": "unsupported_grant_type", "error_description": "{0}"}}"#)]
    UnsupportedGrantType(String),

    /// The authorization server does not support obtaining an
    /// authorization response using this method.
    #[error(r#"{{"error": "unsupported_response_type", "error_description": "{0}"}}"#)]
    UnsupportedResponseType(String),

    /// The requested scope is invalid, unknown, malformed, or exceeds the
    /// scope granted by the resource owner.
    #[error(r#"{{"error": "invalid_scope", "error_description": "{0}"}}"#)]
    InvalidScope(String),

    /// The resource owner or authorization server denied the request.
    #[error(r#"{{"error": "access_denied", "error_description": "{0}"}}"#)]
    AccessDenied(String),

    /// The authorization server encountered an unexpected condition that
    /// prevented it from fulfilling the request.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

/// Error response wire shape.
#[allow(clippy::module_name_repetitions)]
#[derive(Deserialize, Serialize)]
struct WireError {
    error: String,
    error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as SerdeError;

        let Ok(error) = serde_json::from_str::<WireError>(&self.to_string()) else {
            return Err(SerdeError::custom("issue deserializing Err"));
        };
        error.serialize(serializer)
    }
}

impl Error {
    /// The error as wire-shaped JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.to_string()).unwrap_or_default()
    }

    /// The error as an HTTP querystring, for redirect-based responses.
    ///
    /// Includes `state` when the authorization request supplied one.
    #[must_use]
    pub fn to_querystring(&self, state: Option<&str>) -> String {
        let Ok(mut wire) = serde_json::from_str::<WireError>(&self.to_string()) else {
            return String::new();
        };
        wire.state = state.map(ToString::to_string);

        let mut pairs = vec![
            format!("error={}", urlencoding::encode(&wire.error)),
            format!("error_description={}", urlencoding::encode(&wire.error_description)),
        ];
        if let Some(state) = &wire.state {
            pairs.push(format!("state={}", urlencoding::encode(state)));
        }
        pairs.join("&")
    }
}

/// Construct an `Error::InvalidRequest` from a format string.
#[macro_export]
macro_rules! invalid {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::oauth::Error::InvalidRequest(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::oauth::Error::InvalidRequest(format!($err))
    };
}

/// Construct an `Error::ServerError` from a format string.
#[macro_export]
macro_rules! server {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::oauth::Error::ServerError(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::oauth::Error::ServerError(format!($err))
    };
}

#[cfg(test)]
mod test {
    use serde_json::{Value, json};

    use super::*;

    // Test that error details are returned as json.
    #[test]
    fn err_json() {
        let err = invalid!("bad request");
        let ser: Value = serde_json::from_str(&err.to_string()).unwrap();
        assert_eq!(ser, json!({"error": "invalid_request", "error_description": "bad request"}));
    }

    // Test that the error details are returned as an http query string.
    #[test]
    fn err_querystring() {
        let err = Error::InvalidScope("Invalid scope description".to_string());
        assert_eq!(
            err.to_querystring(Some("af0ifjsldkj")),
            "error=invalid_scope&error_description=Invalid%20scope%20description&state=af0ifjsldkj"
        );
    }

    #[test]
    fn err_serialize() {
        let err = server!("storage failed");
        let ser = serde_json::to_value(&err).unwrap();
        assert_eq!(ser, json!({"error": "server_error", "error_description": "storage failed"}));
    }
}
