//! # Token Response Assembly
//!
//! Normalization of issued tokens into the RFC 6749 §5.1 response shape.

use chrono::Utc;

use crate::oauth::types::{AccessToken, RefreshToken, TokenResponse};

/// Assemble the token endpoint response for an issued access token and
/// optional refresh token.
///
/// `expires_in` is the number of seconds until the access token expires,
/// rounded up; `scope` is the space-joined grant, omitted when empty.
#[must_use]
pub fn token_response(access: &AccessToken, refresh: Option<&RefreshToken>) -> TokenResponse {
    let remaining_ms = (access.expires_at - Utc::now()).num_milliseconds();
    let expires_in = remaining_ms.div_euclid(1000) + i64::from(remaining_ms.rem_euclid(1000) > 0);

    let scope =
        if access.scopes.is_empty() { None } else { Some(access.scopes.join(" ")) };

    TokenResponse {
        access_token: access.token.clone(),
        token_type: access.token_type,
        expires_in,
        scope,
        refresh_token: refresh.map(|r| r.token.clone()),
    }
}
