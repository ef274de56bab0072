//! # Refresh Token Grant
//!
//! Exchange of a refresh token for a fresh access token, per RFC 6749
//! §6, with optional scope narrowing and configurable rotation.
//!
//! When rotation is enabled the presented token is revoked before its
//! replacement is created; the two calls are observable in that order.

use chrono::Utc;

use crate::oauth::provider::Provider;
use crate::oauth::token::token_response;
use crate::oauth::types::{Client, Server, TokenRequest, TokenResponse};
use crate::oauth::{Error, Result, scope};
use crate::{invalid, server};

pub(crate) async fn handle(
    request: &TokenRequest, client: &Client, provider: &impl Provider, server: &Server,
) -> Result<TokenResponse> {
    tracing::debug!("grant::refresh_token");

    let Some(token) = &request.refresh_token else {
        return Err(invalid!("`refresh_token` is required"));
    };
    let requested = scope::check_requested_scope(server, request.scope.as_deref())?;

    let found = provider
        .find_refresh_token(token)
        .await
        .map_err(|e| server!("issue finding refresh token: {e}"))?;
    let Some(refresh) = found else {
        return Err(Error::InvalidGrant("refresh token not found".to_string()));
    };

    if refresh.client.client_id != client.client_id {
        return Err(Error::InvalidGrant("refresh token was issued to another client".to_string()));
    }
    let now = Utc::now();
    if now < refresh.valid_after {
        return Err(Error::InvalidGrant("refresh token is not yet valid".to_string()));
    }
    if now > refresh.expires_at {
        return Err(Error::InvalidGrant("refresh token has expired".to_string()));
    }
    if refresh.is_revoked {
        return Err(Error::InvalidGrant("refresh token has been revoked".to_string()));
    }

    // a present scope may only narrow the original grant
    let scopes = match requested {
        Some(requested) => {
            for token in &requested {
                if !refresh.scopes.contains(token) {
                    return Err(Error::InvalidGrant(format!(
                        "scope `{token}` exceeds the original grant"
                    )));
                }
            }
            requested
        }
        None => refresh.scopes.clone(),
    };

    let access = provider
        .create_access_token(&scopes, client, Some(&refresh.user))
        .await
        .map_err(|e| server!("issue creating access token: {e}"))?;

    if server.rotate_refresh_tokens {
        provider
            .revoke_refresh_token(&refresh.token)
            .await
            .map_err(|e| server!("issue revoking refresh token: {e}"))?;
        let rotated = provider
            .create_refresh_token(&refresh.scopes, client, &refresh.user)
            .await
            .map_err(|e| server!("issue creating refresh token: {e}"))?;
        return Ok(token_response(&access, Some(&rotated)));
    }

    Ok(token_response(&access, Some(&refresh)))
}
