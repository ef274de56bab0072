//! # Authorization Code Grant
//!
//! Exchange of a single-use authorization code (plus its PKCE verifier)
//! for tokens, per RFC 6749 §4.1 and RFC 7636 §4.5.
//!
//! The code is burned on lookup: it is revoked as soon as it has been
//! fetched, before any further validation, so a failing request still
//! consumes it.

use chrono::Utc;

use crate::core::pkce::CodeChallengeMethod;
use crate::oauth::provider::Provider;
use crate::oauth::token::token_response;
use crate::oauth::types::{Client, GrantType, Server, TokenRequest, TokenResponse};
use crate::oauth::{Error, Result};
use crate::{invalid, server};

pub(crate) async fn handle(
    request: &TokenRequest, client: &Client, provider: &impl Provider, server: &Server,
) -> Result<TokenResponse> {
    tracing::debug!("grant::authorization_code");

    let Some(code) = &request.code else {
        return Err(invalid!("`code` is required"));
    };
    let Some(redirect_uri) = &request.redirect_uri else {
        return Err(invalid!("`redirect_uri` is required"));
    };
    let Some(code_verifier) = &request.code_verifier else {
        return Err(invalid!("`code_verifier` is required"));
    };

    let found = provider
        .find_authorization_code(code)
        .await
        .map_err(|e| server!("issue finding authorization code: {e}"))?;
    let Some(auth_code) = found else {
        return Err(Error::InvalidGrant("authorization code not found".to_string()));
    };

    // single use: burn the code before any further validation
    provider
        .revoke_authorization_code(code)
        .await
        .map_err(|e| server!("issue revoking authorization code: {e}"))?;

    if auth_code.client.client_id != client.client_id {
        return Err(Error::InvalidGrant(
            "authorization code was issued to another client".to_string(),
        ));
    }
    let now = Utc::now();
    if now < auth_code.valid_after {
        return Err(Error::InvalidGrant("authorization code is not yet valid".to_string()));
    }
    if now > auth_code.expires_at {
        return Err(Error::InvalidGrant("authorization code has expired".to_string()));
    }
    if auth_code.is_revoked {
        return Err(Error::InvalidGrant("authorization code has been revoked".to_string()));
    }
    if &auth_code.redirect_uri != redirect_uri {
        return Err(Error::InvalidGrant("`redirect_uri` does not match".to_string()));
    }

    let method: CodeChallengeMethod = auth_code
        .code_challenge_method
        .parse()
        .map_err(|_| invalid!("unknown code challenge method `{}`", auth_code.code_challenge_method))?;
    if !method.verify(&auth_code.code_challenge, code_verifier) {
        return Err(Error::InvalidGrant("`code_verifier` does not match".to_string()));
    }

    let access = provider
        .create_access_token(&auth_code.scopes, client, Some(&auth_code.user))
        .await
        .map_err(|e| server!("issue creating access token: {e}"))?;

    let refresh = if client.grant_types.contains(&GrantType::RefreshToken)
        && server.issue_refresh_tokens
    {
        let refresh = provider
            .create_refresh_token(&auth_code.scopes, client, &auth_code.user)
            .await
            .map_err(|e| server!("issue creating refresh token: {e}"))?;
        Some(refresh)
    } else {
        None
    };

    Ok(token_response(&access, refresh.as_ref()))
}
