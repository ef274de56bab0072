//! # Resource Owner Password Credentials Grant
//!
//! Direct exchange of resource owner credentials for tokens, per RFC 6749
//! §4.3. Credential verification is delegated to the subject service;
//! a rejection surfaces as `invalid_grant` with no further detail.

use crate::oauth::provider::Provider;
use crate::oauth::token::token_response;
use crate::oauth::types::{Client, GrantType, Server, TokenRequest, TokenResponse};
use crate::oauth::{Error, Result, scope};
use crate::{invalid, server};

pub(crate) async fn handle(
    request: &TokenRequest, client: &Client, provider: &impl Provider, server: &Server,
) -> Result<TokenResponse> {
    tracing::debug!("grant::password");

    let Some(username) = &request.username else {
        return Err(invalid!("`username` is required"));
    };
    let Some(password) = &request.password else {
        return Err(invalid!("`password` is required"));
    };
    let scopes = scope::allowed_scopes(server, client, request.scope.as_deref())?;

    let found = provider
        .find_by_credentials(username, password)
        .await
        .map_err(|e| server!("issue finding user: {e}"))?;
    let Some(user) = found else {
        return Err(Error::InvalidGrant("invalid resource owner credentials".to_string()));
    };

    let access = provider
        .create_access_token(&scopes, client, Some(&user))
        .await
        .map_err(|e| server!("issue creating access token: {e}"))?;

    let refresh = if client.grant_types.contains(&GrantType::RefreshToken)
        && server.issue_refresh_tokens
    {
        let refresh = provider
            .create_refresh_token(&scopes, client, &user)
            .await
            .map_err(|e| server!("issue creating refresh token: {e}"))?;
        Some(refresh)
    } else {
        None
    };

    Ok(token_response(&access, refresh.as_ref()))
}
