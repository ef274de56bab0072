//! # Client Credentials Grant
//!
//! Token issuance for the client's own account, per RFC 6749 §4.4. No
//! resource owner is involved and no refresh token is ever issued.

use crate::oauth::provider::Provider;
use crate::oauth::token::token_response;
use crate::oauth::types::{Client, Server, TokenRequest, TokenResponse};
use crate::oauth::{Result, scope};
use crate::server;

pub(crate) async fn handle(
    request: &TokenRequest, client: &Client, provider: &impl Provider, server: &Server,
) -> Result<TokenResponse> {
    tracing::debug!("grant::client_credentials");

    let scopes = scope::allowed_scopes(server, client, request.scope.as_deref())?;

    let access = provider
        .create_access_token(&scopes, client, None)
        .await
        .map_err(|e| server!("issue creating access token: {e}"))?;

    Ok(token_response(&access, None))
}
