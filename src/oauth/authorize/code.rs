//! # Code Response Type
//!
//! Persists an authorization code bound to the redirect URI, granted
//! scopes, and PKCE challenge, and returns it for delivery in the query
//! component (the default response mode).

use crate::invalid;
use crate::oauth::provider::Provider;
use crate::oauth::types::{
    AuthorizationCodeParams, AuthorizationPayload, AuthorizationRequest, AuthorizationResponse,
    Client, ResponseMode, Server, User,
};
use crate::oauth::{Result, scope};
use crate::server;

pub(crate) async fn handle(
    request: AuthorizationRequest, client: &Client, user: &User, provider: &impl Provider,
    server: &Server,
) -> Result<AuthorizationResponse> {
    tracing::debug!("authorize::code");

    let scopes = scope::allowed_scopes(server, client, request.scope.as_deref())?;

    // PKCE is required; S256 is recommended, `plain` is accepted
    let Some(code_challenge) = request.code_challenge else {
        return Err(invalid!("`code_challenge` is required"));
    };
    let code_challenge_method = request.code_challenge_method.unwrap_or_default();

    let params = AuthorizationCodeParams {
        redirect_uri: request.redirect_uri,
        scopes,
        code_challenge,
        code_challenge_method,
    };
    let auth_code = provider
        .create_authorization_code(&params, client, user)
        .await
        .map_err(|e| server!("issue creating authorization code: {e}"))?;

    Ok(AuthorizationResponse {
        response_mode: request.response_mode.unwrap_or(ResponseMode::Query),
        payload: AuthorizationPayload::Code { code: auth_code.code, state: request.state },
    })
}
