//! # Token Response Type
//!
//! The implicit flow: an access token is issued directly from the
//! authorization endpoint, delivered in the fragment component. The
//! query response mode is rejected outright, as it would expose the
//! token in request logs and referrer headers. No refresh token is
//! issued.

use crate::invalid;
use crate::oauth::provider::Provider;
use crate::oauth::token::token_response;
use crate::oauth::types::{
    AuthorizationPayload, AuthorizationRequest, AuthorizationResponse, Client, ResponseMode,
    Server, User,
};
use crate::oauth::{Result, scope};
use crate::server;

pub(crate) async fn handle(
    request: AuthorizationRequest, client: &Client, user: &User, provider: &impl Provider,
    server: &Server,
) -> Result<AuthorizationResponse> {
    tracing::debug!("authorize::token");

    if request.response_mode == Some(ResponseMode::Query) {
        return Err(invalid!("token responses must not use the query response mode"));
    }
    let scopes = scope::allowed_scopes(server, client, request.scope.as_deref())?;

    let access = provider
        .create_access_token(&scopes, client, Some(user))
        .await
        .map_err(|e| server!("issue creating access token: {e}"))?;

    Ok(AuthorizationResponse {
        response_mode: request.response_mode.unwrap_or(ResponseMode::Fragment),
        payload: AuthorizationPayload::Token {
            response: token_response(&access, None),
            state: request.state,
        },
    })
}
