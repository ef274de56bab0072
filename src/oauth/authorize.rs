//! # Response Type Handlers
//!
//! Authorization endpoint dispatch. The caller has authenticated the
//! resource owner and resolved the client; the core validates the
//! request, persists any state through the provider, and returns the
//! response parameters together with the response mode the transport
//! must deliver them in.
//!
//! The redirect URI is validated against the client's registration before
//! anything else: a request with an unregistered URI fails outright and
//! must never produce a redirect-based error.

mod code;
mod token;

use crate::invalid;
use crate::oauth::provider::Provider;
use crate::oauth::types::{
    AuthorizationRequest, AuthorizationResponse, Client, ResponseType, Server, User,
};
use crate::oauth::{Error, Result};

/// Handle an authorization endpoint request for an authenticated
/// resource owner.
///
/// # Errors
///
/// `InvalidRequest` for client or redirect URI mismatches,
/// `UnsupportedResponseType` when the server does not support the
/// response type, `UnauthorizedClient` when the client may not use it,
/// plus the handler's own validation errors.
pub async fn authorize(
    request: AuthorizationRequest, client: &Client, user: &User, provider: &impl Provider,
    server: &Server,
) -> Result<AuthorizationResponse> {
    tracing::debug!("authorize");

    if request.client_id != client.client_id {
        return Err(invalid!("`client_id` does not match the authenticated client"));
    }
    if !client.redirect_uris.contains(&request.redirect_uri) {
        return Err(invalid!("`redirect_uri` is not registered for the client"));
    }

    if !server.response_types_supported.contains(&request.response_type) {
        return Err(Error::UnsupportedResponseType(format!(
            "the server does not support the {:?} response type",
            request.response_type
        )));
    }
    if !client.response_types.contains(&request.response_type) {
        return Err(Error::UnauthorizedClient(format!(
            "the client may not use the {:?} response type",
            request.response_type
        )));
    }

    match request.response_type {
        ResponseType::Code => code::handle(request, client, user, provider, server).await,
        ResponseType::Token => token::handle(request, client, user, provider, server).await,
    }
}
