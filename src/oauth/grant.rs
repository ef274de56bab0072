//! # Grant Handlers
//!
//! The token endpoint's per-grant state machines. The dispatcher assumes
//! the client has already been authenticated upstream; it enforces that
//! the grant is supported by the server and allowed for the client, then
//! routes to the grant's handler.
//!
//! Within a single invocation the observable provider-call order is
//! fixed per grant:
//!
//! - authorization code: `find_authorization_code`,
//!   `revoke_authorization_code`, PKCE verification,
//!   `create_access_token`, then optionally `create_refresh_token`;
//! - refresh token with rotation: `find_refresh_token`,
//!   `create_access_token`, `revoke_refresh_token`,
//!   `create_refresh_token`;
//! - refresh token without rotation: `find_refresh_token`,
//!   `create_access_token`.

mod authorization_code;
mod client_credentials;
mod password;
mod refresh_token;

use crate::oauth::provider::Provider;
use crate::oauth::types::{Client, GrantType, Server, TokenRequest, TokenResponse};
use crate::oauth::{Error, Result};

/// Handle a token endpoint request for a pre-authenticated client.
///
/// # Errors
///
/// `UnsupportedGrantType` when the server does not support the grant,
/// `UnauthorizedClient` when the client may not use it, plus the
/// handler's own validation errors.
pub async fn token(
    request: &TokenRequest, client: &Client, provider: &impl Provider, server: &Server,
) -> Result<TokenResponse> {
    tracing::debug!("grant::token");

    if !server.grant_types_supported.contains(&request.grant_type) {
        return Err(Error::UnsupportedGrantType(format!(
            "the server does not support the {:?} grant",
            request.grant_type
        )));
    }
    if !client.grant_types.contains(&request.grant_type) {
        return Err(Error::UnauthorizedClient(format!(
            "the client may not use the {:?} grant",
            request.grant_type
        )));
    }

    match request.grant_type {
        GrantType::AuthorizationCode => {
            authorization_code::handle(request, client, provider, server).await
        }
        GrantType::RefreshToken => refresh_token::handle(request, client, provider, server).await,
        GrantType::Password => password::handle(request, client, provider, server).await,
        GrantType::ClientCredentials => {
            client_credentials::handle(request, client, provider, server).await
        }
    }
}
