//! # OAuth 2.0 Types
//!
//! The entities the core operates on (clients, users, codes, tokens), the
//! wire enums, and the request/response shapes of the token and
//! authorization endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::pkce::CodeChallengeMethod;

/// Grant types of the token endpoint.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum GrantType {
    /// Authorization code grant (with PKCE).
    #[default]
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    /// Refresh token grant.
    #[serde(rename = "refresh_token")]
    RefreshToken,
    /// Resource owner password credentials grant.
    #[serde(rename = "password")]
    Password,
    /// Client credentials grant.
    #[serde(rename = "client_credentials")]
    ClientCredentials,
}

/// Response types of the authorization endpoint.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ResponseType {
    /// Authorization code flow.
    #[default]
    #[serde(rename = "code")]
    Code,
    /// Implicit flow: the access token is issued directly.
    #[serde(rename = "token")]
    Token,
}

/// How authorization response parameters travel back to the client.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ResponseMode {
    /// Parameters in the redirect URI query component.
    #[default]
    #[serde(rename = "query")]
    Query,
    /// Parameters in the redirect URI fragment component.
    #[serde(rename = "fragment")]
    Fragment,
}

/// Access token types issued by the core.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum TokenType {
    /// Bearer tokens (RFC 6750).
    #[default]
    Bearer,
}

/// A registered client application.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Client {
    /// Client identifier.
    pub client_id: String,

    /// Client secret, for confidential clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Registered redirection URIs.
    pub redirect_uris: Vec<String>,

    /// Grant types the client may use at the token endpoint.
    pub grant_types: Vec<GrantType>,

    /// Response types the client may use at the authorization endpoint.
    pub response_types: Vec<ResponseType>,

    /// Scopes the client may be granted.
    pub scopes: Vec<String>,
}

/// A resource owner, opaque to the core.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    /// Subject identifier.
    pub id: String,
}

/// An authorization code issued at the authorization endpoint and
/// consumed exactly once at the token endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The code value.
    pub code: String,

    /// Redirection URI the code was bound to.
    pub redirect_uri: String,

    /// Scopes granted by the resource owner.
    pub scopes: Vec<String>,

    /// PKCE code challenge.
    pub code_challenge: String,

    /// Name of the PKCE transform the challenge was produced with.
    pub code_challenge_method: String,

    /// Issuance instant.
    pub issued_at: DateTime<Utc>,

    /// Instant before which the code must not be accepted.
    pub valid_after: DateTime<Utc>,

    /// Expiry instant.
    pub expires_at: DateTime<Utc>,

    /// Whether the code has been consumed or revoked. Monotonic: set
    /// once, never cleared.
    pub is_revoked: bool,

    /// The client the code was issued to.
    pub client: Client,

    /// The resource owner who approved the request.
    pub user: User,
}

/// An access token.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccessToken {
    /// The token value.
    pub token: String,

    /// Token type.
    pub token_type: TokenType,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Issuance instant.
    pub issued_at: DateTime<Utc>,

    /// Expiry instant.
    pub expires_at: DateTime<Utc>,

    /// The client the token was issued to.
    pub client: Client,

    /// The resource owner, absent for client credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Value of the refresh token this access token descends from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// A refresh token.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RefreshToken {
    /// The token value.
    pub token: String,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Issuance instant.
    pub issued_at: DateTime<Utc>,

    /// Instant before which the token must not be accepted.
    pub valid_after: DateTime<Utc>,

    /// Expiry instant.
    pub expires_at: DateTime<Utc>,

    /// Whether the token has been revoked. Monotonic: set once, never
    /// cleared.
    pub is_revoked: bool,

    /// The client the token was issued to.
    pub client: Client,

    /// The resource owner.
    pub user: User,
}

/// Authorization server settings. Initialized once at construction and
/// immutable thereafter.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Server {
    /// Scopes the server advertises.
    pub scopes_supported: Vec<String>,

    /// Space-joined subset of `scopes_supported` granted when a request
    /// names no scope. When absent, a client's full allow-list is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_scope: Option<String>,

    /// Grant types the server supports.
    pub grant_types_supported: Vec<GrantType>,

    /// Response types the server supports.
    pub response_types_supported: Vec<ResponseType>,

    /// Whether presenting a refresh token revokes it and issues a
    /// replacement.
    pub rotate_refresh_tokens: bool,

    /// Whether refresh tokens are issued at all. Mirrors whether a
    /// refresh-token service is configured.
    pub issue_refresh_tokens: bool,
}

/// Token endpoint request body.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenRequest {
    /// The grant being exercised.
    pub grant_type: GrantType,

    /// Authorization code (authorization code grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Redirection URI the code was bound to (authorization code grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (authorization code grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,

    /// Refresh token (refresh token grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Resource owner username (password grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Resource owner password (password grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Requested scope, space-delimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client identifier, for public clients authenticating in the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Token endpoint response body (RFC 6749 §5.1).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// The issued access token.
    pub access_token: String,

    /// Token type, always `Bearer`.
    pub token_type: TokenType,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// Granted scope, space-joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Refresh token, when one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Authorization endpoint request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// The response type being requested.
    pub response_type: ResponseType,

    /// Client identifier.
    pub client_id: String,

    /// Redirection URI for the response.
    pub redirect_uri: String,

    /// Requested scope, space-delimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Opaque client state, echoed back in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Requested response mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,

    /// PKCE code challenge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE transform the challenge was produced with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<CodeChallengeMethod>,
}

/// Parameters the core passes to the authorization-code service when
/// persisting a new code.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationCodeParams {
    /// Redirection URI the code is bound to.
    pub redirect_uri: String,

    /// Scopes granted by the resource owner.
    pub scopes: Vec<String>,

    /// PKCE code challenge.
    pub code_challenge: String,

    /// PKCE transform the challenge was produced with.
    pub code_challenge_method: CodeChallengeMethod,
}

/// Authorization endpoint response parameters.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AuthorizationPayload {
    /// Authorization code response.
    Code {
        /// The issued authorization code.
        code: String,

        /// Echo of the request's `state`.
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    /// Implicit (token) response.
    Token {
        /// The issued token fields.
        #[serde(flatten)]
        response: TokenResponse,

        /// Echo of the request's `state`.
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
}

/// An authorization endpoint response: the parameters plus the response
/// mode the transport must deliver them in.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// Delivery mode for the parameters.
    #[serde(skip)]
    pub response_mode: ResponseMode,

    /// The response parameters.
    #[serde(flatten)]
    pub payload: AuthorizationPayload,
}
