//! # Provider Traits
//!
//! The storage contracts the core calls. Implementers supply clients,
//! users, and token persistence; the core never stores anything itself.
//!
//! All operations are fallible with a generic error the core reports as
//! `server_error`, and return `None` (rather than an error) when a
//! resource does not exist.

use crate::oauth::types::{
    AccessToken, AuthorizationCode, AuthorizationCodeParams, Client, RefreshToken, User,
};

/// Result type for provider callbacks. Use the `anyhow::anyhow!` macro
/// (or any error implementing `std::error::Error`) to surface failures.
pub type Result<T> = anyhow::Result<T>;

/// Client registration lookups.
pub trait ClientStore: Send + Sync {
    /// Look a client up by its identifier.
    fn find_client(
        &self, client_id: &str,
    ) -> impl Future<Output = Result<Option<Client>>> + Send;
}

/// Resource owner lookups.
pub trait SubjectStore: Send + Sync {
    /// Authenticate a resource owner by credentials, returning `None`
    /// when the credentials are rejected.
    fn find_by_credentials(
        &self, username: &str, password: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Look a resource owner up by identifier.
    fn find_by_id(&self, id: &str) -> impl Future<Output = Result<Option<User>>> + Send;
}

/// Authorization code persistence.
pub trait AuthorizationCodeStore: Send + Sync {
    /// Persist a new authorization code for the client and resource
    /// owner.
    fn create_authorization_code(
        &self, params: &AuthorizationCodeParams, client: &Client, user: &User,
    ) -> impl Future<Output = Result<AuthorizationCode>> + Send;

    /// Look an authorization code up by its value.
    fn find_authorization_code(
        &self, code: &str,
    ) -> impl Future<Output = Result<Option<AuthorizationCode>>> + Send;

    /// Mark an authorization code revoked. Revocation is monotonic.
    fn revoke_authorization_code(&self, code: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Access token persistence.
pub trait AccessTokenStore: Send + Sync {
    /// Persist a new access token.
    fn create_access_token(
        &self, scopes: &[String], client: &Client, user: Option<&User>,
    ) -> impl Future<Output = Result<AccessToken>> + Send;

    /// Look an access token up by its value.
    fn find_access_token(
        &self, token: &str,
    ) -> impl Future<Output = Result<Option<AccessToken>>> + Send;

    /// Mark an access token revoked. Revocation is monotonic.
    fn revoke_access_token(&self, token: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Refresh token persistence.
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new refresh token.
    fn create_refresh_token(
        &self, scopes: &[String], client: &Client, user: &User,
    ) -> impl Future<Output = Result<RefreshToken>> + Send;

    /// Look a refresh token up by its value.
    fn find_refresh_token(
        &self, token: &str,
    ) -> impl Future<Output = Result<Option<RefreshToken>>> + Send;

    /// Mark a refresh token revoked. Revocation is monotonic.
    fn revoke_refresh_token(&self, token: &str) -> impl Future<Output = Result<()>> + Send;
}

/// The full set of services a grant or response-type handler may call.
///
/// Implementers opt in with an empty impl once the service traits are in
/// place:
///
/// ```rust,ignore
/// impl authcore::oauth::provider::Provider for MyProvider {}
/// ```
pub trait Provider:
    ClientStore
    + SubjectStore
    + AuthorizationCodeStore
    + AccessTokenStore
    + RefreshTokenStore
    + Clone
{
}
