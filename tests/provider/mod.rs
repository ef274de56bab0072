//! In-memory provider for exercising the grant and response-type
//! handlers. Every service call is appended to a journal so tests can
//! assert the observable invocation order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use authcore::core::generate;
use authcore::oauth::provider::{
    AccessTokenStore, AuthorizationCodeStore, ClientStore, RefreshTokenStore, Result,
    SubjectStore,
};
use authcore::oauth::types::{
    AccessToken, AuthorizationCode, AuthorizationCodeParams, Client, GrantType, RefreshToken,
    ResponseType, Server, TokenType, User,
};
use chrono::{TimeDelta, Utc};

pub const CLIENT_ID: &str = "s6BhdRkqt3";
pub const REDIRECT_URI: &str = "https://client.example.org/cb";
pub const NORMAL_USER: &str = "normal_user";
pub const PASSWORD: &str = "correct horse battery staple";

#[derive(Clone, Default)]
pub struct Provider {
    clients: Arc<Mutex<HashMap<String, Client>>>,
    users: Arc<Mutex<HashMap<String, (String, User)>>>,
    codes: Arc<Mutex<HashMap<String, AuthorizationCode>>>,
    access_tokens: Arc<Mutex<HashMap<String, AccessToken>>>,
    refresh_tokens: Arc<Mutex<HashMap<String, RefreshToken>>>,
    journal: Arc<Mutex<Vec<&'static str>>>,
}

impl Provider {
    pub fn new() -> Self {
        let provider = Self::default();

        let client = Client {
            client_id: CLIENT_ID.to_string(),
            client_secret: Some("secret".to_string()),
            redirect_uris: vec![REDIRECT_URI.to_string()],
            grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::Password,
                GrantType::ClientCredentials,
            ],
            response_types: vec![ResponseType::Code, ResponseType::Token],
            scopes: vec!["foo".to_string(), "bar".to_string()],
        };
        provider.clients.lock().expect("should lock").insert(CLIENT_ID.to_string(), client);

        let user = User { id: NORMAL_USER.to_string() };
        provider
            .users
            .lock()
            .expect("should lock")
            .insert(NORMAL_USER.to_string(), (PASSWORD.to_string(), user));

        provider
    }

    pub fn client(&self) -> Client {
        self.clients.lock().expect("should lock")[CLIENT_ID].clone()
    }

    pub fn user(&self) -> User {
        self.users.lock().expect("should lock")[NORMAL_USER].1.clone()
    }

    pub fn journal(&self) -> Vec<&'static str> {
        self.journal.lock().expect("should lock").clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().expect("should lock").clear();
    }

    fn record(&self, call: &'static str) {
        self.journal.lock().expect("should lock").push(call);
    }

    /// Insert an authorization code as if a prior authorization request
    /// had persisted it.
    pub fn seed_code(
        &self, challenge: &str, method: &str, scopes: &[&str],
    ) -> AuthorizationCode {
        let auth_code = AuthorizationCode {
            code: generate::authorization_code(),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
            code_challenge: challenge.to_string(),
            code_challenge_method: method.to_string(),
            issued_at: Utc::now(),
            valid_after: Utc::now(),
            expires_at: Utc::now() + TimeDelta::minutes(10),
            is_revoked: false,
            client: self.client(),
            user: self.user(),
        };
        self.codes
            .lock()
            .expect("should lock")
            .insert(auth_code.code.clone(), auth_code.clone());
        auth_code
    }

    /// Insert a refresh token as if a prior token response had issued it.
    pub fn seed_refresh_token(&self, scopes: &[&str]) -> RefreshToken {
        let refresh = RefreshToken {
            token: generate::refresh_token(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
            issued_at: Utc::now(),
            valid_after: Utc::now(),
            expires_at: Utc::now() + TimeDelta::days(30),
            is_revoked: false,
            client: self.client(),
            user: self.user(),
        };
        self.refresh_tokens
            .lock()
            .expect("should lock")
            .insert(refresh.token.clone(), refresh.clone());
        refresh
    }

    pub fn stored_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.lock().expect("should lock").get(code).cloned()
    }

    pub fn stored_refresh_token(&self, token: &str) -> Option<RefreshToken> {
        self.refresh_tokens.lock().expect("should lock").get(token).cloned()
    }
}

impl authcore::oauth::provider::Provider for Provider {}

impl ClientStore for Provider {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        self.record("find_client");
        Ok(self.clients.lock().expect("should lock").get(client_id).cloned())
    }
}

impl SubjectStore for Provider {
    async fn find_by_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.record("find_by_credentials");
        let users = self.users.lock().expect("should lock");
        Ok(users
            .get(username)
            .filter(|(stored, _)| stored == password)
            .map(|(_, user)| user.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.record("find_by_id");
        Ok(self.users.lock().expect("should lock").get(id).map(|(_, user)| user.clone()))
    }
}

impl AuthorizationCodeStore for Provider {
    async fn create_authorization_code(
        &self, params: &AuthorizationCodeParams, client: &Client, user: &User,
    ) -> Result<AuthorizationCode> {
        self.record("create_authorization_code");
        let auth_code = AuthorizationCode {
            code: generate::authorization_code(),
            redirect_uri: params.redirect_uri.clone(),
            scopes: params.scopes.clone(),
            code_challenge: params.code_challenge.clone(),
            code_challenge_method: params.code_challenge_method.to_string(),
            issued_at: Utc::now(),
            valid_after: Utc::now(),
            expires_at: Utc::now() + TimeDelta::minutes(10),
            is_revoked: false,
            client: client.clone(),
            user: user.clone(),
        };
        self.codes
            .lock()
            .expect("should lock")
            .insert(auth_code.code.clone(), auth_code.clone());
        Ok(auth_code)
    }

    async fn find_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        self.record("find_authorization_code");
        Ok(self.codes.lock().expect("should lock").get(code).cloned())
    }

    async fn revoke_authorization_code(&self, code: &str) -> Result<()> {
        self.record("revoke_authorization_code");
        if let Some(auth_code) = self.codes.lock().expect("should lock").get_mut(code) {
            auth_code.is_revoked = true;
        }
        Ok(())
    }
}

impl AccessTokenStore for Provider {
    async fn create_access_token(
        &self, scopes: &[String], client: &Client, user: Option<&User>,
    ) -> Result<AccessToken> {
        self.record("create_access_token");
        let access = AccessToken {
            token: generate::access_token(),
            token_type: TokenType::Bearer,
            scopes: scopes.to_vec(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + TimeDelta::hours(1),
            client: client.clone(),
            user: user.cloned(),
            refresh_token: None,
        };
        self.access_tokens
            .lock()
            .expect("should lock")
            .insert(access.token.clone(), access.clone());
        Ok(access)
    }

    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>> {
        self.record("find_access_token");
        Ok(self.access_tokens.lock().expect("should lock").get(token).cloned())
    }

    async fn revoke_access_token(&self, token: &str) -> Result<()> {
        self.record("revoke_access_token");
        self.access_tokens.lock().expect("should lock").remove(token);
        Ok(())
    }
}

impl RefreshTokenStore for Provider {
    async fn create_refresh_token(
        &self, scopes: &[String], client: &Client, user: &User,
    ) -> Result<RefreshToken> {
        self.record("create_refresh_token");
        let refresh = RefreshToken {
            token: generate::refresh_token(),
            scopes: scopes.to_vec(),
            issued_at: Utc::now(),
            valid_after: Utc::now(),
            expires_at: Utc::now() + TimeDelta::days(30),
            is_revoked: false,
            client: client.clone(),
            user: user.clone(),
        };
        self.refresh_tokens
            .lock()
            .expect("should lock")
            .insert(refresh.token.clone(), refresh.clone());
        Ok(refresh)
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        self.record("find_refresh_token");
        Ok(self.refresh_tokens.lock().expect("should lock").get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<()> {
        self.record("revoke_refresh_token");
        if let Some(refresh) = self.refresh_tokens.lock().expect("should lock").get_mut(token) {
            refresh.is_revoked = true;
        }
        Ok(())
    }
}

/// Server settings matching the seeded client.
pub fn server() -> Server {
    Server {
        scopes_supported: vec!["foo".to_string(), "bar".to_string(), "baz".to_string()],
        default_scope: None,
        grant_types_supported: vec![
            GrantType::AuthorizationCode,
            GrantType::RefreshToken,
            GrantType::Password,
            GrantType::ClientCredentials,
        ],
        response_types_supported: vec![ResponseType::Code, ResponseType::Token],
        rotate_refresh_tokens: true,
        issue_refresh_tokens: true,
    }
}
