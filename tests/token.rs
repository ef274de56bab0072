//! Token endpoint flows: grant contracts, code burn semantics, refresh
//! rotation, and the observable provider-call orderings.

mod provider;

use authcore::oauth::types::{GrantType, TokenRequest, TokenType};
use authcore::oauth::{Error, grant};
use provider::Provider;

fn code_request(code: &str, verifier: &str) -> TokenRequest {
    TokenRequest {
        grant_type: GrantType::AuthorizationCode,
        code: Some(code.to_string()),
        redirect_uri: Some(provider::REDIRECT_URI.to_string()),
        code_verifier: Some(verifier.to_string()),
        ..TokenRequest::default()
    }
}

// Happy-path authorization code exchange with a plain PKCE challenge. The
// client has no refresh_token grant, so no refresh token appears.
#[tokio::test]
async fn authorization_code_happy_path() {
    let provider = Provider::new();
    let auth_code = provider.seed_code("verifier", "plain", &["foo", "bar"]);

    let mut client = provider.client();
    client.grant_types = vec![GrantType::AuthorizationCode];

    let response = grant::token(
        &code_request(&auth_code.code, "verifier"),
        &client,
        &provider,
        &provider::server(),
    )
    .await
    .expect("should issue tokens");

    assert!(!response.access_token.is_empty());
    assert_eq!(response.token_type, TokenType::Bearer);
    assert!(response.expires_in > 0);
    assert_eq!(response.scope.as_deref(), Some("foo bar"));
    assert_eq!(response.refresh_token, None);

    // the code is consumed
    assert!(provider.stored_code(&auth_code.code).expect("should exist").is_revoked);
}

#[tokio::test]
async fn authorization_code_with_s256() {
    let provider = Provider::new();
    let verifier = authcore::core::pkce::code_verifier();
    let challenge = authcore::core::pkce::code_challenge(&verifier);
    let auth_code = provider.seed_code(&challenge, "S256", &["foo"]);

    let response = grant::token(
        &code_request(&auth_code.code, &verifier),
        &provider.client(),
        &provider,
        &provider::server(),
    )
    .await
    .expect("should issue tokens");

    // client allows refresh_token and the server issues them
    assert!(response.refresh_token.is_some());
}

#[tokio::test]
async fn authorization_code_call_order() {
    let provider = Provider::new();
    let auth_code = provider.seed_code("verifier", "plain", &["foo"]);
    provider.clear_journal();

    grant::token(
        &code_request(&auth_code.code, "verifier"),
        &provider.client(),
        &provider,
        &provider::server(),
    )
    .await
    .expect("should issue tokens");

    assert_eq!(
        provider.journal(),
        vec![
            "find_authorization_code",
            "revoke_authorization_code",
            "create_access_token",
            "create_refresh_token",
        ]
    );
}

// An authorization code is consumed at most once.
#[tokio::test]
async fn authorization_code_single_use() {
    let provider = Provider::new();
    let auth_code = provider.seed_code("verifier", "plain", &["foo"]);
    let request = code_request(&auth_code.code, "verifier");

    grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect("first exchange should succeed");

    let err = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect_err("second exchange should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));
}

// The code is burned on lookup: a failing PKCE check still consumes it.
#[tokio::test]
async fn authorization_code_burned_on_failure() {
    let provider = Provider::new();
    let auth_code = provider.seed_code("verifier", "plain", &["foo"]);

    let err = grant::token(
        &code_request(&auth_code.code, "wrong"),
        &provider.client(),
        &provider,
        &provider::server(),
    )
    .await
    .expect_err("mismatched verifier should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));

    assert!(provider.stored_code(&auth_code.code).expect("should exist").is_revoked);

    // a later request with the right verifier finds a revoked code
    let err = grant::token(
        &code_request(&auth_code.code, "verifier"),
        &provider.client(),
        &provider,
        &provider::server(),
    )
    .await
    .expect_err("burned code should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));
}

#[tokio::test]
async fn authorization_code_unknown_pkce_method() {
    let provider = Provider::new();
    let auth_code = provider.seed_code("verifier", "S512", &["foo"]);

    let err = grant::token(
        &code_request(&auth_code.code, "verifier"),
        &provider.client(),
        &provider,
        &provider::server(),
    )
    .await
    .expect_err("unknown method should fail");
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn authorization_code_redirect_must_match() {
    let provider = Provider::new();
    let auth_code = provider.seed_code("verifier", "plain", &["foo"]);

    let mut request = code_request(&auth_code.code, "verifier");
    request.redirect_uri = Some("https://evil.example.org/cb".to_string());

    let err = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect_err("mismatched redirect should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));
}

// With rotation enabled, presenting a refresh token revokes it and the
// revoke precedes the creation of its replacement.
#[tokio::test]
async fn refresh_token_rotation() {
    let provider = Provider::new();
    let refresh = provider.seed_refresh_token(&["foo", "bar"]);
    provider.clear_journal();

    let request = TokenRequest {
        grant_type: GrantType::RefreshToken,
        refresh_token: Some(refresh.token.clone()),
        ..TokenRequest::default()
    };
    let response = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect("should rotate");

    let rotated = response.refresh_token.expect("should issue a replacement");
    assert_ne!(rotated, refresh.token);
    assert!(provider.stored_refresh_token(&refresh.token).expect("should exist").is_revoked);

    assert_eq!(
        provider.journal(),
        vec![
            "find_refresh_token",
            "create_access_token",
            "revoke_refresh_token",
            "create_refresh_token",
        ]
    );
}

#[tokio::test]
async fn refresh_token_without_rotation() {
    let provider = Provider::new();
    let refresh = provider.seed_refresh_token(&["foo"]);
    provider.clear_journal();

    let mut server = provider::server();
    server.rotate_refresh_tokens = false;

    let request = TokenRequest {
        grant_type: GrantType::RefreshToken,
        refresh_token: Some(refresh.token.clone()),
        ..TokenRequest::default()
    };
    let response = grant::token(&request, &provider.client(), &provider, &server)
        .await
        .expect("should succeed");

    // the presented token is returned unchanged and stays valid
    assert_eq!(response.refresh_token.as_deref(), Some(refresh.token.as_str()));
    assert!(!provider.stored_refresh_token(&refresh.token).expect("should exist").is_revoked);
    assert_eq!(provider.journal(), vec!["find_refresh_token", "create_access_token"]);
}

#[tokio::test]
async fn refresh_token_scope_narrowing() {
    let provider = Provider::new();
    let refresh = provider.seed_refresh_token(&["foo", "bar"]);

    let mut request = TokenRequest {
        grant_type: GrantType::RefreshToken,
        refresh_token: Some(refresh.token.clone()),
        scope: Some("bar".to_string()),
        ..TokenRequest::default()
    };
    let response = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect("narrowing should succeed");
    assert_eq!(response.scope.as_deref(), Some("bar"));

    // a scope beyond the original grant is rejected
    let refresh = provider.seed_refresh_token(&["foo"]);
    request.refresh_token = Some(refresh.token);
    request.scope = Some("foo bar".to_string());
    let err = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect_err("widening should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));

    // an unknown scope fails scope validation first
    request.scope = Some("qux".to_string());
    let err = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect_err("unknown scope should fail");
    assert!(matches!(err, Error::InvalidScope(_)));
}

#[tokio::test]
async fn revoked_refresh_token_rejected() {
    let provider = Provider::new();
    let refresh = provider.seed_refresh_token(&["foo"]);

    let request = TokenRequest {
        grant_type: GrantType::RefreshToken,
        refresh_token: Some(refresh.token.clone()),
        ..TokenRequest::default()
    };
    grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect("first use should succeed");

    // rotation revoked the presented token
    let err = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect_err("replay should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));
}

#[tokio::test]
async fn password_grant() {
    let provider = Provider::new();

    let mut request = TokenRequest {
        grant_type: GrantType::Password,
        username: Some(provider::NORMAL_USER.to_string()),
        password: Some(provider::PASSWORD.to_string()),
        scope: Some("foo".to_string()),
        ..TokenRequest::default()
    };
    let response = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect("should issue tokens");
    assert_eq!(response.scope.as_deref(), Some("foo"));
    assert!(response.refresh_token.is_some());

    request.password = Some("wrong".to_string());
    let err = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect_err("bad credentials should fail");
    assert!(matches!(err, Error::InvalidGrant(_)));
}

// The token response never contains a refresh token for the client
// credentials grant.
#[tokio::test]
async fn client_credentials_never_issues_refresh_token() {
    let provider = Provider::new();

    let request =
        TokenRequest { grant_type: GrantType::ClientCredentials, ..TokenRequest::default() };
    let response = grant::token(&request, &provider.client(), &provider, &provider::server())
        .await
        .expect("should issue tokens");

    assert_eq!(response.refresh_token, None);
    // scopes default to the client's full allow-list
    assert_eq!(response.scope.as_deref(), Some("foo bar"));
}

#[tokio::test]
async fn grant_must_be_allowed_for_client() {
    let provider = Provider::new();
    let mut client = provider.client();
    client.grant_types = vec![GrantType::AuthorizationCode];

    let request =
        TokenRequest { grant_type: GrantType::ClientCredentials, ..TokenRequest::default() };
    let err = grant::token(&request, &client, &provider, &provider::server())
        .await
        .expect_err("disallowed grant should fail");
    assert!(matches!(err, Error::UnauthorizedClient(_)));
}

#[tokio::test]
async fn grant_must_be_supported_by_server() {
    let provider = Provider::new();
    let mut server = provider::server();
    server.grant_types_supported = vec![GrantType::AuthorizationCode];

    let request = TokenRequest { grant_type: GrantType::Password, ..TokenRequest::default() };
    let err = grant::token(&request, &provider.client(), &provider, &server)
        .await
        .expect_err("unsupported grant should fail");
    assert!(matches!(err, Error::UnsupportedGrantType(_)));
}
