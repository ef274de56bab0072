//! # Scope Handling
//!
//! Validation of requested scopes against the authorization server's
//! advertised scopes, and resolution against a client's allow-list.

use crate::oauth::types::{Client, Server};
use crate::oauth::{Error, Result};

/// Validate a requested `scope` parameter.
///
/// When present, the parameter is split on ASCII spaces; it must produce
/// at least one token and every token must be advertised by the server.
///
/// # Errors
///
/// `InvalidScope` naming the offending token, or an empty parameter.
pub fn check_requested_scope(server: &Server, scope: Option<&str>) -> Result<Option<Vec<String>>> {
    let Some(scope) = scope else {
        return Ok(None);
    };

    let tokens: Vec<String> =
        scope.split(' ').filter(|t| !t.is_empty()).map(ToString::to_string).collect();
    if tokens.is_empty() {
        return Err(Error::InvalidScope("empty scope parameter".to_string()));
    }
    for token in &tokens {
        if !server.scopes_supported.contains(token) {
            return Err(Error::InvalidScope(format!("unknown scope `{token}`")));
        }
    }
    Ok(Some(tokens))
}

/// Resolve the scopes to grant a client.
///
/// A present `scope` parameter is validated against the server, then
/// filtered to the tokens in the client's allow-list, preserving request
/// order. An absent parameter falls back to the server's default scope
/// (filtered the same way) or, when none is configured, the client's full
/// allow-list.
///
/// # Errors
///
/// `InvalidScope` from [`check_requested_scope`].
pub fn allowed_scopes(server: &Server, client: &Client, scope: Option<&str>) -> Result<Vec<String>> {
    if let Some(requested) = check_requested_scope(server, scope)? {
        return Ok(requested.into_iter().filter(|t| client.scopes.contains(t)).collect());
    }

    server.default_scope.as_ref().map_or_else(
        || Ok(client.scopes.clone()),
        |default| {
            Ok(default
                .split(' ')
                .filter(|t| !t.is_empty() && client.scopes.contains(&(*t).to_string()))
                .map(ToString::to_string)
                .collect())
        },
    )
}
