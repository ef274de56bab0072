//! # Random Value Generation
//!
//! Generators for the opaque, URL-safe values handed out by the
//! authorization server: authorization codes, access tokens, and refresh
//! tokens.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generate an authorization code.
#[must_use]
pub fn authorization_code() -> String {
    random_string(24)
}

/// Generate an access token.
#[must_use]
pub fn access_token() -> String {
    random_string(32)
}

/// Generate a refresh token.
#[must_use]
pub fn refresh_token() -> String {
    random_string(32)
}

/// Generate a random alphanumeric string of the requested length.
#[must_use]
pub fn random_string(len: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expected_length() {
        assert_eq!(authorization_code().len(), 24);
        assert_eq!(access_token().len(), 32);
    }

    #[test]
    fn url_safe() {
        let token = refresh_token();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
