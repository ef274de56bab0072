//! # OAuth 2.0 Core
//!
//! The request-validation and token-issuance core of an OAuth 2.0
//! authorization server ([RFC6749]): per-grant contracts (authorization
//! code with PKCE, refresh token, resource owner password, client
//! credentials), response-type dispatch for the authorization endpoint,
//! scope resolution, and refresh-token rotation.
//!
//! # Design
//!
//! The core is transport-free. Callers authenticate the client upstream,
//! then hand the parsed request to [`grant::token`] or
//! [`authorize::authorize`] together with a [`provider::Provider`]
//! implementation supplying storage. Handlers validate parameters, drive
//! the provider in a specified order, and assemble the wire-shaped
//! response; one error closes the request.
//!
//! [RFC6749]: https://www.rfc-editor.org/rfc/rfc6749

pub mod authorize;
pub mod grant;
pub mod provider;
pub mod scope;
pub mod token;
pub mod types;

mod error;

pub use error::Error;

/// Result type for the OAuth 2.0 core.
pub type Result<T, E = Error> = std::result::Result<T, E>;
