//! # Core Utilities
//!
//! Cross-cutting helpers shared by the ASN.1, JOSE, and OAuth 2.0 layers.

pub mod generate;
pub mod pkce;
