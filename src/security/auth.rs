//! Token authentication and privilege checks.
//!
//! Tokens have the form `<user>.<priv_level>.<signature>` where the signature
//! is the hex SHA-256 of `secret:user:priv_level`. They are presented as
//! `Authorization: Bearer <token>`.

use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode};
use sha2::{Digest, Sha256};

use crate::http::handler::Middleware;
use crate::http::response;

/// Privilege level carried by a user. Higher means more access.
pub type PrivLevel = u32;

pub const PRIV_LEVEL_READ_ONLY: PrivLevel = 10;
pub const PRIV_LEVEL_OPERATIONS: PrivLevel = 20;
pub const PRIV_LEVEL_ADMIN: PrivLevel = 30;

/// The authenticated caller, attached to the request by the auth wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
    pub priv_level: PrivLevel,
}

/// Produces the authentication stage of a middleware chain.
pub trait Authenticator: Send + Sync {
    /// A middleware admitting only callers with at least `required`.
    fn wrapper(&self, required: PrivLevel) -> Middleware;
}

fn signature(secret: &str, username: &str, priv_level: PrivLevel) -> String {
    let digest = Sha256::new()
        .chain_update(secret.as_bytes())
        .chain_update(b":")
        .chain_update(username.as_bytes())
        .chain_update(b":")
        .chain_update(priv_level.to_string().as_bytes())
        .finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Mint a token for `username`.
pub fn sign_token(secret: &str, username: &str, priv_level: PrivLevel) -> String {
    format!("{username}.{priv_level}.{}", signature(secret, username, priv_level))
}

/// Check `token` against every secret in order.
pub fn verify_token<S: AsRef<str>>(secrets: &[S], token: &str) -> Option<CurrentUser> {
    let mut parts = token.rsplitn(3, '.');
    let sig = parts.next()?;
    let priv_level: PrivLevel = parts.next()?.parse().ok()?;
    let username = parts.next().filter(|u| !u.is_empty())?;

    secrets
        .iter()
        .any(|secret| signature(secret.as_ref(), username, priv_level) == sig)
        .then(|| CurrentUser {
            username: username.to_string(),
            priv_level,
        })
}

/// The bearer token in `headers`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Verifies signed bearer tokens against the configured secrets.
#[derive(Debug, Clone)]
pub struct SignedTokenAuth {
    secrets: Arc<[String]>,
}

impl SignedTokenAuth {
    pub fn new(secrets: Vec<String>) -> Self {
        Self {
            secrets: secrets.into(),
        }
    }
}

impl Authenticator for SignedTokenAuth {
    fn wrapper(&self, required: PrivLevel) -> Middleware {
        let secrets = Arc::clone(&self.secrets);
        Middleware::from_fn(move |mut req, next| {
            let user = bearer_token(req.headers()).and_then(|t| verify_token(&secrets[..], t));
            async move {
                let Some(user) = user else {
                    return response::error(StatusCode::UNAUTHORIZED, "Unauthorized, please log in.");
                };
                if user.priv_level < required {
                    tracing::debug!(
                        user = %user.username,
                        priv_level = user.priv_level,
                        required,
                        "Insufficient privilege"
                    );
                    return response::error(StatusCode::FORBIDDEN, "Forbidden.");
                }
                req.extensions_mut().insert(user);
                next.call(req).await
            }
        })
    }
}
