//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check secrets are present before anything can be signed or logged
//! - Validate addresses and the legacy backend URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one secret is required")]
    NoSecrets,

    #[error("secret #{0} is empty")]
    EmptySecret(usize),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("invalid legacy url {0:?}")]
    InvalidLegacyUrl(String),

    #[error("legacy routes {0:?} configured without a legacy url")]
    LegacyRoutesWithoutBackend(Vec<u64>),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.secrets.is_empty() {
        errors.push(ValidationError::NoSecrets);
    }
    for (i, secret) in config.secrets.iter().enumerate() {
        if secret.is_empty() {
            errors.push(ValidationError::EmptySecret(i));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    // The legacy client speaks plain HTTP only.
    match &config.legacy.url {
        Some(raw) => {
            let valid = url::Url::parse(raw)
                .map(|u| u.scheme() == "http" && u.host().is_some())
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::InvalidLegacyUrl(raw.clone()));
            }
        }
        None if !config.routing.legacy_routes.is_empty() => {
            errors.push(ValidationError::LegacyRoutesWithoutBackend(
                config.routing.legacy_routes.clone(),
            ));
        }
        None => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
