//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0)
//! - Flag a default destination that is not an absolute URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - A relative default destination is legal in a `Location` header, so it only warns

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mappings path must not be empty")]
    EmptyMappingsPath,
    #[error("request timeout must be at least 1 second")]
    ZeroRequestTimeout,
    #[error("shutdown grace period must be at least 1 second")]
    ZeroShutdownGrace,
    #[error("default URL {0:?} cannot be sent in a Location header")]
    InvalidDefaultUrl(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.mappings_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyMappingsPath);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.timeouts.shutdown_grace_secs == 0 {
        errors.push(ValidationError::ZeroShutdownGrace);
    }

    if let Some(url) = config.default_destination() {
        if axum::http::HeaderValue::from_bytes(url.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidDefaultUrl(url.to_string()));
        } else if url::Url::parse(url).is_err() {
            tracing::warn!(default_url = %url, "Default URL is not absolute; clients will resolve it relative to the request");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
