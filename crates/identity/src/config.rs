//! Identity layer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `IDENTITY_HEADER` - HTTP header carrying the opaque session id
//! - `IDENTITY_TOKEN_SECRET` - Access token signing secret (min 32 chars,
//!   high entropy)
//!
//! ## Optional
//! - `IDENTITY_STORE_URL` - Key-value store connection URL
//!   (default: redis://127.0.0.1:6379)
//! - `IDENTITY_SESSION_TTL_SECS` - Sliding session expiry (default: 1800)
//! - `IDENTITY_TOKEN_TTL_SECS` - Access token lifetime (default: 900)
//! - `IDENTITY_SESSION_PREFIX` - Store key prefix for session records
//!   (default: sess)
//! - `IDENTITY_INTERNAL_HEADER` - Header used to forward caller identity to
//!   sibling services (default: x-wayfarer-caller)
//! - `IDENTITY_OPEN_PATHS` - Comma-separated diagnostic paths exempt from
//!   the identity header echo (default: /health)

use std::collections::HashMap;
use std::time::Duration;

use axum::http::HeaderName;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
const DEFAULT_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Identity layer configuration.
///
/// Construction validates everything that would otherwise fail on the first
/// request: header names must parse, the signing secret must be present and
/// strong. A service with a broken identity configuration must not come up.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Header carrying the opaque session id between client and server.
    pub identity_header: HeaderName,
    /// Header used to forward caller identity to sibling services.
    pub internal_header: HeaderName,
    /// Access token signing secret.
    pub token_secret: SecretString,
    /// Key-value store connection URL (may contain a password).
    pub store_url: SecretString,
    /// Sliding expiry applied to session records on every write.
    pub session_ttl: Duration,
    /// Access token lifetime.
    pub token_ttl: Duration,
    /// Store key prefix for session records.
    pub session_prefix: String,
    /// Request paths exempt from the identity header echo.
    pub open_paths: Vec<String>,
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the signing secret fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let identity_header = parse_header_name("IDENTITY_HEADER", &get_required_env("IDENTITY_HEADER")?)?;
        let internal_header = parse_header_name(
            "IDENTITY_INTERNAL_HEADER",
            &get_env_or_default("IDENTITY_INTERNAL_HEADER", "x-wayfarer-caller"),
        )?;

        let token_secret = get_validated_secret("IDENTITY_TOKEN_SECRET")?;
        validate_secret_length(&token_secret, "IDENTITY_TOKEN_SECRET")?;

        let store_url = SecretString::from(get_env_or_default(
            "IDENTITY_STORE_URL",
            "redis://127.0.0.1:6379",
        ));

        let session_ttl = Duration::from_secs(get_seconds_or_default(
            "IDENTITY_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?);
        let token_ttl = Duration::from_secs(get_seconds_or_default(
            "IDENTITY_TOKEN_TTL_SECS",
            DEFAULT_TOKEN_TTL_SECS,
        )?);

        let session_prefix = get_env_or_default("IDENTITY_SESSION_PREFIX", "sess");
        let open_paths = get_env_or_default("IDENTITY_OPEN_PATHS", "/health")
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            identity_header,
            internal_header,
            token_secret,
            store_url,
            session_ttl,
            token_ttl,
            session_prefix,
            open_paths,
        })
    }

    /// Whether a request path is exempt from the identity header echo.
    #[must_use]
    pub fn is_open_path(&self, path: &str) -> bool {
        self.open_paths.iter().any(|p| p == path)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a duration-in-seconds environment variable with a default.
fn get_seconds_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Parse a header name, rejecting values http would refuse at request time.
fn parse_header_name(var_name: &str, value: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(value.as_bytes())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-signing-key-here", "TEST_VAR");
        assert!(matches!(
            result,
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(
            result,
            Err(ConfigError::InsecureSecret(_, _))
        ));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_secret_length(&secret, "TEST_SECRET").is_err());
    }

    #[test]
    fn test_parse_header_name_rejects_invalid() {
        assert!(parse_header_name("IDENTITY_HEADER", "bad header\n").is_err());
        assert!(parse_header_name("IDENTITY_HEADER", "Identity").is_ok());
    }

    #[test]
    fn test_is_open_path() {
        let config = test_support::config();
        assert!(config.is_open_path("/health"));
        assert!(!config.is_open_path("/cart"));
        assert!(!config.is_open_path("/health/deep"));
    }
}
