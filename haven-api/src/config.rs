//! API Configuration Module
//!
//! Configuration for CORS, uploads, the change broadcaster and object
//! storage. Everything is loaded from environment variables with defaults
//! suitable for development.

use std::time::Duration;

use haven_storage::S3Settings;

use crate::constants::{
    DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_S3_ENDPOINT, DEFAULT_S3_REGION,
    DEFAULT_S3_TIMEOUT_SECS, DEFAULT_WS_CAPACITY,
};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Per-file limit for multipart uploads.
    pub max_upload_bytes: usize,

    /// Outbound queue length per WebSocket subscriber.
    pub ws_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ws_capacity: DEFAULT_WS_CAPACITY,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `HAVEN_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `HAVEN_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `HAVEN_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `HAVEN_MAX_UPLOAD_BYTES`: Per-file upload limit (default: 5 MiB)
    /// - `HAVEN_WS_CAPACITY`: Per-subscriber queue length (default: 256)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("HAVEN_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("HAVEN_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: env_parse("HAVEN_CORS_MAX_AGE_SECS", DEFAULT_CORS_MAX_AGE_SECS),
            max_upload_bytes: env_parse("HAVEN_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            ws_capacity: env_parse("HAVEN_WS_CAPACITY", DEFAULT_WS_CAPACITY).max(1),
        }
    }
}

// ============================================================================
// OBJECT STORAGE CONFIGURATION
// ============================================================================

#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_S3_ENDPOINT.to_string(),
            region: DEFAULT_S3_REGION.to_string(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            timeout: Duration::from_secs(DEFAULT_S3_TIMEOUT_SECS),
        }
    }
}

impl StorageConfig {
    /// Environment variables:
    /// - `HAVEN_S3_ENDPOINT` (default: https://storage.yandexcloud.net)
    /// - `HAVEN_S3_REGION` (default: ru-central1)
    /// - `HAVEN_S3_BUCKET`
    /// - `HAVEN_S3_ACCESS_KEY_ID`
    /// - `HAVEN_S3_SECRET_ACCESS_KEY`
    /// - `HAVEN_S3_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("HAVEN_S3_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_S3_ENDPOINT.to_string()),
            region: std::env::var("HAVEN_S3_REGION")
                .unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            bucket: std::env::var("HAVEN_S3_BUCKET").unwrap_or_default(),
            access_key_id: std::env::var("HAVEN_S3_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: std::env::var("HAVEN_S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(env_parse(
                "HAVEN_S3_TIMEOUT_SECS",
                DEFAULT_S3_TIMEOUT_SECS,
            )),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }

    pub fn to_settings(&self) -> S3Settings {
        S3Settings {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            bucket: self.bucket.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            timeout: self.timeout,
        }
    }
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

pub fn is_production_environment() -> bool {
    std::env::var("HAVEN_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

/// Reject configurations that only make sense for local development.
pub fn validate_for_production(api: &ApiConfig, storage: &StorageConfig) -> ApiResult<()> {
    if api.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set HAVEN_CORS_ORIGINS.",
        ));
    }
    if storage.bucket.is_empty() || !storage.has_credentials() {
        return Err(ApiError::invalid_input(
            "Object storage is not configured for production. Set HAVEN_S3_BUCKET, \
             HAVEN_S3_ACCESS_KEY_ID and HAVEN_S3_SECRET_ACCESS_KEY.",
        ));
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_cors_origins_from_env() {
        let _guard = EnvVarGuard::set(
            "HAVEN_CORS_ORIGINS",
            Some("https://haven.example, ,https://admin.haven.example"),
        );
        let config = ApiConfig::from_env();
        assert_eq!(
            config.cors_origins,
            vec![
                "https://haven.example".to_string(),
                "https://admin.haven.example".to_string()
            ]
        );
    }

    #[test]
    fn test_production_requires_origins_and_storage() {
        let api = ApiConfig::default();
        let storage = StorageConfig::default();
        assert!(validate_for_production(&api, &storage).is_err());

        let api = ApiConfig {
            cors_origins: vec!["https://haven.example".to_string()],
            ..ApiConfig::default()
        };
        assert!(validate_for_production(&api, &storage).is_err());

        let storage = StorageConfig {
            bucket: "haven".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            ..StorageConfig::default()
        };
        assert!(validate_for_production(&api, &storage).is_ok());
    }

    #[test]
    fn test_storage_debug_redacts_secret() {
        let storage = StorageConfig {
            secret_access_key: "very-secret".to_string(),
            ..StorageConfig::default()
        };
        let debug = format!("{:?}", storage);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
