use axum::http::{header, HeaderValue, Method};
use std::env;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer() -> CorsLayer {
    let origins_str =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());

    CorsLayer::new()
        .allow_origin(parse_origins(&origins_str))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

/// Credentialed CORS cannot use a wildcard origin, so an empty or fully
/// invalid list falls back to the local frontend defaults.
fn parse_origins(origins_str: &str) -> AllowOrigin {
    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, falling back to defaults");
        return AllowOrigin::list(
            DEFAULT_ALLOWED_ORIGINS
                .split(',')
                .map(HeaderValue::from_static),
        );
    }

    tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
    AllowOrigin::list(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cors_layer() {
        let _layer = create_cors_layer();
    }

    #[test]
    fn test_default_origins_are_valid() {
        for origin in DEFAULT_ALLOWED_ORIGINS.split(',') {
            assert!(
                origin.trim().parse::<HeaderValue>().is_ok(),
                "Default origin '{}' should be a valid HeaderValue",
                origin
            );
        }
    }
}
