use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use std::env;
use tower_http::set_header::SetResponseHeaderLayer;

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Response headers added to every API response.
const API_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

#[derive(Debug, Clone, Copy)]
pub struct SecurityHeaders {
    include_hsts: bool,
}

impl SecurityHeaders {
    pub fn new(include_hsts: bool) -> Self {
        Self { include_hsts }
    }

    pub fn from_env() -> Self {
        let is_production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        if is_production {
            tracing::info!("Security: HSTS header enabled (production mode)");
        } else {
            tracing::info!("Security: HSTS header disabled (development mode)");
        }

        Self::new(is_production)
    }

    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers: Vec<(HeaderName, HeaderValue)> = API_HEADERS
            .iter()
            .map(|&(name, value)| {
                (
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect();

        // HSTS only makes sense behind HTTPS
        if self.include_hsts {
            headers.push((
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static(HSTS_VALUE),
            ));
        }
        headers
    }

    pub fn apply<S>(&self, mut router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        for (name, value) in self.headers() {
            router = router.layer(SetResponseHeaderLayer::overriding(name, value));
        }
        router
    }
}

pub fn create_security_headers_layer() -> SecurityHeaders {
    SecurityHeaders::from_env()
}
