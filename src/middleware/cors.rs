use axum::http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use tower_http::cors::{Any, CorsLayer};

/// CORS layer matching the platform's preflight contract: any origin, any
/// method, and the fixed header set the hosted clients send.
pub fn platform_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}
