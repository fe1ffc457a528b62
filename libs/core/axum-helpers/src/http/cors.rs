use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

pub const CORS_ALLOWED_ORIGIN: &str = "CORS_ALLOWED_ORIGIN";

/// CORS layer for the given origins.
///
/// Allows the methods the API exposes, the `Content-Type`, `Accept` and
/// `Authorization` headers, credentials, and caches preflights for an hour.
/// `Location` is exposed so browser clients can follow created resources.
pub fn create_cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::LOCATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Parse a comma-separated origin list, ignoring blanks.
pub fn parse_origins(raw: &str) -> io::Result<Vec<HeaderValue>> {
    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid {CORS_ALLOWED_ORIGIN} value: {e}"),
            )
        })?;

    if origins.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{CORS_ALLOWED_ORIGIN} cannot be empty"),
        ));
    }

    Ok(origins)
}

/// Build the CORS layer from the required `CORS_ALLOWED_ORIGIN` variable.
///
/// Examples:
/// - Development: `CORS_ALLOWED_ORIGIN=http://localhost:3000,http://localhost:5173`
/// - Production: `CORS_ALLOWED_ORIGIN=https://example.com`
pub fn cors_layer_from_env() -> io::Result<CorsLayer> {
    let raw = std::env::var(CORS_ALLOWED_ORIGIN).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{CORS_ALLOWED_ORIGIN} environment variable is required. Example: {CORS_ALLOWED_ORIGIN}=http://localhost:3000"
            ),
        )
    })?;

    let origins = parse_origins(&raw)?;
    info!(origins = %raw, "CORS configured");

    Ok(create_cors_layer(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_skips_blanks() {
        let origins = parse_origins(" http://localhost:3000, ,https://example.com ").unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");
        assert_eq!(origins[1], "https://example.com");
    }

    #[test]
    fn test_parse_origins_rejects_empty() {
        let err = parse_origins(" , ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_cors_layer_from_env_requires_variable() {
        temp_env::with_var_unset(CORS_ALLOWED_ORIGIN, || {
            let err = cors_layer_from_env().unwrap_err();
            assert!(err.to_string().contains(CORS_ALLOWED_ORIGIN));
        });
    }

    #[test]
    fn test_cors_layer_from_env_accepts_list() {
        temp_env::with_var(
            CORS_ALLOWED_ORIGIN,
            Some("http://localhost:3000,http://localhost:5173"),
            || {
                assert!(cors_layer_from_env().is_ok());
            },
        );
    }
}
