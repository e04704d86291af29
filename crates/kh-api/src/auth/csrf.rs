//! CSRF (Cross-Site Request Forgery) protection.
//!
//! Every session carries one token. Pages embed it in their forms and
//! [`verify_csrf`] rejects state-changing requests that do not echo it back.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::Rng;
use subtle::ConstantTimeEq;
use tower_sessions::Session;
use tracing::warn;

use crate::error::ApiError;

/// Session key holding the token.
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Form field carrying the token.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Header carrying the token for non-form requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Largest form body the check will buffer.
const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Generates a new CSRF token.
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Validates a CSRF token against the expected value.
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn validate_csrf_token(submitted: &str, expected: &str) -> bool {
    if submitted.len() != expected.len() {
        return false;
    }
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Returns the session's token, creating one on first use.
pub async fn session_csrf_token(session: &Session) -> Result<String, ApiError> {
    if let Some(token) = session.get::<String>(CSRF_SESSION_KEY).await? {
        return Ok(token);
    }
    let token = generate_csrf_token();
    session.insert(CSRF_SESSION_KEY, &token).await?;
    Ok(token)
}

/// The form field takes precedence over the header.
pub fn extract_csrf_from_form_or_header<'a>(
    form_token: Option<&'a str>,
    header_token: Option<&'a str>,
) -> Option<&'a str> {
    form_token.or(header_token)
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Middleware rejecting POSTs whose token does not match the session's.
///
/// Must run inside the session layer. Form bodies are buffered, inspected
/// and handed on unchanged.
pub async fn verify_csrf(request: Request, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return ApiError::CsrfValidationFailed.into_response();
    };
    let expected = match session.get::<String>(CSRF_SESSION_KEY).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            warn!(uri = %request.uri(), "POST without a CSRF token in session");
            return ApiError::CsrfValidationFailed.into_response();
        }
        Err(err) => return ApiError::from(err).into_response(),
    };

    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let (request, form_token) = if is_form(&request) {
        let (parts, body) = request.into_parts();
        let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return ApiError::BadRequest("Form body too large".to_string()).into_response()
            }
        };
        let token = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
            .ok()
            .and_then(|fields| {
                fields
                    .into_iter()
                    .find(|(name, _)| name == CSRF_FORM_FIELD)
                    .map(|(_, value)| value)
            });
        (Request::from_parts(parts, Body::from(bytes)), token)
    } else {
        (request, None)
    };

    let submitted =
        extract_csrf_from_form_or_header(form_token.as_deref(), header_token.as_deref());
    match submitted {
        Some(token) if validate_csrf_token(token, &expected) => next.run(request).await,
        _ => {
            warn!(uri = %request.uri(), "CSRF validation failed");
            ApiError::CsrfValidationFailed.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_csrf_token() {
        let token1 = generate_csrf_token();
        let token2 = generate_csrf_token();

        assert_eq!(token1.len(), 32);
        assert_ne!(token1, token2);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_validate_csrf_token() {
        let token = generate_csrf_token();
        assert!(validate_csrf_token(&token, &token));
        assert!(!validate_csrf_token(&token, &generate_csrf_token()));
        assert!(!validate_csrf_token(&token, "short"));
    }

    #[test]
    fn test_extract_csrf_priority() {
        assert_eq!(
            extract_csrf_from_form_or_header(Some("form"), Some("header")),
            Some("form")
        );
        assert_eq!(
            extract_csrf_from_form_or_header(None, Some("header")),
            Some("header")
        );
        assert_eq!(extract_csrf_from_form_or_header(None, None), None);
    }
}
