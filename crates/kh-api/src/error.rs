//! Web error types and their HTML rendering.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use kh_core::CatalogError;
use thiserror::Error;
use tracing::error;

/// Web layer error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (malformed input the forms cannot express).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No logged-in employee. Carries the path to return to after login.
    #[error("Login required")]
    Unauthorized { next: String },

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation conflicts with the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation failure outside of a re-rendered form.
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// CSRF token missing or wrong.
    #[error("CSRF validation failed")]
    CsrfValidationFailed,

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::SEE_OTHER,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::CsrfValidationFailed => StatusCode::FORBIDDEN,
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            ApiError::Session(_) => "SESSION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Heading shown on the error page.
    fn title(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "Page not found",
            ApiError::BadRequest(_) => "Bad request",
            ApiError::Unauthorized { .. } => "Login required",
            ApiError::Forbidden(_) | ApiError::CsrfValidationFailed => "Access denied",
            ApiError::Conflict(_) => "Conflict",
            ApiError::UnprocessableEntity(_) => "Invalid input",
            ApiError::Session(_) | ApiError::Internal(_) | ApiError::Database(_) => {
                "Something went wrong"
            }
        }
    }

    /// Message safe to show to the visitor. Server-side details stay in the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::UnprocessableEntity(msg) => msg.clone(),
            ApiError::Forbidden(_) => {
                "You do not have permission to perform this action.".to_string()
            }
            ApiError::CsrfValidationFailed => {
                "The form has expired or was not submitted from this site. \
                 Reload the page and try again."
                    .to_string()
            }
            ApiError::Unauthorized { .. } => "Please log in to continue.".to_string(),
            ApiError::Session(_) | ApiError::Internal(_) | ApiError::Database(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}

/// Builds the login URL that returns to `next` afterwards.
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        return "/login".to_string();
    }
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("/login?{}", query),
        Err(_) => "/login".to_string(),
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPageTemplate {
    status: u16,
    title: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Unauthorized { next } = &self {
            return Redirect::to(&login_url(next)).into_response();
        }

        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "Request failed");
        }

        let page = ErrorPageTemplate {
            status: status.as_u16(),
            title: self.title(),
            message: self.public_message(),
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                error!("Template rendering error: {}", err);
                (status, self.public_message()).into_response()
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CatalogError::Forbidden(denied) => ApiError::Forbidden(denied.to_string()),
            CatalogError::Validation(errors) => {
                let message = errors
                    .iter()
                    .flat_map(|(_, messages)| messages.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ");
                ApiError::UnprocessableEntity(message)
            }
            CatalogError::Conflict(msg) => ApiError::Conflict(msg),
            CatalogError::Database(db) => ApiError::Database(db.to_string()),
            CatalogError::Password(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::Session(err.to_string())
    }
}
