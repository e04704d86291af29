//! Authentication routes: login, logout, registration and password change.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use kh_core::auth::SessionData;
use kh_core::forms::{LoginInput, PasswordChangeInput, RegistrationInput};
use kh_core::{CatalogError, Employee, FormErrors};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::auth::{clear_session, safe_next, set_session_data, CurrentEmployee};
use crate::error::ApiError;
use crate::state::AppState;
use crate::web::templates::Chrome;
use crate::web::{chrome, see_other, unprocessable, HtmlTemplate};

/// Login page template.
#[derive(Template)]
#[template(path = "registration/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

/// Sign-up page template.
#[derive(Template)]
#[template(path = "registration/register.html")]
pub struct RegisterTemplate {
    pub chrome: Chrome,
    pub form: RegistrationInput,
    pub errors: FormErrors,
}

/// Password change form template.
#[derive(Template)]
#[template(path = "registration/password_change.html")]
pub struct PasswordChangeTemplate {
    pub chrome: Chrome,
    pub errors: FormErrors,
}

/// Password change confirmation template.
#[derive(Template)]
#[template(path = "registration/password_change_done.html")]
pub struct PasswordChangeDoneTemplate {
    pub chrome: Chrome,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// Creates the auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        .route("/register/", get(register_page).post(register_submit))
        .route(
            "/password-change/",
            get(password_change_page).post(password_change_submit),
        )
        .route("/password-change/done/", get(password_change_done))
}

/// Binds the session to `employee`, issuing a fresh session id.
async fn log_in(session: &Session, employee: &Employee) -> Result<(), ApiError> {
    if let Err(e) = session.cycle_id().await {
        warn!("Failed to regenerate session ID: {}", e);
    }
    set_session_data(session, SessionData::new(employee)).await?;
    Ok(())
}

/// Renders the login page.
async fn login_page(
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    Ok(HtmlTemplate(LoginTemplate {
        chrome: chrome(&session, None, "login").await?,
        username: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        errors: FormErrors::new(),
    })
    .into_response())
}

/// Handles login form submission.
async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<LoginInput>,
) -> Result<Response, ApiError> {
    let next = safe_next(input.next.as_deref()).to_string();
    match state.catalog.authenticate(&input).await {
        Ok(employee) => {
            log_in(&session, &employee).await?;
            Ok(see_other(&next))
        }
        Err(CatalogError::Validation(errors)) => Ok(unprocessable(LoginTemplate {
            chrome: chrome(&session, None, "login").await?,
            username: input.username,
            next,
            errors,
        })),
        Err(err) => Err(err.into()),
    }
}

/// Handles logout.
async fn logout(session: Session) -> Result<Response, ApiError> {
    if let Some(data) = crate::auth::get_session_data(&session).await {
        info!(employee_id = %data.employee_id, "Employee logged out");
    }
    clear_session(&session).await?;
    Ok(see_other("/login"))
}

async fn register_page(session: Session) -> Result<Response, ApiError> {
    Ok(HtmlTemplate(RegisterTemplate {
        chrome: chrome(&session, None, "register").await?,
        form: RegistrationInput::default(),
        errors: FormErrors::new(),
    })
    .into_response())
}

/// Creates the account and logs the new employee in.
async fn register_submit(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<RegistrationInput>,
) -> Result<Response, ApiError> {
    match state.catalog.register(&input).await {
        Ok(employee) => {
            log_in(&session, &employee).await?;
            Ok(see_other("/"))
        }
        Err(CatalogError::Validation(errors)) => {
            let form = RegistrationInput {
                password1: String::new(),
                password2: String::new(),
                ..input
            };
            Ok(unprocessable(RegisterTemplate {
                chrome: chrome(&session, None, "register").await?,
                form,
                errors,
            }))
        }
        Err(err) => Err(err.into()),
    }
}

async fn password_change_page(
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
) -> Result<Response, ApiError> {
    Ok(HtmlTemplate(PasswordChangeTemplate {
        chrome: chrome(&session, Some(&employee), "account").await?,
        errors: FormErrors::new(),
    })
    .into_response())
}

async fn password_change_submit(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Form(input): Form<PasswordChangeInput>,
) -> Result<Response, ApiError> {
    match state
        .catalog
        .change_password(&current.authorization(), &input)
        .await
    {
        Ok(()) => Ok(see_other("/password-change/done/")),
        Err(CatalogError::Validation(errors)) => Ok(unprocessable(PasswordChangeTemplate {
            chrome: chrome(&session, Some(&current.0), "account").await?,
            errors,
        })),
        Err(err) => Err(err.into()),
    }
}

async fn password_change_done(
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
) -> Result<Response, ApiError> {
    Ok(HtmlTemplate(PasswordChangeDoneTemplate {
        chrome: chrome(&session, Some(&employee), "account").await?,
    })
    .into_response())
}
