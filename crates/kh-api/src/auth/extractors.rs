//! Axum extractors for authentication.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use kh_core::{AuthorizationContext, Employee};
use tower_sessions::Session;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

use super::get_session_data;

/// Extractor for the logged-in employee.
///
/// Reads the session, then reloads the employee so that deactivated or
/// deleted accounts lose access immediately. Anonymous requests are
/// rejected with [`ApiError::Unauthorized`], which redirects to `/login`.
///
/// # Example
///
/// ```ignore
/// async fn profile(CurrentEmployee(employee): CurrentEmployee) -> String {
///     format!("Hello, {}!", employee.full_name())
/// }
/// ```
pub struct CurrentEmployee(pub Employee);

impl CurrentEmployee {
    /// Authorization context for catalog calls.
    pub fn authorization(&self) -> AuthorizationContext {
        AuthorizationContext::from_employee(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentEmployee
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        #[cfg(test)]
        {
            if let Some(test_employee) = parts.extensions.get::<super::test_helpers::TestEmployee>()
            {
                return Ok(CurrentEmployee(test_employee.0.clone()));
            }
        }

        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let unauthorized = || ApiError::Unauthorized { next: next.clone() };

        let app_state = AppState::from_ref(state);
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| unauthorized())?;
        let session_data = get_session_data(&session).await.ok_or_else(unauthorized)?;

        match app_state.catalog.employee(session_data.employee_id).await {
            Ok(employee) if employee.is_active => Ok(CurrentEmployee(employee)),
            Ok(_) => {
                debug!(employee_id = %session_data.employee_id, "Session for inactive employee");
                Err(unauthorized())
            }
            Err(err) if err.is_not_found() => {
                debug!(employee_id = %session_data.employee_id, "Session for deleted employee");
                Err(unauthorized())
            }
            Err(err) => Err(err.into()),
        }
    }
}
