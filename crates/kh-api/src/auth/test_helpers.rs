//! Test helpers for authentication.
//!
//! Lets router tests act as a given employee without going through the
//! login form.

use axum::{extract::Request, middleware::Next, response::Response};
use kh_core::Employee;

/// Extension type for injecting a test employee into requests.
#[derive(Clone)]
pub struct TestEmployee(pub Employee);

/// Middleware that injects a test employee into the request extensions.
///
/// ```ignore
/// let router = server.router().layer(middleware::from_fn_with_state(
///     TestEmployee(employee),
///     inject_test_employee,
/// ));
/// ```
pub async fn inject_test_employee(
    test_employee: TestEmployee,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(test_employee);
    next.run(request).await
}
