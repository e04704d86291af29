//! Server-rendered portal pages with Askama templates.

mod articles;
mod categories;
mod employees;
mod knowledge;
pub mod templates;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use kh_core::Employee;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::{session_csrf_token, take_flash, CurrentEmployee};
use crate::error::ApiError;
use crate::state::AppState;
use templates::*;

/// Creates the portal router.
pub fn create_web_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        // Knowledge bases
        .route("/knowledge_list", get(knowledge::list))
        .route(
            "/knowledge_base/create/",
            get(knowledge::create_form).post(knowledge::create),
        )
        .route("/knowledge_base/:id/", get(knowledge::detail))
        .route(
            "/knowledge_base/:id/update/",
            get(knowledge::update_form).post(knowledge::update),
        )
        .route(
            "/knowledge_base/:id/delete/",
            get(knowledge::delete_confirm).post(knowledge::delete),
        )
        .route(
            "/knowledge_base/:id/category_list/",
            get(knowledge::categories),
        )
        // Categories
        .route("/category_list", get(categories::list))
        .route(
            "/category/create/",
            get(categories::create_form).post(categories::create),
        )
        .route("/category/:id/", get(categories::detail))
        .route("/category/:id/article_list/", get(categories::articles))
        .route("/category/:id/author_list/", get(categories::authors))
        .route(
            "/category/:id/update/",
            get(categories::update_form).post(categories::update),
        )
        .route(
            "/category/:id/delete/",
            get(categories::delete_confirm).post(categories::delete),
        )
        // Articles and comments
        .route("/article_list", get(articles::list))
        .route(
            "/article_create",
            get(articles::create_form).post(articles::create),
        )
        .route(
            "/article/:id/",
            get(articles::detail).post(articles::feedback),
        )
        .route(
            "/article/:id/update/",
            get(articles::update_form).post(articles::update),
        )
        .route(
            "/article/:id/delete/",
            get(articles::delete_confirm).post(articles::delete),
        )
        .route(
            "/article/:id/comment/:comment_id/update/",
            get(articles::comment_update_form).post(articles::comment_update),
        )
        .route(
            "/article/:id/comment/:comment_id/delete/",
            get(articles::comment_delete_confirm).post(articles::comment_delete),
        )
        // Employees
        .route("/employee_list/", get(employees::list))
        .route("/employee/:id/", get(employees::detail))
        .route(
            "/employee/:id/update/",
            get(employees::update_form).post(employees::update),
        )
        .route(
            "/employee/:id/delete/",
            get(employees::delete_confirm).post(employees::delete),
        )
        .with_state(state)
}

// ============================================
// Page Handlers
// ============================================

/// Home page: site totals and leaders.
async fn home(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
) -> Result<Response, ApiError> {
    let site = state.catalog.site_statistics().await?;
    let top = state.catalog.top_statistics().await?;

    let template = HomeTemplate {
        chrome: chrome(&session, Some(&employee), "home").await?,
        site,
        top,
    };
    Ok(HtmlTemplate(template).into_response())
}

// ============================================
// Shared helpers
// ============================================

/// `?<search>=&page=` for list pages.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self) -> kh_core::db::Pagination {
        kh_core::db::Pagination::from_param(self.page.as_deref())
    }
}

/// Converts an employee to the navigation bar view.
fn employee_to_current_info(employee: &Employee) -> CurrentEmployeeInfo {
    CurrentEmployeeInfo {
        id: employee.id,
        username: employee.username.clone(),
        display_name: employee.full_name(),
        is_superuser: employee.is_superuser,
    }
}

/// Loads the layout data for a page and consumes pending flash messages.
pub(crate) async fn chrome(
    session: &Session,
    employee: Option<&Employee>,
    active_nav: &'static str,
) -> Result<Chrome, ApiError> {
    Ok(Chrome {
        active_nav,
        current_user: employee.map(employee_to_current_info),
        csrf_token: session_csrf_token(session).await?,
        messages: take_flash(session).await,
    })
}

/// Parses a path id. Anything that is not a UUID cannot exist.
pub(crate) fn parse_id(entity: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{} not found: {}", entity, raw)))
}

/// 303 redirect after a successful form post.
pub(crate) fn see_other(location: &str) -> Response {
    Redirect::to(location).into_response()
}

/// Re-renders a form that failed validation.
pub(crate) fn unprocessable<T: Template>(template: T) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, HtmlTemplate(template)).into_response()
}

// ============================================
// Template Response Wrapper
// ============================================

pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!("Template rendering error: {}", err);
                ApiError::Internal(format!("Template error: {}", err)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::{inject_test_employee, TestEmployee};
    use crate::server::ApiServer;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        middleware,
    };
    use kh_core::db::{create_pool, run_migrations};
    use kh_core::forms::{ArticleInput, CategoryInput, KnowledgeBaseInput, RegistrationInput};
    use kh_core::AuthorizationContext;
    use tower::ServiceExt;

    async fn setup_state() -> AppState {
        let pool = create_pool("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        run_migrations(&pool).await.expect("Failed to migrate");
        AppState::new(pool)
    }

    async fn register(state: &AppState, username: &str) -> Employee {
        state
            .catalog
            .register(&RegistrationInput {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: String::new(),
                last_name: String::new(),
                password1: "Knowledge1".to_string(),
                password2: "Knowledge1".to_string(),
                project: String::new(),
                position: "Engineer".to_string(),
                level: String::new(),
            })
            .await
            .expect("Failed to register")
    }

    /// Full application router acting as `employee`.
    fn app_as(state: &AppState, employee: Employee) -> Router {
        ApiServer::with_state(state.clone())
            .router()
            .layer(middleware::from_fn(move |req, next| {
                inject_test_employee(TestEmployee(employee.clone()), req, next)
            }))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, cookie: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn session_cookie(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("session cookie");
        raw.split(';').next().unwrap().to_string()
    }

    fn csrf_token(html: &str) -> String {
        let marker = "name=\"csrf_token\" value=\"";
        let start = html.find(marker).expect("csrf field") + marker.len();
        let end = html[start..].find('"').unwrap() + start;
        html[start..end].to_string()
    }

    /// Loads a page that holds a form and returns its session cookie and token.
    async fn open_form(app: &Router, uri: &str) -> (String, String) {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        let token = csrf_token(&body_text(response).await);
        (cookie, token)
    }

    fn encode(pairs: &[(&str, &str)]) -> String {
        serde_urlencoded::to_string(pairs).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_request_redirects_to_login() {
        let state = setup_state().await;
        let app = ApiServer::with_state(state).router();

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = app.oneshot(get("/article_list?page=2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?next=%2Farticle_list%3Fpage%3D2");
    }

    #[tokio::test]
    async fn test_health_reports_database() {
        let state = setup_state().await;
        let app = ApiServer::with_state(state).router();

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"]["connected"], true);
    }

    #[tokio::test]
    async fn test_home_page_renders_with_security_headers() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let app = app_as(&state, alice);

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.get(crate::middleware::REQUEST_ID_HEADER).is_some());

        let html = body_text(response).await;
        assert!(html.contains("Knowledge Hub"));
        assert!(html.contains("Nothing has been published yet."));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let app = app_as(&state, alice);

        let missing = format!("/article/{}/", Uuid::new_v4());
        let response = app.clone().oneshot(get(&missing)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/category/not-a-uuid/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_without_csrf_token_is_rejected() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let app = app_as(&state, alice);

        let (cookie, _) = open_form(&app, "/knowledge_base/create/").await;
        let response = app
            .oneshot(post_form(
                "/knowledge_base/create/",
                &cookie,
                encode(&[("title", "Runbooks")]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(state.catalog.knowledge_base_choices().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_create_knowledge_base_redirects_to_detail() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let app = app_as(&state, alice);

        let (cookie, token) = open_form(&app, "/knowledge_base/create/").await;
        let response = app
            .clone()
            .oneshot(post_form(
                "/knowledge_base/create/",
                &cookie,
                encode(&[("csrf_token", token.as_str()), ("title", "Runbooks")]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let created = state.catalog.knowledge_base_choices().await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(location(&response), format!("/knowledge_base/{}/", created[0].id));

        let response = app.oneshot(get(location(&response))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Runbooks"));
    }

    #[tokio::test]
    async fn test_invalid_form_is_rerendered() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let app = app_as(&state, alice);

        let (cookie, token) = open_form(&app, "/knowledge_base/create/").await;
        let response = app
            .oneshot(post_form(
                "/knowledge_base/create/",
                &cookie,
                encode(&[("csrf_token", token.as_str()), ("title", "   ")]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response)
            .await
            .contains("Title must be 1-255 characters."));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_open_article_editor() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let bob = register(&state, "bob").await;
        let ctx = AuthorizationContext::from_employee(&alice);

        let kb = state
            .catalog
            .create_knowledge_base(
                &ctx,
                &KnowledgeBaseInput {
                    title: "Ops".into(),
                },
            )
            .await
            .unwrap();
        let category = state
            .catalog
            .create_category(
                &ctx,
                &CategoryInput {
                    topic: "Deploys".into(),
                    knowledge_base_id: kb.id.to_string(),
                },
            )
            .await
            .unwrap();
        let article = state
            .catalog
            .create_article(
                &ctx,
                &ArticleInput {
                    title: "Rollbacks".into(),
                    content: "Revert the release tag.".into(),
                    category_id: category.id.to_string(),
                    is_published: Some("on".into()),
                },
            )
            .await
            .unwrap();

        let app = app_as(&state, bob);
        let response = app
            .clone()
            .oneshot(get(&format!("/article/{}/update/", article.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(get(&format!("/article/{}/", article.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Revert the release tag."));
        assert!(!html.contains(&format!("/article/{}/update/", article.id)));
    }

    #[tokio::test]
    async fn test_deleting_non_empty_knowledge_base_flashes_error() {
        let state = setup_state().await;
        let alice = register(&state, "alice").await;
        let ctx = AuthorizationContext::from_employee(&alice);
        let kb = state
            .catalog
            .create_knowledge_base(
                &ctx,
                &KnowledgeBaseInput {
                    title: "Ops".into(),
                },
            )
            .await
            .unwrap();
        state
            .catalog
            .create_category(
                &ctx,
                &CategoryInput {
                    topic: "Deploys".into(),
                    knowledge_base_id: kb.id.to_string(),
                },
            )
            .await
            .unwrap();

        let app = app_as(&state, alice);
        let delete_url = format!("/knowledge_base/{}/delete/", kb.id);
        let (cookie, token) = open_form(&app, &delete_url).await;
        let response = app
            .clone()
            .oneshot(post_form(
                &delete_url,
                &cookie,
                encode(&[("csrf_token", token.as_str())]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/knowledge_base/{}/", kb.id));

        let mut page = get(location(&response));
        page.headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let html = body_text(app.oneshot(page).await.unwrap()).await;
        assert!(html.contains("flash-error"));
        assert!(state.catalog.knowledge_base(kb.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_logs_the_new_employee_in() {
        let state = setup_state().await;
        let app = ApiServer::with_state(state.clone()).router();

        let (cookie, token) = open_form(&app, "/register/").await;
        let response = app
            .clone()
            .oneshot(post_form(
                "/register/",
                &cookie,
                encode(&[
                    ("csrf_token", token.as_str()),
                    ("username", "carol"),
                    ("email", "carol@example.com"),
                    ("first_name", "Carol"),
                    ("last_name", "Diaz"),
                    ("password1", "Knowledge1"),
                    ("password2", "Knowledge1"),
                    ("project", ""),
                    ("position", "Analyst"),
                    ("level", ""),
                ]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let cookie = session_cookie(&response);
        let mut home = get("/");
        home.headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        let response = app.oneshot(home).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Carol Diaz"));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let state = setup_state().await;
        register(&state, "dave").await;
        let app = ApiServer::with_state(state).router();

        let (cookie, token) = open_form(&app, "/login").await;
        let response = app
            .oneshot(post_form(
                "/login",
                &cookie,
                encode(&[
                    ("csrf_token", token.as_str()),
                    ("username", "dave"),
                    ("password", "wrong-password"),
                ]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
