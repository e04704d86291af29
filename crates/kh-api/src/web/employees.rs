//! Employee directory and profiles.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use kh_core::auth::SessionData;
use kh_core::forms::EmployeeProfileInput;
use kh_core::{CatalogError, Employee, FormErrors};
use tower_sessions::Session;
use uuid::Uuid;

use super::templates::*;
use super::{chrome, parse_id, see_other, unprocessable, HtmlTemplate, ListQuery};
use crate::auth::{clear_session, set_session_data, CurrentEmployee};
use crate::error::ApiError;
use crate::state::AppState;

const ENTITY: &str = "Employee";
const NAV: &str = "employees";

/// `?filter=authors` limits the directory to employees with published articles.
const AUTHORS_FILTER: &str = "authors";

fn detail_url(id: impl std::fmt::Display) -> String {
    format!("/employee/{}/", id)
}

fn profile_input(employee: Employee) -> EmployeeProfileInput {
    EmployeeProfileInput {
        username: employee.username,
        email: employee.email,
        first_name: employee.first_name,
        last_name: employee.last_name,
        level: employee.level,
        project: employee.project,
        position: employee.position,
    }
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let filter = match query.filter.as_deref() {
        Some(AUTHORS_FILTER) => AUTHORS_FILTER,
        _ => "all",
    };
    let result = state
        .catalog
        .list_employees(
            query.query.as_deref(),
            filter == AUTHORS_FILTER,
            query.pagination(),
        )
        .await?;
    let search = query.query.clone().unwrap_or_default();
    let pager_filter = if filter == AUTHORS_FILTER { filter } else { "" };
    let pager = Pager::new(
        &result,
        &[("query", search.as_str()), ("filter", pager_filter)],
    );

    Ok(HtmlTemplate(EmployeeListTemplate {
        chrome: chrome(&session, Some(&employee), NAV).await?,
        items: result.items,
        pager,
        query: search,
        filter: filter.to_string(),
    })
    .into_response())
}

pub(super) async fn detail(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let profile = state
        .catalog
        .employee_profile(&current.authorization(), id, query.pagination())
        .await?;
    let pager = Pager::new(&profile.articles, &[]);

    Ok(HtmlTemplate(EmployeeDetailTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        profile,
        pager,
    })
    .into_response())
}

async fn form_page(
    session: &Session,
    current: &CurrentEmployee,
    id: Uuid,
    form: EmployeeProfileInput,
    errors: FormErrors,
) -> Result<EmployeeFormTemplate, ApiError> {
    Ok(EmployeeFormTemplate {
        chrome: chrome(session, Some(&current.0), NAV).await?,
        action: format!("/employee/{}/update/", id),
        cancel_url: detail_url(id),
        form,
        errors,
    })
}

pub(super) async fn update_form(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let employee = state
        .catalog
        .editable_employee(&current.authorization(), id)
        .await?;
    let page = form_page(
        &session,
        &current,
        id,
        profile_input(employee),
        FormErrors::new(),
    )
    .await?;
    Ok(HtmlTemplate(page).into_response())
}

pub(super) async fn update(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
    Form(input): Form<EmployeeProfileInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    match state
        .catalog
        .update_employee(&current.authorization(), id, &input)
        .await
    {
        Ok(employee) => {
            if employee.id == current.0.id {
                set_session_data(&session, SessionData::new(&employee)).await?;
            }
            Ok(see_other(&detail_url(employee.id)))
        }
        Err(CatalogError::Validation(errors)) => {
            let page = form_page(&session, &current, id, input, errors).await?;
            Ok(unprocessable(page))
        }
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn delete_confirm(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let employee = state
        .catalog
        .deletable_employee(&current.authorization(), id)
        .await?;

    Ok(HtmlTemplate(ConfirmDeleteTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        kind: "employee",
        name: employee.full_name(),
        action: format!("/employee/{}/delete/", id),
        cancel_url: detail_url(id),
    })
    .into_response())
}

pub(super) async fn delete(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let deleted = state
        .catalog
        .delete_employee(&current.authorization(), id)
        .await?;
    if deleted.id == current.0.id {
        clear_session(&session).await?;
        return Ok(see_other("/login"));
    }
    Ok(see_other("/employee_list/"))
}
