//! Knowledge base pages.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use kh_core::forms::KnowledgeBaseInput;
use kh_core::{CatalogError, FormErrors};
use tower_sessions::Session;

use super::templates::*;
use super::{chrome, parse_id, see_other, unprocessable, HtmlTemplate, ListQuery};
use crate::auth::{push_flash, CurrentEmployee, FlashLevel};
use crate::error::ApiError;
use crate::state::AppState;

const ENTITY: &str = "Knowledge base";
const NAV: &str = "knowledge";

fn detail_url(id: impl std::fmt::Display) -> String {
    format!("/knowledge_base/{}/", id)
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let result = state
        .catalog
        .list_knowledge_bases(query.title.as_deref(), query.pagination())
        .await?;
    let search = query.title.clone().unwrap_or_default();
    let pager = Pager::new(&result, &[("title", search.as_str())]);

    Ok(HtmlTemplate(KnowledgeListTemplate {
        chrome: chrome(&session, Some(&employee), NAV).await?,
        items: result.items,
        pager,
        search,
    })
    .into_response())
}

pub(super) async fn detail(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let detail = state.catalog.knowledge_base_detail(id).await?;
    let can_edit = current
        .authorization()
        .can_modify(detail.knowledge_base.created_by);

    Ok(HtmlTemplate(KnowledgeDetailTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        detail,
        can_edit,
    })
    .into_response())
}

pub(super) async fn categories(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let (knowledge_base, result) = state
        .catalog
        .knowledge_base_categories(id, query.pagination())
        .await?;
    let pager = Pager::new(&result, &[]);

    Ok(HtmlTemplate(KnowledgeCategoriesTemplate {
        chrome: chrome(&session, Some(&employee), NAV).await?,
        knowledge_base,
        items: result.items,
        pager,
    })
    .into_response())
}

async fn form_page(
    session: &Session,
    current: &CurrentEmployee,
    id: Option<uuid::Uuid>,
    title: String,
    errors: FormErrors,
) -> Result<KnowledgeFormTemplate, ApiError> {
    let (heading, action, cancel_url) = match id {
        Some(id) => (
            "Update knowledge base",
            format!("/knowledge_base/{}/update/", id),
            detail_url(id),
        ),
        None => (
            "Create knowledge base",
            "/knowledge_base/create/".to_string(),
            "/knowledge_list".to_string(),
        ),
    };
    Ok(KnowledgeFormTemplate {
        chrome: chrome(session, Some(&current.0), NAV).await?,
        heading,
        action,
        cancel_url,
        title,
        errors,
    })
}

pub(super) async fn create_form(
    current: CurrentEmployee,
    session: Session,
) -> Result<Response, ApiError> {
    let page = form_page(&session, &current, None, String::new(), FormErrors::new()).await?;
    Ok(HtmlTemplate(page).into_response())
}

pub(super) async fn create(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Form(input): Form<KnowledgeBaseInput>,
) -> Result<Response, ApiError> {
    match state
        .catalog
        .create_knowledge_base(&current.authorization(), &input)
        .await
    {
        Ok(knowledge_base) => Ok(see_other(&detail_url(knowledge_base.id))),
        Err(CatalogError::Validation(errors)) => {
            let page = form_page(&session, &current, None, input.title, errors).await?;
            Ok(unprocessable(page))
        }
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn update_form(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let knowledge_base = state
        .catalog
        .editable_knowledge_base(&current.authorization(), id)
        .await?;
    let page = form_page(
        &session,
        &current,
        Some(id),
        knowledge_base.title,
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
    Form(input): Form<KnowledgeBaseInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    match state
        .catalog
        .update_knowledge_base(&current.authorization(), id, &input)
        .await
    {
        Ok(knowledge_base) => Ok(see_other(&detail_url(knowledge_base.id))),
        Err(CatalogError::Validation(errors)) => {
            let page = form_page(&session, &current, Some(id), input.title, errors).await?;
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
    let knowledge_base = state
        .catalog
        .editable_knowledge_base(&current.authorization(), id)
        .await?;

    Ok(HtmlTemplate(ConfirmDeleteTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        kind: "knowledge base",
        name: knowledge_base.title,
        action: format!("/knowledge_base/{}/delete/", id),
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
    match state
        .catalog
        .delete_knowledge_base(&current.authorization(), id)
        .await
    {
        Ok(()) => Ok(see_other("/knowledge_list")),
        Err(CatalogError::Conflict(message)) => {
            push_flash(&session, FlashLevel::Error, message).await?;
            Ok(see_other(&detail_url(id)))
        }
        Err(err) => Err(err.into()),
    }
}
