//! Category pages.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use kh_core::forms::CategoryInput;
use kh_core::{CatalogError, FormErrors};
use tower_sessions::Session;
use uuid::Uuid;

use super::templates::*;
use super::{chrome, parse_id, see_other, unprocessable, HtmlTemplate, ListQuery};
use crate::auth::{push_flash, CurrentEmployee, FlashLevel};
use crate::error::ApiError;
use crate::state::AppState;

const ENTITY: &str = "Category";
const NAV: &str = "categories";

fn detail_url(id: impl std::fmt::Display) -> String {
    format!("/category/{}/", id)
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let result = state
        .catalog
        .list_categories(query.topic.as_deref(), query.pagination())
        .await?;
    let search = query.topic.clone().unwrap_or_default();
    let pager = Pager::new(&result, &[("topic", search.as_str())]);

    Ok(HtmlTemplate(CategoryListTemplate {
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
    let overview = state.catalog.category_detail(id).await?;
    let can_edit = current
        .authorization()
        .can_modify(overview.category.created_by);

    Ok(HtmlTemplate(CategoryDetailTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        overview,
        can_edit,
    })
    .into_response())
}

pub(super) async fn articles(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let (category, result) = state
        .catalog
        .category_articles(id, query.pagination())
        .await?;
    let pager = Pager::new(&result, &[]);

    Ok(HtmlTemplate(CategoryArticlesTemplate {
        chrome: chrome(&session, Some(&employee), NAV).await?,
        category,
        items: result.items,
        pager,
    })
    .into_response())
}

pub(super) async fn authors(
    State(state): State<AppState>,
    CurrentEmployee(employee): CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let (category, result) = state
        .catalog
        .category_authors(id, query.pagination())
        .await?;
    let pager = Pager::new(&result, &[]);

    Ok(HtmlTemplate(CategoryAuthorsTemplate {
        chrome: chrome(&session, Some(&employee), NAV).await?,
        category,
        items: result.items,
        pager,
    })
    .into_response())
}

async fn form_page(
    state: &AppState,
    session: &Session,
    current: &CurrentEmployee,
    id: Option<Uuid>,
    input: CategoryInput,
    errors: FormErrors,
) -> Result<CategoryFormTemplate, ApiError> {
    let knowledge_bases = state
        .catalog
        .knowledge_base_choices()
        .await?
        .into_iter()
        .map(|kb| Choice {
            selected: kb.id.to_string() == input.knowledge_base_id,
            value: kb.id.to_string(),
            label: kb.title,
        })
        .collect();
    let (heading, action, cancel_url) = match id {
        Some(id) => (
            "Update category",
            format!("/category/{}/update/", id),
            detail_url(id),
        ),
        None => (
            "Create category",
            "/category/create/".to_string(),
            "/category_list".to_string(),
        ),
    };

    Ok(CategoryFormTemplate {
        chrome: chrome(session, Some(&current.0), NAV).await?,
        heading,
        action,
        cancel_url,
        topic: input.topic,
        knowledge_bases,
        errors,
    })
}

/// `?knowledge_base=` preselects the parent on the create form.
#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct CreateQuery {
    #[serde(default)]
    knowledge_base: Option<String>,
}

pub(super) async fn create_form(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Query(query): Query<CreateQuery>,
) -> Result<Response, ApiError> {
    let input = CategoryInput {
        knowledge_base_id: query.knowledge_base.unwrap_or_default(),
        ..Default::default()
    };
    let page = form_page(&state, &session, &current, None, input, FormErrors::new()).await?;
    Ok(HtmlTemplate(page).into_response())
}

pub(super) async fn create(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Form(input): Form<CategoryInput>,
) -> Result<Response, ApiError> {
    match state
        .catalog
        .create_category(&current.authorization(), &input)
        .await
    {
        Ok(category) => Ok(see_other(&detail_url(category.id))),
        Err(CatalogError::Validation(errors)) => {
            let page = form_page(&state, &session, &current, None, input, errors).await?;
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
    let category = state
        .catalog
        .editable_category(&current.authorization(), id)
        .await?;
    let input = CategoryInput {
        topic: category.topic,
        knowledge_base_id: category.knowledge_base_id.to_string(),
    };
    let page = form_page(
        &state,
        &session,
        &current,
        Some(id),
        input,
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
    Form(input): Form<CategoryInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    match state
        .catalog
        .update_category(&current.authorization(), id, &input)
        .await
    {
        Ok(category) => Ok(see_other(&detail_url(category.id))),
        Err(CatalogError::Validation(errors)) => {
            let page = form_page(&state, &session, &current, Some(id), input, errors).await?;
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
    let category = state
        .catalog
        .editable_category(&current.authorization(), id)
        .await?;

    Ok(HtmlTemplate(ConfirmDeleteTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        kind: "category",
        name: category.topic,
        action: format!("/category/{}/delete/", id),
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
        .delete_category(&current.authorization(), id)
        .await
    {
        Ok(()) => Ok(see_other("/category_list")),
        Err(CatalogError::Conflict(message)) => {
            push_flash(&session, FlashLevel::Error, message).await?;
            Ok(see_other(&detail_url(id)))
        }
        Err(err) => Err(err.into()),
    }
}
