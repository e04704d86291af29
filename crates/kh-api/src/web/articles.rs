//! Article pages, including ratings and comments.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use kh_core::forms::{ArticleInput, CommentInput, RatingInput};
use kh_core::models::RATING_CHOICES;
use kh_core::{CatalogError, FormErrors};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use super::templates::*;
use super::{chrome, parse_id, see_other, unprocessable, HtmlTemplate, ListQuery};
use crate::auth::{push_flash, CurrentEmployee, FlashLevel};
use crate::error::ApiError;
use crate::state::AppState;

const ENTITY: &str = "Article";
const NAV: &str = "articles";

fn detail_url(id: impl std::fmt::Display) -> String {
    format!("/article/{}/", id)
}

pub(super) async fn list(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let result = state
        .catalog
        .list_articles(
            &current.authorization(),
            query.title.as_deref(),
            query.pagination(),
        )
        .await?;
    let search = query.title.clone().unwrap_or_default();
    let pager = Pager::new(&result, &[("title", search.as_str())]);

    Ok(HtmlTemplate(ArticleListTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
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
    let ctx = current.authorization();
    let detail = state.catalog.article_detail(&ctx, id).await?;

    let comments = detail
        .comments
        .iter()
        .cloned()
        .map(|view| CommentRow {
            can_edit: ctx.can_modify(Some(view.comment.commentator_id)),
            view,
        })
        .collect();
    let current_rating = detail.viewer_rating.as_ref().map(|r| r.rating);
    let rating_choices = RATING_CHOICES
        .iter()
        .map(|(value, label)| Choice {
            value: value.to_string(),
            label: format!("{} - {}", value, label),
            selected: current_rating == Some(*value),
        })
        .collect();

    Ok(HtmlTemplate(ArticleDetailTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        detail,
        comments,
        rating_choices,
    })
    .into_response())
}

/// Combined comment and rating form on the article page. The pressed
/// submit button decides which part is processed.
#[derive(Debug, Default, Deserialize)]
pub(super) struct FeedbackForm {
    #[serde(default)]
    submit_comment: Option<String>,
    #[serde(default)]
    submit_rating: Option<String>,
    #[serde(default)]
    commentary: String,
    #[serde(default)]
    rating: String,
}

pub(super) async fn feedback(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    let ctx = current.authorization();

    if form.submit_comment.is_some() {
        let input = CommentInput {
            commentary: form.commentary,
        };
        match state.catalog.add_comment(&ctx, id, &input).await {
            Ok(_) => {
                push_flash(
                    &session,
                    FlashLevel::Success,
                    "Your comment has been submitted.",
                )
                .await?
            }
            Err(CatalogError::Validation(_)) => {
                push_flash(&session, FlashLevel::Error, "Comment could not be posted.").await?
            }
            Err(err) => return Err(err.into()),
        }
    }

    if form.submit_rating.is_some() {
        let input = RatingInput {
            rating: form.rating,
        };
        match state.catalog.rate_article(&ctx, id, &input).await {
            Ok(_) => {
                push_flash(
                    &session,
                    FlashLevel::Success,
                    "Your rating has been submitted.",
                )
                .await?
            }
            Err(CatalogError::Validation(_)) => {
                push_flash(
                    &session,
                    FlashLevel::Error,
                    "Rating could not be submitted.",
                )
                .await?
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(see_other(&detail_url(id)))
}

async fn form_page(
    state: &AppState,
    session: &Session,
    current: &CurrentEmployee,
    id: Option<Uuid>,
    input: ArticleInput,
    errors: FormErrors,
) -> Result<ArticleFormTemplate, ApiError> {
    let categories = state
        .catalog
        .category_choices()
        .await?
        .into_iter()
        .map(|overview| Choice {
            selected: overview.category.id.to_string() == input.category_id,
            value: overview.category.id.to_string(),
            label: format!(
                "{} / {}",
                overview.knowledge_base_title, overview.category.topic
            ),
        })
        .collect();
    let (heading, action, cancel_url) = match id {
        Some(id) => (
            "Update article",
            format!("/article/{}/update/", id),
            detail_url(id),
        ),
        None => (
            "Create article",
            "/article_create".to_string(),
            "/article_list".to_string(),
        ),
    };

    Ok(ArticleFormTemplate {
        chrome: chrome(session, Some(&current.0), NAV).await?,
        heading,
        action,
        cancel_url,
        is_published: input.published(),
        title: input.title,
        content: input.content,
        categories,
        errors,
    })
}

/// `?category=` preselects the category on the create form.
#[derive(Debug, Default, Deserialize)]
pub(super) struct CreateQuery {
    #[serde(default)]
    category: Option<String>,
}

pub(super) async fn create_form(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Query(query): Query<CreateQuery>,
) -> Result<Response, ApiError> {
    let input = ArticleInput {
        category_id: query.category.unwrap_or_default(),
        ..Default::default()
    };
    let page = form_page(&state, &session, &current, None, input, FormErrors::new()).await?;
    Ok(HtmlTemplate(page).into_response())
}

pub(super) async fn create(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Form(input): Form<ArticleInput>,
) -> Result<Response, ApiError> {
    match state
        .catalog
        .create_article(&current.authorization(), &input)
        .await
    {
        Ok(article) => Ok(see_other(&detail_url(article.id))),
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
    let article = state
        .catalog
        .editable_article(&current.authorization(), id)
        .await?;
    let input = ArticleInput {
        title: article.title,
        content: article.content,
        category_id: article.category_id.to_string(),
        is_published: article.is_published.then(|| "on".to_string()),
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
    Form(input): Form<ArticleInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    match state
        .catalog
        .update_article(&current.authorization(), id, &input)
        .await
    {
        Ok(article) => Ok(see_other(&detail_url(article.id))),
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
    let article = state
        .catalog
        .editable_article(&current.authorization(), id)
        .await?;

    Ok(HtmlTemplate(ConfirmDeleteTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        kind: "article",
        name: article.title,
        action: format!("/article/{}/delete/", id),
        cancel_url: detail_url(id),
    })
    .into_response())
}

pub(super) async fn delete(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(ENTITY, &id)?;
    state
        .catalog
        .delete_article(&current.authorization(), id)
        .await?;
    Ok(see_other("/article_list"))
}

// ============================================
// Comments
// ============================================

fn comment_ids(article_id: &str, comment_id: &str) -> Result<(Uuid, Uuid), ApiError> {
    Ok((
        parse_id(ENTITY, article_id)?,
        parse_id("Comment", comment_id)?,
    ))
}

async fn comment_form_page(
    session: &Session,
    current: &CurrentEmployee,
    article_id: Uuid,
    comment_id: Uuid,
    commentary: String,
    errors: FormErrors,
) -> Result<CommentFormTemplate, ApiError> {
    Ok(CommentFormTemplate {
        chrome: chrome(session, Some(&current.0), NAV).await?,
        action: format!("/article/{}/comment/{}/update/", article_id, comment_id),
        cancel_url: detail_url(article_id),
        commentary,
        errors,
    })
}

pub(super) async fn comment_update_form(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path((article_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (article_id, comment_id) = comment_ids(&article_id, &comment_id)?;
    let comment = state
        .catalog
        .editable_comment(&current.authorization(), article_id, comment_id)
        .await?;
    let page = comment_form_page(
        &session,
        &current,
        article_id,
        comment_id,
        comment.commentary,
        FormErrors::new(),
    )
    .await?;
    Ok(HtmlTemplate(page).into_response())
}

pub(super) async fn comment_update(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path((article_id, comment_id)): Path<(String, String)>,
    Form(input): Form<CommentInput>,
) -> Result<Response, ApiError> {
    let (article_id, comment_id) = comment_ids(&article_id, &comment_id)?;
    match state
        .catalog
        .update_comment(&current.authorization(), article_id, comment_id, &input)
        .await
    {
        Ok(_) => Ok(see_other(&detail_url(article_id))),
        Err(CatalogError::Validation(errors)) => {
            let page = comment_form_page(
                &session,
                &current,
                article_id,
                comment_id,
                input.commentary,
                errors,
            )
            .await?;
            Ok(unprocessable(page))
        }
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn comment_delete_confirm(
    State(state): State<AppState>,
    current: CurrentEmployee,
    session: Session,
    Path((article_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (article_id, comment_id) = comment_ids(&article_id, &comment_id)?;
    let comment = state
        .catalog
        .editable_comment(&current.authorization(), article_id, comment_id)
        .await?;
    let name: String = comment.commentary.chars().take(80).collect();

    Ok(HtmlTemplate(ConfirmDeleteTemplate {
        chrome: chrome(&session, Some(&current.0), NAV).await?,
        kind: "comment",
        name,
        action: format!("/article/{}/comment/{}/delete/", article_id, comment_id),
        cancel_url: detail_url(article_id),
    })
    .into_response())
}

pub(super) async fn comment_delete(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path((article_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (article_id, comment_id) = comment_ids(&article_id, &comment_id)?;
    state
        .catalog
        .delete_comment(&current.authorization(), article_id, comment_id)
        .await?;
    Ok(see_other(&detail_url(article_id)))
}
