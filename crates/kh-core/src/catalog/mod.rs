//! Access-controlled operations for the portal.
//!
//! [`Catalog`] is what the web layer calls. Every operation validates its
//! input, checks the caller's [`AuthorizationContext`] and then talks to the
//! repositories. Each call is its own unit of work against the store; no
//! state is kept between calls.
//!
//! ## Authorization
//!
//! Mutations take an `AuthorizationContext`:
//! - knowledge bases, categories, articles and comments: owner or superuser
//! - employee profiles: the employee themselves or a superuser
//! - employee deletion: superusers only
//!
//! Unpublished articles are reported as not found to anyone but their
//! author and superusers.

mod articles;
mod employees;
mod knowledge;

pub use articles::ArticleDetail;
pub use employees::EmployeeProfile;
pub use knowledge::KnowledgeBaseDetail;

use crate::auth::password::PasswordError;
use crate::auth::AuthorizationError;
use crate::db::{
    create_article_repository, create_category_repository, create_comment_repository,
    create_employee_repository, create_knowledge_base_repository, create_rating_repository,
    create_stats_repository, ArticleRepository, CategoryRepository, CommentRepository, DbError,
    DbPool, EmployeeRepository, KnowledgeBaseRepository, RatingRepository, StatsRepository,
};
use crate::stats::{SiteStatistics, TopStatistics};
use crate::validation::FormErrors;
use thiserror::Error;
use tracing::instrument;

pub(crate) const UNKNOWN_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Errors returned by catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Forbidden(#[from] AuthorizationError),

    #[error("Invalid input: {0}")]
    Validation(#[from] FormErrors),

    /// The operation conflicts with current state, e.g. deleting a
    /// knowledge base that still has categories.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(DbError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl CatalogError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        CatalogError::Validation(FormErrors::single(field, message))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, CatalogError::Forbidden(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Conflict(_))
    }

    /// Field errors, for validation failures.
    pub fn form_errors(&self) -> Option<&FormErrors> {
        match self {
            CatalogError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<DbError> for CatalogError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } if entity != "unknown" => CatalogError::NotFound {
                entity: entity_name(&entity),
                id,
            },
            other => CatalogError::Database(other),
        }
    }
}

fn entity_name(entity: &str) -> &'static str {
    match entity {
        "KnowledgeBase" => "Knowledge base",
        "Category" => "Category",
        "Article" => "Article",
        "Employee" => "Employee",
        "Comment" => "Comment",
        "Rating" => "Rating",
        _ => "Record",
    }
}

/// Access-controlled operations over all repositories.
pub struct Catalog {
    knowledge_bases: Box<dyn KnowledgeBaseRepository>,
    categories: Box<dyn CategoryRepository>,
    articles: Box<dyn ArticleRepository>,
    ratings: Box<dyn RatingRepository>,
    comments: Box<dyn CommentRepository>,
    employees: Box<dyn EmployeeRepository>,
    stats: Box<dyn StatsRepository>,
}

impl Catalog {
    pub fn new(pool: &DbPool) -> Self {
        Self {
            knowledge_bases: create_knowledge_base_repository(pool),
            categories: create_category_repository(pool),
            articles: create_article_repository(pool),
            ratings: create_rating_repository(pool),
            comments: create_comment_repository(pool),
            employees: create_employee_repository(pool),
            stats: create_stats_repository(pool),
        }
    }

    /// Portal-wide totals.
    #[instrument(skip(self))]
    pub async fn site_statistics(&self) -> Result<SiteStatistics, CatalogError> {
        Ok(self.stats.site_statistics().await?)
    }

    /// Most viewed and top rated articles, most active author, largest category.
    #[instrument(skip(self))]
    pub async fn top_statistics(&self) -> Result<TopStatistics, CatalogError> {
        Ok(self.stats.top_statistics().await?)
    }
}
