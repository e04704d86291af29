//! Database layer for Knowledge Hub.
//!
//! SQLite persistence through sqlx: connection pool, embedded migrations,
//! one repository per aggregate, and pagination helpers.

mod error;
mod pagination;
mod pool;
mod schema;

pub mod article_repo;
pub mod category_repo;
pub mod comment_repo;
pub mod employee_repo;
pub mod knowledge_base_repo;
pub mod rating_repo;
pub mod seed;
pub mod stats_repo;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::DbError;
pub use pagination::{PaginatedResult, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use pool::{
    create_pool, create_pool_with_options, escape_like_pattern, make_like_pattern, DbPool,
    PoolOptions,
};
pub use schema::run_migrations;

// Re-export repository traits and types
pub use article_repo::{ArticleFilter, ArticleRepository, Visibility};
pub use category_repo::{CategoryFilter, CategoryRepository, RECENT_ARTICLE_DAYS};
pub use comment_repo::CommentRepository;
pub use employee_repo::{EmployeeFilter, EmployeeOrder, EmployeeRepository};
pub use knowledge_base_repo::{DeleteOutcome, KnowledgeBaseFilter, KnowledgeBaseRepository};
pub use rating_repo::RatingRepository;
pub use stats_repo::StatsRepository;

// Re-export factory functions
pub use article_repo::create_article_repository;
pub use category_repo::create_category_repository;
pub use comment_repo::create_comment_repository;
pub use employee_repo::create_employee_repository;
pub use knowledge_base_repo::create_knowledge_base_repository;
pub use rating_repo::create_rating_repository;
pub use stats_repo::create_stats_repository;

pub use seed::{ensure_superuser, SeedError};
