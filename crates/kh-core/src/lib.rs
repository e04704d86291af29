//! # kh-core
//!
//! Domain models, persistence and access-controlled operations for Knowledge Hub.
//!
//! The crate is organised bottom-up:
//! - [`models`]: knowledge bases, categories, articles, employees, ratings and comments
//! - [`db`]: SQLite pool, migrations, repositories and pagination
//! - [`forms`] and [`validation`]: user input structs and collected field errors
//! - [`auth`]: password hashing, session payload and authorization predicates
//! - [`stats`]: site-wide and "top" aggregates
//! - [`catalog`]: the operations the web layer calls, combining all of the above

pub mod auth;
pub mod catalog;
pub mod db;
pub mod forms;
pub mod models;
pub mod stats;
pub mod validation;

pub use auth::password::{
    hash_password, validate_password_strength, verify_password, PasswordError,
};
pub use auth::{AuthorizationContext, SessionData};
pub use catalog::{Catalog, CatalogError};
pub use models::{
    Article, ArticleSummary, Category, CategoryOverview, Comment, CommentView, Employee,
    EmployeeSummary, KnowledgeBase, KnowledgeBaseSummary, Rating, RatingSummary,
};
pub use stats::{SiteStatistics, TopStatistics};
pub use validation::FormErrors;
