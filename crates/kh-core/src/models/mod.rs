//! Data models for the knowledge portal.
//!
//! Plain entities mirror table rows. The `*Summary` / `*Overview` / `*View`
//! types carry the aggregates that list and detail pages show next to an
//! entity (counts, average rating, author name).

pub mod article;
pub mod category;
pub mod comment;
pub mod employee;
pub mod knowledge_base;
pub mod rating;

pub use article::{reading_time_for, Article, ArticleSummary, ArticleUpdate, WORDS_PER_MINUTE};
pub use category::{Category, CategoryOverview, CategoryUpdate};
pub use comment::{Comment, CommentView};
pub use employee::{compose_full_name, Employee, EmployeeSummary, EmployeeUpdate};
pub use knowledge_base::{KnowledgeBase, KnowledgeBaseSummary};
pub use rating::{rating_label, Rating, RatingSummary, RATING_CHOICES};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision the store keeps (microseconds).
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
