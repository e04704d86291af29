//! Articles and their reading-time rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reading speed used for [`reading_time_for`].
pub const WORDS_PER_MINUTE: usize = 60;

/// Estimated reading time in whole minutes: `max(1, words / 60)`.
///
/// Words are whitespace-separated tokens.
///
/// ```
/// use kh_core::models::reading_time_for;
///
/// assert_eq!(reading_time_for(""), 1);
/// assert_eq!(reading_time_for(&"a ".repeat(360)), 6);
/// ```
pub fn reading_time_for(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    (words / WORDS_PER_MINUTE).max(1) as u32
}

/// An article authored by an employee inside a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub is_published: bool,
    pub views_count: u64,
    /// Minutes, derived from `content`.
    pub reading_time: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author_id: Uuid,
        category_id: Uuid,
        is_published: bool,
    ) -> Self {
        let content = content.into();
        let now = super::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            reading_time: reading_time_for(&content),
            content,
            author_id,
            category_id,
            is_published,
            views_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an update, recomputing the reading time when content changes.
    pub fn apply(&mut self, update: &ArticleUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(category_id) = update.category_id {
            self.category_id = category_id;
        }
        if let Some(is_published) = update.is_published {
            self.is_published = is_published;
        }
        self.reading_time = reading_time_for(&self.content);
        self.updated_at = super::now();
    }

    /// Unpublished articles are visible to their author and superusers only.
    pub fn is_draft(&self) -> bool {
        !self.is_published
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Update fields for an article.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_published: Option<bool>,
}

/// An article with author, category and rating aggregates for list pages.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub article: Article,
    pub author_name: String,
    pub category_topic: String,
    /// Average rating rounded to one decimal, 0 when unrated.
    pub average_rating: f64,
    pub rating_count: u64,
    /// Number of comments.
    pub review_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_time_minimum_is_one() {
        assert_eq!(reading_time_for(""), 1);
        assert_eq!(reading_time_for("short text"), 1);
        assert_eq!(reading_time_for(&"word ".repeat(119)), 1);
    }

    #[test]
    fn test_reading_time_uses_floor_division() {
        assert_eq!(reading_time_for(&"a ".repeat(360)), 6);
        assert_eq!(reading_time_for(&"a ".repeat(179)), 2);
        assert_eq!(reading_time_for(&"a\n\t".repeat(120)), 2);
    }

    #[test]
    fn test_new_article_defaults() {
        let article = Article::new("BMW", "text", Uuid::new_v4(), Uuid::new_v4(), false);
        assert!(article.is_draft());
        assert_eq!(article.views_count, 0);
        assert_eq!(article.reading_time, 1);
        assert_eq!(article.created_at, article.updated_at);
    }

    #[test]
    fn test_apply_recomputes_reading_time() {
        let mut article = Article::new("BMW", "text", Uuid::new_v4(), Uuid::new_v4(), true);
        article.apply(&ArticleUpdate {
            content: Some("a ".repeat(360)),
            ..Default::default()
        });
        assert_eq!(article.reading_time, 6);
        assert_eq!(article.title, "BMW");
        assert!(article.is_published);
    }
}
