//! Categories group articles inside a knowledge base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A topic inside a knowledge base. `(topic, knowledge_base_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub topic: String,
    pub knowledge_base_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

impl Category {
    pub fn new(
        topic: impl Into<String>,
        knowledge_base_id: Uuid,
        created_by: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            knowledge_base_id,
            created_at: super::now(),
            created_by,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic)
    }
}

/// Update fields for a category.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub topic: Option<String>,
    pub knowledge_base_id: Option<Uuid>,
}

/// A category together with the aggregates shown on list and detail pages.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOverview {
    pub category: Category,
    pub knowledge_base_title: String,
    /// All articles, drafts included.
    pub articles_count: u64,
    pub published_articles_count: u64,
    /// Published articles created in the last seven days.
    pub recent_articles_count: u64,
    /// Distinct authors of published articles.
    pub authors_count: u64,
    /// Comments on published articles.
    pub comments_count: u64,
    /// Sum of reading time over published articles, in minutes.
    pub reading_time_total: u64,
}
