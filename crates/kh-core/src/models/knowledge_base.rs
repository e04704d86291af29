//! Knowledge bases: the top-level containers of categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A named collection of categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: Uuid,
    /// Unique title.
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Creator; `None` once the creating employee has been deleted.
    pub created_by: Option<Uuid>,
}

impl KnowledgeBase {
    pub fn new(title: impl Into<String>, created_by: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created_at: super::now(),
            created_by,
        }
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A knowledge base with the counts shown on the list page.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseSummary {
    pub knowledge_base: KnowledgeBase,
    pub categories_count: u64,
    /// Published articles across all of its categories.
    pub articles_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_title() {
        let kb = KnowledgeBase::new("Cars", None);
        assert_eq!(kb.to_string(), "Cars");
        assert!(kb.created_by.is_none());
    }
}
