//! Comments left by employees on articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment on an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub commentator_id: Uuid,
    pub commentary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(article_id: Uuid, commentator_id: Uuid, commentary: impl Into<String>) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4(),
            article_id,
            commentator_id,
            commentary: commentary.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the text and bumps `updated_at`.
    pub fn edit(&mut self, commentary: impl Into<String>) {
        self.commentary = commentary.into();
        self.updated_at = super::now();
    }

    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }

    /// "<full name> - <article title>"
    pub fn describe(&self, commentator_name: &str, article_title: &str) -> String {
        format!("{} - {}", commentator_name, article_title)
    }
}

/// A comment with its commentator's display name.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub commentator_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_marks_comment_edited() {
        let mut comment = Comment::new(Uuid::new_v4(), Uuid::new_v4(), "first");
        assert!(!comment.is_edited());
        std::thread::sleep(std::time::Duration::from_millis(2));
        comment.edit("second");
        assert_eq!(comment.commentary, "second");
        assert!(comment.is_edited());
    }

    #[test]
    fn test_describe() {
        let comment = Comment::new(Uuid::new_v4(), Uuid::new_v4(), "nice");
        assert_eq!(comment.describe("Ann Lee", "BMW"), "Ann Lee - BMW");
    }
}
