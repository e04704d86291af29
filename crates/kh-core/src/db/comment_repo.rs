//! Comment repository for database operations.

use super::schema::{decode_timestamp, decode_uuid, encode_timestamp};
use super::{DbError, DbPool};
use crate::models::{compose_full_name, Comment, CommentView};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for comment persistence.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &Comment) -> Result<Comment, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Comment>, DbError>;

    /// Comments on an article, newest first, with commentator names.
    async fn list_for_article(&self, article_id: Uuid) -> Result<Vec<CommentView>, DbError>;

    /// Replaces the text of a comment.
    async fn update(&self, comment: &Comment) -> Result<Comment, DbError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

/// SQLite implementation of CommentRepository.
pub struct SqliteCommentRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteCommentRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment, DbError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, article_id, commentator_id, commentary, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id.to_string())
        .bind(comment.article_id.to_string())
        .bind(comment.commentator_id.to_string())
        .bind(&comment.commentary)
        .bind(encode_timestamp(&comment.created_at))
        .bind(encode_timestamp(&comment.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(comment.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Comment>, DbError> {
        let row: Option<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, article_id, commentator_id, commentary, created_at, updated_at
            FROM comments WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_article(&self, article_id: Uuid) -> Result<Vec<CommentView>, DbError> {
        let rows: Vec<CommentViewRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.article_id, m.commentator_id, m.commentary, m.created_at, m.updated_at,
                e.username, e.first_name, e.last_name
            FROM comments m
            JOIN employees e ON e.id = m.commentator_id
            WHERE m.article_id = ?
            ORDER BY m.created_at DESC, m.rowid DESC
            "#,
        )
        .bind(article_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, comment: &Comment) -> Result<Comment, DbError> {
        let result = sqlx::query("UPDATE comments SET commentary = ?, updated_at = ? WHERE id = ?")
            .bind(&comment.commentary)
            .bind(encode_timestamp(&comment.updated_at))
            .bind(comment.id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Comment", comment.id));
        }

        self.get(comment.id)
            .await?
            .ok_or_else(|| DbError::not_found("Comment", comment.id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the comment repository.
pub fn create_comment_repository(pool: &DbPool) -> Box<dyn CommentRepository> {
    Box::new(SqliteCommentRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    article_id: String,
    commentator_id: String,
    commentary: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = DbError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: decode_uuid(&row.id)?,
            article_id: decode_uuid(&row.article_id)?,
            commentator_id: decode_uuid(&row.commentator_id)?,
            commentary: row.commentary,
            created_at: decode_timestamp(&row.created_at)?,
            updated_at: decode_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommentViewRow {
    id: String,
    article_id: String,
    commentator_id: String,
    commentary: String,
    created_at: String,
    updated_at: String,
    username: String,
    first_name: String,
    last_name: String,
}

impl TryFrom<CommentViewRow> for CommentView {
    type Error = DbError;

    fn try_from(row: CommentViewRow) -> Result<Self, Self::Error> {
        let commentator_name = compose_full_name(&row.username, &row.first_name, &row.last_name);
        let comment = CommentRow {
            id: row.id,
            article_id: row.article_id,
            commentator_id: row.commentator_id,
            commentary: row.commentary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .try_into()?;
        Ok(CommentView {
            comment,
            commentator_name,
        })
    }
}
