//! Knowledge base repository for database operations.

use super::pagination::{PaginatedResult, Pagination};
use super::schema::{
    decode_count, decode_optional_uuid, decode_timestamp, decode_uuid, encode_timestamp,
};
use super::{make_like_pattern, DbError, DbPool};
use crate::models::{KnowledgeBase, KnowledgeBaseSummary};
use async_trait::async_trait;
use uuid::Uuid;

/// Filter for listing knowledge bases.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
}

/// Outcome of a guarded delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// The row still owns children and was kept.
    HasDependents,
}

/// Repository trait for knowledge base persistence.
#[async_trait]
pub trait KnowledgeBaseRepository: Send + Sync {
    async fn create(&self, knowledge_base: &KnowledgeBase) -> Result<KnowledgeBase, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<KnowledgeBase>, DbError>;

    async fn get_by_title(&self, title: &str) -> Result<Option<KnowledgeBase>, DbError>;

    /// Lists knowledge bases ordered by title, with category and published article counts.
    async fn list(
        &self,
        filter: &KnowledgeBaseFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<KnowledgeBaseSummary>, DbError>;

    /// All knowledge bases ordered by title (for select boxes).
    async fn list_all(&self) -> Result<Vec<KnowledgeBase>, DbError>;

    async fn count(&self, filter: &KnowledgeBaseFilter) -> Result<u64, DbError>;

    async fn update_title(&self, id: Uuid, title: &str) -> Result<KnowledgeBase, DbError>;

    /// Deletes the knowledge base only when it owns no categories.
    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome, DbError>;

    async fn count_categories(&self, id: Uuid) -> Result<u64, DbError>;
}

const SUMMARY_SELECT: &str = r#"
    SELECT kb.id, kb.title, kb.created_at, kb.created_by,
        (SELECT COUNT(*) FROM categories c WHERE c.knowledge_base_id = kb.id) AS categories_count,
        (SELECT COUNT(*) FROM articles a JOIN categories c ON c.id = a.category_id
            WHERE c.knowledge_base_id = kb.id AND a.is_published = 1) AS articles_count
    FROM knowledge_bases kb
    WHERE 1=1"#;

/// SQLite implementation of KnowledgeBaseRepository.
pub struct SqliteKnowledgeBaseRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteKnowledgeBaseRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filter(query: &mut String, params: &mut Vec<String>, filter: &KnowledgeBaseFilter) {
        if let Some(title) = &filter.title {
            query.push_str(" AND kb.title LIKE ? ESCAPE '\\'");
            params.push(make_like_pattern(title));
        }
    }
}

#[async_trait]
impl KnowledgeBaseRepository for SqliteKnowledgeBaseRepository {
    async fn create(&self, knowledge_base: &KnowledgeBase) -> Result<KnowledgeBase, DbError> {
        sqlx::query(
            "INSERT INTO knowledge_bases (id, title, created_at, created_by) VALUES (?, ?, ?, ?)",
        )
        .bind(knowledge_base.id.to_string())
        .bind(&knowledge_base.title)
        .bind(encode_timestamp(&knowledge_base.created_at))
        .bind(knowledge_base.created_by.map(|id| id.to_string()))
        .execute(&self.pool)
        .await?;

        Ok(knowledge_base.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<KnowledgeBase>, DbError> {
        let row: Option<KnowledgeBaseRow> = sqlx::query_as(
            "SELECT id, title, created_at, created_by FROM knowledge_bases WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<KnowledgeBase>, DbError> {
        let row: Option<KnowledgeBaseRow> = sqlx::query_as(
            "SELECT id, title, created_at, created_by FROM knowledge_bases WHERE title = ?",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &KnowledgeBaseFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<KnowledgeBaseSummary>, DbError> {
        let total = self.count(filter).await?;
        let pagination = pagination.clamped(total);

        let mut query = String::from(SUMMARY_SELECT);
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);
        query.push_str(" ORDER BY kb.title ASC LIMIT ? OFFSET ?");

        let mut sqlx_query = sqlx::query_as::<_, KnowledgeBaseSummaryRow>(&query);
        for param in params {
            sqlx_query = sqlx_query.bind(param);
        }
        let rows = sqlx_query
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PaginatedResult::new(items, total, &pagination))
    }

    async fn list_all(&self) -> Result<Vec<KnowledgeBase>, DbError> {
        let rows: Vec<KnowledgeBaseRow> = sqlx::query_as(
            "SELECT id, title, created_at, created_by FROM knowledge_bases ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &KnowledgeBaseFilter) -> Result<u64, DbError> {
        let mut query = String::from("SELECT COUNT(*) FROM knowledge_bases kb WHERE 1=1");
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&query);
        for param in params {
            sqlx_query = sqlx_query.bind(param);
        }
        Ok(decode_count(sqlx_query.fetch_one(&self.pool).await?))
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<KnowledgeBase, DbError> {
        let result = sqlx::query("UPDATE knowledge_bases SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("KnowledgeBase", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("KnowledgeBase", id))
    }

    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome, DbError> {
        let id_str = id.to_string();
        let result = sqlx::query(
            r#"
            DELETE FROM knowledge_bases
            WHERE id = ? AND NOT EXISTS (SELECT 1 FROM categories WHERE knowledge_base_id = ?)
            "#,
        )
        .bind(&id_str)
        .bind(&id_str)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(DeleteOutcome::Deleted);
        }
        match self.get(id).await? {
            Some(_) => Ok(DeleteOutcome::HasDependents),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn count_categories(&self, id: Uuid) -> Result<u64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE knowledge_base_id = ?")
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(decode_count(count))
    }
}

/// Factory function to create the knowledge base repository.
pub fn create_knowledge_base_repository(pool: &DbPool) -> Box<dyn KnowledgeBaseRepository> {
    Box::new(SqliteKnowledgeBaseRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct KnowledgeBaseRow {
    id: String,
    title: String,
    created_at: String,
    created_by: Option<String>,
}

impl TryFrom<KnowledgeBaseRow> for KnowledgeBase {
    type Error = DbError;

    fn try_from(row: KnowledgeBaseRow) -> Result<Self, Self::Error> {
        Ok(KnowledgeBase {
            id: decode_uuid(&row.id)?,
            title: row.title,
            created_at: decode_timestamp(&row.created_at)?,
            created_by: decode_optional_uuid(row.created_by)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct KnowledgeBaseSummaryRow {
    id: String,
    title: String,
    created_at: String,
    created_by: Option<String>,
    categories_count: i64,
    articles_count: i64,
}

impl TryFrom<KnowledgeBaseSummaryRow> for KnowledgeBaseSummary {
    type Error = DbError;

    fn try_from(row: KnowledgeBaseSummaryRow) -> Result<Self, Self::Error> {
        let knowledge_base = KnowledgeBaseRow {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            created_by: row.created_by,
        }
        .try_into()?;
        Ok(KnowledgeBaseSummary {
            knowledge_base,
            categories_count: decode_count(row.categories_count),
            articles_count: decode_count(row.articles_count),
        })
    }
}
