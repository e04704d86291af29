//! Category repository for database operations.

use super::knowledge_base_repo::DeleteOutcome;
use super::pagination::{PaginatedResult, Pagination};
use super::schema::{
    decode_count, decode_optional_uuid, decode_timestamp, decode_uuid, encode_timestamp,
};
use super::{make_like_pattern, DbError, DbPool};
use crate::models::{Category, CategoryOverview, CategoryUpdate};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Window for the "recent articles" count.
pub const RECENT_ARTICLE_DAYS: i64 = 7;

/// Filter for listing categories.
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    /// Case-insensitive substring of the topic.
    pub topic: Option<String>,
    pub knowledge_base_id: Option<Uuid>,
}

/// Repository trait for category persistence.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Category>, DbError>;

    /// Looks up a topic inside one knowledge base.
    async fn get_by_topic(
        &self,
        knowledge_base_id: Uuid,
        topic: &str,
    ) -> Result<Option<Category>, DbError>;

    /// A category with its aggregates.
    async fn get_overview(&self, id: Uuid) -> Result<Option<CategoryOverview>, DbError>;

    /// Lists categories ordered by topic, with aggregates.
    async fn list(
        &self,
        filter: &CategoryFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<CategoryOverview>, DbError>;

    /// Every matching category ordered by topic, with aggregates and
    /// the knowledge base title.
    async fn list_all(&self, filter: &CategoryFilter) -> Result<Vec<CategoryOverview>, DbError>;

    async fn count(&self, filter: &CategoryFilter) -> Result<u64, DbError>;

    async fn update(&self, id: Uuid, update: &CategoryUpdate) -> Result<Category, DbError>;

    /// Deletes the category only when it owns no articles.
    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome, DbError>;

    async fn count_articles(&self, id: Uuid) -> Result<u64, DbError>;
}

/// Aggregating select; the first placeholder is the "recent" cut-off.
pub(crate) const OVERVIEW_SELECT: &str = r#"
    SELECT c.id, c.topic, c.knowledge_base_id, c.created_at, c.created_by,
        kb.title AS knowledge_base_title,
        (SELECT COUNT(*) FROM articles a WHERE a.category_id = c.id) AS articles_count,
        (SELECT COUNT(*) FROM articles a
            WHERE a.category_id = c.id AND a.is_published = 1) AS published_articles_count,
        (SELECT COUNT(*) FROM articles a
            WHERE a.category_id = c.id AND a.is_published = 1 AND a.created_at >= ?) AS recent_articles_count,
        (SELECT COUNT(DISTINCT a.author_id) FROM articles a
            WHERE a.category_id = c.id AND a.is_published = 1) AS authors_count,
        (SELECT COUNT(*) FROM comments m JOIN articles a ON a.id = m.article_id
            WHERE a.category_id = c.id AND a.is_published = 1) AS comments_count,
        (SELECT COALESCE(SUM(a.reading_time), 0) FROM articles a
            WHERE a.category_id = c.id AND a.is_published = 1) AS reading_time_total
    FROM categories c
    JOIN knowledge_bases kb ON kb.id = c.knowledge_base_id
    WHERE 1=1"#;

pub(crate) fn recent_cutoff() -> String {
    encode_timestamp(&(Utc::now() - Duration::days(RECENT_ARTICLE_DAYS)))
}

/// SQLite implementation of CategoryRepository.
pub struct SqliteCategoryRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filter(query: &mut String, params: &mut Vec<String>, filter: &CategoryFilter) {
        if let Some(topic) = &filter.topic {
            query.push_str(" AND c.topic LIKE ? ESCAPE '\\'");
            params.push(make_like_pattern(topic));
        }
        if let Some(kb_id) = filter.knowledge_base_id {
            query.push_str(" AND c.knowledge_base_id = ?");
            params.push(kb_id.to_string());
        }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category, DbError> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, topic, knowledge_base_id, created_at, created_by)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id.to_string())
        .bind(&category.topic)
        .bind(category.knowledge_base_id.to_string())
        .bind(encode_timestamp(&category.created_at))
        .bind(category.created_by.map(|id| id.to_string()))
        .execute(&self.pool)
        .await?;

        Ok(category.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Category>, DbError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, topic, knowledge_base_id, created_at, created_by FROM categories WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_topic(
        &self,
        knowledge_base_id: Uuid,
        topic: &str,
    ) -> Result<Option<Category>, DbError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, topic, knowledge_base_id, created_at, created_by
            FROM categories WHERE knowledge_base_id = ? AND topic = ?
            "#,
        )
        .bind(knowledge_base_id.to_string())
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_overview(&self, id: Uuid) -> Result<Option<CategoryOverview>, DbError> {
        let query = format!("{} AND c.id = ?", OVERVIEW_SELECT);
        let row: Option<CategoryOverviewRow> = sqlx::query_as(&query)
            .bind(recent_cutoff())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &CategoryFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<CategoryOverview>, DbError> {
        let total = self.count(filter).await?;
        let pagination = pagination.clamped(total);

        let mut query = String::from(OVERVIEW_SELECT);
        let mut params = vec![recent_cutoff()];
        Self::push_filter(&mut query, &mut params, filter);
        query.push_str(" ORDER BY c.topic ASC, kb.title ASC LIMIT ? OFFSET ?");

        let mut sqlx_query = sqlx::query_as::<_, CategoryOverviewRow>(&query);
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

    async fn list_all(&self, filter: &CategoryFilter) -> Result<Vec<CategoryOverview>, DbError> {
        let mut query = String::from(OVERVIEW_SELECT);
        let mut params = vec![recent_cutoff()];
        Self::push_filter(&mut query, &mut params, filter);
        query.push_str(" ORDER BY c.topic ASC, kb.title ASC");

        let mut sqlx_query = sqlx::query_as::<_, CategoryOverviewRow>(&query);
        for param in params {
            sqlx_query = sqlx_query.bind(param);
        }
        let rows = sqlx_query.fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, filter: &CategoryFilter) -> Result<u64, DbError> {
        let mut query = String::from("SELECT COUNT(*) FROM categories c WHERE 1=1");
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&query);
        for param in params {
            sqlx_query = sqlx_query.bind(param);
        }
        Ok(decode_count(sqlx_query.fetch_one(&self.pool).await?))
    }

    async fn update(&self, id: Uuid, update: &CategoryUpdate) -> Result<Category, DbError> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;

        let topic = update.topic.as_ref().unwrap_or(&existing.topic);
        let knowledge_base_id = update
            .knowledge_base_id
            .unwrap_or(existing.knowledge_base_id);

        sqlx::query("UPDATE categories SET topic = ?, knowledge_base_id = ? WHERE id = ?")
            .bind(topic)
            .bind(knowledge_base_id.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome, DbError> {
        let id_str = id.to_string();
        let result = sqlx::query(
            r#"
            DELETE FROM categories
            WHERE id = ? AND NOT EXISTS (SELECT 1 FROM articles WHERE category_id = ?)
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

    async fn count_articles(&self, id: Uuid) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE category_id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(decode_count(count))
    }
}

/// Factory function to create the category repository.
pub fn create_category_repository(pool: &DbPool) -> Box<dyn CategoryRepository> {
    Box::new(SqliteCategoryRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    topic: String,
    knowledge_base_id: String,
    created_at: String,
    created_by: Option<String>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = DbError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: decode_uuid(&row.id)?,
            topic: row.topic,
            knowledge_base_id: decode_uuid(&row.knowledge_base_id)?,
            created_at: decode_timestamp(&row.created_at)?,
            created_by: decode_optional_uuid(row.created_by)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CategoryOverviewRow {
    id: String,
    topic: String,
    knowledge_base_id: String,
    created_at: String,
    created_by: Option<String>,
    knowledge_base_title: String,
    articles_count: i64,
    published_articles_count: i64,
    recent_articles_count: i64,
    authors_count: i64,
    comments_count: i64,
    reading_time_total: i64,
}

impl TryFrom<CategoryOverviewRow> for CategoryOverview {
    type Error = DbError;

    fn try_from(row: CategoryOverviewRow) -> Result<Self, Self::Error> {
        let category = CategoryRow {
            id: row.id,
            topic: row.topic,
            knowledge_base_id: row.knowledge_base_id,
            created_at: row.created_at,
            created_by: row.created_by,
        }
        .try_into()?;
        Ok(CategoryOverview {
            category,
            knowledge_base_title: row.knowledge_base_title,
            articles_count: decode_count(row.articles_count),
            published_articles_count: decode_count(row.published_articles_count),
            recent_articles_count: decode_count(row.recent_articles_count),
            authors_count: decode_count(row.authors_count),
            comments_count: decode_count(row.comments_count),
            reading_time_total: decode_count(row.reading_time_total),
        })
    }
}
