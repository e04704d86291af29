//! Article repository for database operations.

use super::pagination::{PaginatedResult, Pagination};
use super::schema::{decode_count, decode_timestamp, decode_uuid, encode_timestamp};
use super::{make_like_pattern, DbError, DbPool};
use crate::models::{compose_full_name, Article, ArticleSummary};
use crate::stats::display_average;
use async_trait::async_trait;
use uuid::Uuid;

/// Which drafts a listing may include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Published articles only.
    #[default]
    Published,
    /// Published articles plus the given employee's drafts.
    PublishedOrAuthoredBy(Uuid),
    /// Everything, drafts included.
    All,
}

/// Filter for listing articles.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub visibility: Visibility,
}

/// Repository trait for article persistence.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: &Article) -> Result<Article, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Article>, DbError>;

    /// An article with author name, topic and rating aggregates.
    async fn get_summary(&self, id: Uuid) -> Result<Option<ArticleSummary>, DbError>;

    /// Lists articles newest first.
    async fn list(
        &self,
        filter: &ArticleFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ArticleSummary>, DbError>;

    async fn count(&self, filter: &ArticleFilter) -> Result<u64, DbError>;

    /// Persists title, content, category, publish state and reading time.
    async fn update(&self, article: &Article) -> Result<Article, DbError>;

    /// Atomically adds one view.
    async fn increment_views(&self, id: Uuid) -> Result<(), DbError>;

    /// Deletes an article; its ratings and comments cascade.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

const ARTICLE_COLUMNS: &str = "id, title, content, author_id, category_id, is_published, \
    views_count, reading_time, created_at, updated_at";

/// Article plus the joined and aggregated columns of [`ArticleSummary`].
pub(crate) const SUMMARY_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.author_id, a.category_id, a.is_published,
        a.views_count, a.reading_time, a.created_at, a.updated_at,
        e.username AS author_username, e.first_name AS author_first_name,
        e.last_name AS author_last_name,
        c.topic AS category_topic,
        (SELECT AVG(r.rating) FROM ratings r WHERE r.article_id = a.id) AS average_rating,
        (SELECT COUNT(*) FROM ratings r WHERE r.article_id = a.id) AS rating_count,
        (SELECT COUNT(*) FROM comments m WHERE m.article_id = a.id) AS review_count
    FROM articles a
    JOIN employees e ON e.id = a.author_id
    JOIN categories c ON c.id = a.category_id
    WHERE 1=1"#;

/// Default article ordering: newest first, later inserts first on equal timestamps.
pub(crate) const DEFAULT_ORDER: &str = "a.created_at DESC, a.rowid DESC";

/// SQLite implementation of ArticleRepository.
pub struct SqliteArticleRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteArticleRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filter(query: &mut String, params: &mut Vec<String>, filter: &ArticleFilter) {
        if let Some(title) = &filter.title {
            query.push_str(" AND a.title LIKE ? ESCAPE '\\'");
            params.push(make_like_pattern(title));
        }
        if let Some(category_id) = filter.category_id {
            query.push_str(" AND a.category_id = ?");
            params.push(category_id.to_string());
        }
        if let Some(author_id) = filter.author_id {
            query.push_str(" AND a.author_id = ?");
            params.push(author_id.to_string());
        }
        match filter.visibility {
            Visibility::Published => query.push_str(" AND a.is_published = 1"),
            Visibility::PublishedOrAuthoredBy(viewer) => {
                query.push_str(" AND (a.is_published = 1 OR a.author_id = ?)");
                params.push(viewer.to_string());
            }
            Visibility::All => {}
        }
    }
}

#[async_trait]
impl ArticleRepository for SqliteArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article, DbError> {
        sqlx::query(
            r#"
            INSERT INTO articles (id, title, content, author_id, category_id, is_published,
                views_count, reading_time, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article.id.to_string())
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.author_id.to_string())
        .bind(article.category_id.to_string())
        .bind(article.is_published)
        .bind(article.views_count as i64)
        .bind(article.reading_time as i64)
        .bind(encode_timestamp(&article.created_at))
        .bind(encode_timestamp(&article.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(article.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Article>, DbError> {
        let query = format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS);
        let row: Option<ArticleRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_summary(&self, id: Uuid) -> Result<Option<ArticleSummary>, DbError> {
        let query = format!("{} AND a.id = ?", SUMMARY_SELECT);
        let row: Option<ArticleSummaryRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &ArticleFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ArticleSummary>, DbError> {
        let total = self.count(filter).await?;
        let pagination = pagination.clamped(total);

        let mut query = String::from(SUMMARY_SELECT);
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);
        query.push_str(" ORDER BY ");
        query.push_str(DEFAULT_ORDER);
        query.push_str(" LIMIT ? OFFSET ?");

        let mut sqlx_query = sqlx::query_as::<_, ArticleSummaryRow>(&query);
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

    async fn count(&self, filter: &ArticleFilter) -> Result<u64, DbError> {
        let mut query = String::from("SELECT COUNT(*) FROM articles a WHERE 1=1");
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&query);
        for param in params {
            sqlx_query = sqlx_query.bind(param);
        }
        Ok(decode_count(sqlx_query.fetch_one(&self.pool).await?))
    }

    async fn update(&self, article: &Article) -> Result<Article, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE articles SET title = ?, content = ?, category_id = ?, is_published = ?,
                reading_time = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.category_id.to_string())
        .bind(article.is_published)
        .bind(article.reading_time as i64)
        .bind(encode_timestamp(&article.updated_at))
        .bind(article.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Article", article.id));
        }

        self.get(article.id)
            .await?
            .ok_or_else(|| DbError::not_found("Article", article.id))
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE articles SET views_count = views_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the article repository.
pub fn create_article_repository(pool: &DbPool) -> Box<dyn ArticleRepository> {
    Box::new(SqliteArticleRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: String,
    title: String,
    content: String,
    author_id: String,
    category_id: String,
    is_published: bool,
    views_count: i64,
    reading_time: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ArticleRow> for Article {
    type Error = DbError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Article {
            id: decode_uuid(&row.id)?,
            title: row.title,
            content: row.content,
            author_id: decode_uuid(&row.author_id)?,
            category_id: decode_uuid(&row.category_id)?,
            is_published: row.is_published,
            views_count: decode_count(row.views_count),
            reading_time: row.reading_time.clamp(1, u32::MAX as i64) as u32,
            created_at: decode_timestamp(&row.created_at)?,
            updated_at: decode_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleSummaryRow {
    id: String,
    title: String,
    content: String,
    author_id: String,
    category_id: String,
    is_published: bool,
    views_count: i64,
    reading_time: i64,
    created_at: String,
    updated_at: String,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    category_topic: String,
    average_rating: Option<f64>,
    rating_count: i64,
    review_count: i64,
}

impl TryFrom<ArticleSummaryRow> for ArticleSummary {
    type Error = DbError;

    fn try_from(row: ArticleSummaryRow) -> Result<Self, Self::Error> {
        let article = ArticleRow {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            category_id: row.category_id,
            is_published: row.is_published,
            views_count: row.views_count,
            reading_time: row.reading_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .try_into()?;
        Ok(ArticleSummary {
            article,
            author_name: compose_full_name(
                &row.author_username,
                &row.author_first_name,
                &row.author_last_name,
            ),
            category_topic: row.category_topic,
            average_rating: display_average(row.average_rating),
            rating_count: decode_count(row.rating_count),
            review_count: decode_count(row.review_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{
        memory_pool, seed_article, seed_category, seed_employee, seed_knowledge_base,
    };
    use crate::models::{ArticleUpdate, Comment, Rating};

    #[tokio::test]
    async fn test_create_get_and_update_recomputes_reading_time() {
        let pool = memory_pool().await;
        let repo = create_article_repository(&pool);
        let author = seed_employee(&pool, "author", false).await;
        let cars = seed_knowledge_base(&pool, "Cars").await;
        let germany = seed_category(&pool, "Germany", cars.id, None).await;

        let mut article = seed_article(&pool, "BMW", author.id, germany.id, false).await;
        assert_eq!(repo.get(article.id).await.unwrap().unwrap(), article);

        article.apply(&ArticleUpdate {
            content: Some("a ".repeat(360)),
            is_published: Some(true),
            ..Default::default()
        });
        let stored = repo.update(&article).await.unwrap();
        assert_eq!(stored.reading_time, 6);
        assert!(stored.is_published);
    }

    #[tokio::test]
    async fn test_visibility_of_drafts() {
        let pool = memory_pool().await;
        let repo = create_article_repository(&pool);
        let author = seed_employee(&pool, "author", false).await;
        let reader = seed_employee(&pool, "reader", false).await;
        let cars = seed_knowledge_base(&pool, "Cars").await;
        let germany = seed_category(&pool, "Germany", cars.id, None).await;
        seed_article(&pool, "Published", author.id, germany.id, true).await;
        seed_article(&pool, "Draft", author.id, germany.id, false).await;

        let cases = [
            (Visibility::Published, 1),
            (Visibility::PublishedOrAuthoredBy(author.id), 2),
            (Visibility::PublishedOrAuthoredBy(reader.id), 1),
            (Visibility::All, 2),
        ];
        for (visibility, expected) in cases {
            let filter = ArticleFilter {
                visibility,
                ..Default::default()
            };
            assert_eq!(repo.count(&filter).await.unwrap(), expected, "{:?}", visibility);
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_with_aggregates() {
        let pool = memory_pool().await;
        let repo = create_article_repository(&pool);
        let author = seed_employee(&pool, "author", false).await;
        let reader = seed_employee(&pool, "reader", false).await;
        let cars = seed_knowledge_base(&pool, "Cars").await;
        let germany = seed_category(&pool, "Germany", cars.id, None).await;
        let bmw = seed_article(&pool, "BMW", author.id, germany.id, true).await;
        seed_article(&pool, "AUDI", author.id, germany.id, true).await;

        crate::db::create_rating_repository(&pool)
            .upsert(&Rating::new(bmw.id, reader.id, 5))
            .await
            .unwrap();
        crate::db::create_comment_repository(&pool)
            .create(&Comment::new(bmw.id, reader.id, "great"))
            .await
            .unwrap();

        let page = repo
            .list(&ArticleFilter::default(), &Pagination::default())
            .await
            .unwrap();
        let titles: Vec<_> = page
            .items
            .iter()
            .map(|s| s.article.title.as_str())
            .collect();
        assert_eq!(titles, vec!["AUDI", "BMW"]);

        let audi = &page.items[0];
        assert_eq!(audi.average_rating, 0.0);
        assert_eq!(audi.rating_count, 0);

        let bmw_summary = &page.items[1];
        assert_eq!(bmw_summary.average_rating, 5.0);
        assert_eq!(bmw_summary.rating_count, 1);
        assert_eq!(bmw_summary.review_count, 1);
        assert_eq!(bmw_summary.category_topic, "Germany");
        assert_eq!(bmw_summary.author_name, "author");
    }

    #[tokio::test]
    async fn test_title_search() {
        let pool = memory_pool().await;
        let repo = create_article_repository(&pool);
        let author = seed_employee(&pool, "author", false).await;
        let cars = seed_knowledge_base(&pool, "Cars").await;
        let germany = seed_category(&pool, "Germany", cars.id, None).await;
        seed_article(&pool, "BMW M3", author.id, germany.id, true).await;
        seed_article(&pool, "AUDI", author.id, germany.id, true).await;

        let filter = ArticleFilter {
            title: Some("bmw".to_string()),
            ..Default::default()
        };
        let page = repo.list(&filter, &Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].article.title, "BMW M3");
    }

    #[tokio::test]
    async fn test_increment_views_and_delete() {
        let pool = memory_pool().await;
        let repo = create_article_repository(&pool);
        let author = seed_employee(&pool, "author", false).await;
        let cars = seed_knowledge_base(&pool, "Cars").await;
        let germany = seed_category(&pool, "Germany", cars.id, None).await;
        let bmw = seed_article(&pool, "BMW", author.id, germany.id, true).await;

        repo.increment_views(bmw.id).await.unwrap();
        repo.increment_views(bmw.id).await.unwrap();
        assert_eq!(repo.get(bmw.id).await.unwrap().unwrap().views_count, 2);

        assert!(repo.delete(bmw.id).await.unwrap());
        assert!(repo.get(bmw.id).await.unwrap().is_none());
    }
}
