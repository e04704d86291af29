//! Read-only aggregate queries backing the home page.

use super::article_repo::{ArticleSummaryRow, DEFAULT_ORDER, SUMMARY_SELECT};
use super::category_repo::{recent_cutoff, CategoryOverviewRow, OVERVIEW_SELECT};
use super::employee_repo::{summary_select, EmployeeSummaryRow};
use super::schema::decode_count;
use super::{DbError, DbPool};
use crate::models::{ArticleSummary, CategoryOverview, EmployeeSummary};
use crate::stats::{SiteStatistics, TopStatistics};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn site_statistics(&self) -> Result<SiteStatistics, DbError>;

    async fn top_statistics(&self) -> Result<TopStatistics, DbError>;
}

/// SQLite implementation of StatsRepository.
pub struct SqliteStatsRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteStatsRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    async fn most_viewed_article(&self) -> Result<Option<ArticleSummary>, DbError> {
        let query = format!(
            "{} AND a.is_published = 1 ORDER BY a.views_count DESC, {} LIMIT 1",
            SUMMARY_SELECT, DEFAULT_ORDER
        );
        let row: Option<ArticleSummaryRow> =
            sqlx::query_as(&query).fetch_optional(&self.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn top_rated_article(&self) -> Result<Option<ArticleSummary>, DbError> {
        let query = format!(
            "{} AND a.is_published = 1 \
             AND EXISTS (SELECT 1 FROM ratings r WHERE r.article_id = a.id) \
             ORDER BY average_rating DESC, {} LIMIT 1",
            SUMMARY_SELECT, DEFAULT_ORDER
        );
        let row: Option<ArticleSummaryRow> =
            sqlx::query_as(&query).fetch_optional(&self.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn most_active_author(&self) -> Result<Option<EmployeeSummary>, DbError> {
        let query = format!(
            "{} AND EXISTS (SELECT 1 FROM articles a WHERE a.author_id = e.id AND a.is_published = 1) \
             ORDER BY published_articles DESC, e.username ASC LIMIT 1",
            summary_select()
        );
        let row: Option<EmployeeSummaryRow> =
            sqlx::query_as(&query).fetch_optional(&self.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn largest_category(&self) -> Result<Option<CategoryOverview>, DbError> {
        let query = format!(
            "{} AND EXISTS (SELECT 1 FROM articles a WHERE a.category_id = c.id AND a.is_published = 1) \
             ORDER BY published_articles_count DESC, c.topic ASC, kb.title ASC LIMIT 1",
            OVERVIEW_SELECT
        );
        let row: Option<CategoryOverviewRow> = sqlx::query_as(&query)
            .bind(recent_cutoff())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl StatsRepository for SqliteStatsRepository {
    async fn site_statistics(&self) -> Result<SiteStatistics, DbError> {
        let row: SiteStatisticsRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM knowledge_bases) AS total_knowledge_bases,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM articles WHERE is_published = 1) AS total_articles,
                (SELECT COUNT(*) FROM comments) AS total_comments,
                (SELECT COUNT(*) FROM employees) AS total_employees,
                (SELECT COUNT(DISTINCT author_id) FROM articles WHERE is_published = 1) AS total_authors
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn top_statistics(&self) -> Result<TopStatistics, DbError> {
        let stats = TopStatistics {
            most_viewed_article: self.most_viewed_article().await?,
            top_rated_article: self.top_rated_article().await?,
            most_active_author: self.most_active_author().await?,
            largest_category: self.largest_category().await?,
        };
        debug!(empty = stats.is_empty(), "Computed top statistics");
        Ok(stats)
    }
}

/// Factory function to create the statistics repository.
pub fn create_stats_repository(pool: &DbPool) -> Box<dyn StatsRepository> {
    Box::new(SqliteStatsRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct SiteStatisticsRow {
    total_knowledge_bases: i64,
    total_categories: i64,
    total_articles: i64,
    total_comments: i64,
    total_employees: i64,
    total_authors: i64,
}

impl From<SiteStatisticsRow> for SiteStatistics {
    fn from(row: SiteStatisticsRow) -> Self {
        SiteStatistics {
            total_knowledge_bases: decode_count(row.total_knowledge_bases),
            total_categories: decode_count(row.total_categories),
            total_articles: decode_count(row.total_articles),
            total_comments: decode_count(row.total_comments),
            total_employees: decode_count(row.total_employees),
            total_authors: decode_count(row.total_authors),
        }
    }
}
