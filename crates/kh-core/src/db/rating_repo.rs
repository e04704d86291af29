//! Rating repository for database operations.

use super::schema::{decode_count, decode_timestamp, decode_uuid, encode_timestamp};
use super::{DbError, DbPool};
use crate::models::{Rating, RatingSummary};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for rating persistence.
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Inserts the rating, or replaces the value of the existing
    /// `(article, employee)` rating. Returns the stored row.
    async fn upsert(&self, rating: &Rating) -> Result<Rating, DbError>;

    /// The rating an employee gave an article, if any.
    async fn get_for(&self, article_id: Uuid, employee_id: Uuid)
        -> Result<Option<Rating>, DbError>;

    async fn summary(&self, article_id: Uuid) -> Result<RatingSummary, DbError>;
}

const RATING_COLUMNS: &str = "id, article_id, employee_id, rating, created_at, updated_at";

/// SQLite implementation of RatingRepository.
pub struct SqliteRatingRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteRatingRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepository for SqliteRatingRepository {
    async fn upsert(&self, rating: &Rating) -> Result<Rating, DbError> {
        sqlx::query(
            r#"
            INSERT INTO ratings (id, article_id, employee_id, rating, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(article_id, employee_id)
            DO UPDATE SET rating = excluded.rating, updated_at = excluded.updated_at
            "#,
        )
        .bind(rating.id.to_string())
        .bind(rating.article_id.to_string())
        .bind(rating.employee_id.to_string())
        .bind(rating.rating as i64)
        .bind(encode_timestamp(&rating.created_at))
        .bind(encode_timestamp(&rating.updated_at))
        .execute(&self.pool)
        .await?;

        self.get_for(rating.article_id, rating.employee_id)
            .await?
            .ok_or_else(|| DbError::not_found("Rating", rating.id))
    }

    async fn get_for(
        &self,
        article_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Option<Rating>, DbError> {
        let query = format!(
            "SELECT {} FROM ratings WHERE article_id = ? AND employee_id = ?",
            RATING_COLUMNS
        );
        let row: Option<RatingRow> = sqlx::query_as(&query)
            .bind(article_id.to_string())
            .bind(employee_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn summary(&self, article_id: Uuid) -> Result<RatingSummary, DbError> {
        let (average, count): (Option<f64>, i64) =
            sqlx::query_as("SELECT AVG(rating), COUNT(id) FROM ratings WHERE article_id = ?")
                .bind(article_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(RatingSummary {
            average,
            count: decode_count(count),
        })
    }
}

/// Factory function to create the rating repository.
pub fn create_rating_repository(pool: &DbPool) -> Box<dyn RatingRepository> {
    Box::new(SqliteRatingRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: String,
    article_id: String,
    employee_id: String,
    rating: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<RatingRow> for Rating {
    type Error = DbError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating)
            .map_err(|_| DbError::Serialization(format!("Invalid rating: {}", row.rating)))?;
        Ok(Rating {
            id: decode_uuid(&row.id)?,
            article_id: decode_uuid(&row.article_id)?,
            employee_id: decode_uuid(&row.employee_id)?,
            rating,
            created_at: decode_timestamp(&row.created_at)?,
            updated_at: decode_timestamp(&row.updated_at)?,
        })
    }
}
