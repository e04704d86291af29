//! Employee repository for database operations.

use super::pagination::{PaginatedResult, Pagination};
use super::schema::{
    decode_count, decode_optional_timestamp, decode_timestamp, decode_uuid, encode_timestamp,
};
use super::{make_like_pattern, DbError, DbPool};
use crate::models::{Employee, EmployeeSummary, EmployeeUpdate, RatingSummary};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// Filter for listing employees.
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    /// Case-insensitive substring of first name, last name or username.
    pub search: Option<String>,
    /// Only employees with at least one published article.
    pub authors_only: bool,
    /// Only authors of published articles in this category.
    pub category_id: Option<Uuid>,
}

/// Ordering for employee lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmployeeOrder {
    /// Default: username.
    #[default]
    Username,
    /// Directory order: last name, then first name.
    Name,
}

impl EmployeeOrder {
    fn sql(&self) -> &'static str {
        match self {
            EmployeeOrder::Username => " ORDER BY e.username ASC",
            EmployeeOrder::Name => " ORDER BY e.last_name ASC, e.first_name ASC, e.username ASC",
        }
    }
}

/// Repository trait for employee persistence.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn create(&self, employee: &Employee) -> Result<Employee, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Employee>, DbError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<Employee>, DbError>;

    /// Case-insensitive email lookup. Empty emails never match.
    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, DbError>;

    /// Lists employees with their published article counts.
    async fn list(
        &self,
        filter: &EmployeeFilter,
        order: EmployeeOrder,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<EmployeeSummary>, DbError>;

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, DbError>;

    async fn update(&self, id: Uuid, update: &EmployeeUpdate) -> Result<Employee, DbError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError>;

    async fn update_last_login(&self, id: Uuid) -> Result<(), DbError>;

    /// Deletes an employee; their articles, ratings and comments cascade.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    async fn count_published_articles(&self, id: Uuid) -> Result<u64, DbError>;

    /// Ratings received on the employee's published articles.
    async fn author_rating(&self, id: Uuid) -> Result<RatingSummary, DbError>;

    /// Checks if any employees exist (for initial setup).
    async fn any_exist(&self) -> Result<bool, DbError>;
}

const EMPLOYEE_COLUMNS: &str = "e.id, e.username, e.email, e.first_name, e.last_name, e.password_hash, \
    e.project, e.position, e.level, e.is_superuser, e.is_active, e.date_joined, e.last_login";

pub(crate) fn summary_select() -> String {
    format!(
        "SELECT {}, (SELECT COUNT(*) FROM articles a WHERE a.author_id = e.id AND a.is_published = 1) \
         AS published_articles FROM employees e WHERE 1=1",
        EMPLOYEE_COLUMNS
    )
}

/// SQLite implementation of EmployeeRepository.
pub struct SqliteEmployeeRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteEmployeeRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filter(query: &mut String, params: &mut Vec<String>, filter: &EmployeeFilter) {
        if let Some(search) = &filter.search {
            query.push_str(
                " AND (e.first_name LIKE ? ESCAPE '\\' OR e.last_name LIKE ? ESCAPE '\\')",
            );
            let pattern = make_like_pattern(search);
            params.push(pattern.clone());
            params.push(pattern);
        }

        if filter.authors_only {
            query.push_str(
                " AND EXISTS (SELECT 1 FROM articles a WHERE a.author_id = e.id AND a.is_published = 1)",
            );
        }

        if let Some(category_id) = filter.category_id {
            query.push_str(
                " AND EXISTS (SELECT 1 FROM articles a WHERE a.author_id = e.id \
                 AND a.is_published = 1 AND a.category_id = ?)",
            );
            params.push(category_id.to_string());
        }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Employee>, DbError> {
        let query = format!(
            "SELECT {} FROM employees e WHERE {} = ?",
            EMPLOYEE_COLUMNS, column
        );
        let row: Option<EmployeeRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl EmployeeRepository for SqliteEmployeeRepository {
    async fn create(&self, employee: &Employee) -> Result<Employee, DbError> {
        sqlx::query(
            r#"
            INSERT INTO employees (id, username, email, first_name, last_name, password_hash,
                project, position, level, is_superuser, is_active, date_joined, last_login)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee.id.to_string())
        .bind(&employee.username)
        .bind(&employee.email)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.password_hash)
        .bind(&employee.project)
        .bind(&employee.position)
        .bind(&employee.level)
        .bind(employee.is_superuser)
        .bind(employee.is_active)
        .bind(encode_timestamp(&employee.date_joined))
        .bind(employee.last_login.as_ref().map(encode_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(employee.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Employee>, DbError> {
        self.fetch_one_by("e.id", &id.to_string()).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Employee>, DbError> {
        self.fetch_one_by("e.username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, DbError> {
        if email.trim().is_empty() {
            return Ok(None);
        }
        let query = format!(
            "SELECT {} FROM employees e WHERE e.email <> '' AND lower(e.email) = lower(?)",
            EMPLOYEE_COLUMNS
        );
        let row: Option<EmployeeRow> = sqlx::query_as(&query)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &EmployeeFilter,
        order: EmployeeOrder,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<EmployeeSummary>, DbError> {
        let total = self.count(filter).await?;
        let pagination = pagination.clamped(total);

        let mut query = summary_select();
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);
        query.push_str(order.sql());
        query.push_str(" LIMIT ? OFFSET ?");

        let mut sqlx_query = sqlx::query_as::<_, EmployeeSummaryRow>(&query);
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

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, DbError> {
        let mut query = String::from("SELECT COUNT(*) FROM employees e WHERE 1=1");
        let mut params = Vec::new();
        Self::push_filter(&mut query, &mut params, filter);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&query);
        for param in params {
            sqlx_query = sqlx_query.bind(param);
        }
        Ok(decode_count(sqlx_query.fetch_one(&self.pool).await?))
    }

    async fn update(&self, id: Uuid, update: &EmployeeUpdate) -> Result<Employee, DbError> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))?;

        sqlx::query(
            r#"
            UPDATE employees SET username = ?, email = ?, first_name = ?, last_name = ?,
                project = ?, position = ?, level = ?
            WHERE id = ?
            "#,
        )
        .bind(update.username.as_ref().unwrap_or(&existing.username))
        .bind(update.email.as_ref().unwrap_or(&existing.email))
        .bind(update.first_name.as_ref().unwrap_or(&existing.first_name))
        .bind(update.last_name.as_ref().unwrap_or(&existing.last_name))
        .bind(update.project.as_ref().unwrap_or(&existing.project))
        .bind(update.position.as_ref().unwrap_or(&existing.position))
        .bind(update.level.as_ref().unwrap_or(&existing.level))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE employees SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        Ok(())
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE employees SET last_login = ? WHERE id = ?")
            .bind(encode_timestamp(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_published_articles(&self, id: Uuid) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM articles WHERE author_id = ? AND is_published = 1",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(decode_count(count))
    }

    async fn author_rating(&self, id: Uuid) -> Result<RatingSummary, DbError> {
        let (average, count): (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(r.rating), COUNT(r.id)
            FROM ratings r JOIN articles a ON a.id = r.article_id
            WHERE a.author_id = ? AND a.is_published = 1
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary {
            average,
            count: decode_count(count),
        })
    }

    async fn any_exist(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

/// Factory function to create the employee repository.
pub fn create_employee_repository(pool: &DbPool) -> Box<dyn EmployeeRepository> {
    Box::new(SqliteEmployeeRepository::new(pool.sqlite().clone()))
}

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    project: String,
    position: String,
    level: String,
    is_superuser: bool,
    is_active: bool,
    date_joined: String,
    last_login: Option<String>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = DbError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: decode_uuid(&row.id)?,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            project: row.project,
            position: row.position,
            level: row.level,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: decode_timestamp(&row.date_joined)?,
            last_login: decode_optional_timestamp(row.last_login)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct EmployeeSummaryRow {
    id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    project: String,
    position: String,
    level: String,
    is_superuser: bool,
    is_active: bool,
    date_joined: String,
    last_login: Option<String>,
    published_articles: i64,
}

impl TryFrom<EmployeeSummaryRow> for EmployeeSummary {
    type Error = DbError;

    fn try_from(row: EmployeeSummaryRow) -> Result<Self, Self::Error> {
        let employee = EmployeeRow {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            project: row.project,
            position: row.position,
            level: row.level,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
            last_login: row.last_login,
        }
        .try_into()?;
        Ok(EmployeeSummary {
            employee,
            published_articles: decode_count(row.published_articles),
        })
    }
}
