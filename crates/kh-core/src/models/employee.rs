//! Employees: the portal's user accounts and article authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// "first last" when both names are present, otherwise the username.
pub fn compose_full_name(username: &str, first_name: &str, last_name: &str) -> String {
    let first = first_name.trim();
    let last = last_name.trim();
    if first.is_empty() || last.is_empty() {
        username.to_string()
    } else {
        format!("{} {}", first, last)
    }
}

/// An employee account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Unique when non-empty.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub project: String,
    pub position: String,
    pub level: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: password_hash.into(),
            project: String::new(),
            position: position.into(),
            level: String::new(),
            is_superuser: false,
            is_active: true,
            date_joined: super::now(),
            last_login: None,
        }
    }

    pub fn with_names(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn full_name(&self) -> String {
        compose_full_name(&self.username, &self.first_name, &self.last_name)
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Profile fields an employee (or a superuser) can edit.
#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub project: Option<String>,
    pub position: Option<String>,
    pub level: Option<String>,
}

/// An employee with their published article count, for list pages.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeSummary {
    pub employee: Employee,
    pub published_articles: u64,
}
