//! Authentication and authorization for Knowledge Hub.
//!
//! - [`password`]: Argon2id hashing and strength rules
//! - [`SessionData`]: what the web layer keeps in the session after login
//! - [`AuthorizationContext`]: per-request ownership and superuser predicates

pub mod password;

use crate::models::{Article, Employee};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kinds of resource guarded by ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    KnowledgeBase,
    Category,
    Article,
    Comment,
    Employee,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::KnowledgeBase => "knowledge base",
            Resource::Category => "category",
            Resource::Article => "article",
            Resource::Comment => "comment",
            Resource::Employee => "employee",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the employee making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub actor_id: Uuid,
    /// Human-readable actor name for logs.
    pub actor_name: String,
    pub is_superuser: bool,
}

impl AuthorizationContext {
    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            actor_id: employee.id,
            actor_name: employee.username.clone(),
            is_superuser: employee.is_superuser,
        }
    }

    pub fn new(actor_id: Uuid, actor_name: impl Into<String>, is_superuser: bool) -> Self {
        Self {
            actor_id,
            actor_name: actor_name.into(),
            is_superuser,
        }
    }

    /// Owner-or-superuser. A resource without an owner admits superusers only.
    pub fn can_modify(&self, owner: Option<Uuid>) -> bool {
        self.is_superuser || owner == Some(self.actor_id)
    }

    /// Self-or-superuser.
    pub fn can_update_employee(&self, employee_id: Uuid) -> bool {
        self.is_superuser || employee_id == self.actor_id
    }

    /// Superuser only.
    pub fn can_delete_employee(&self) -> bool {
        self.is_superuser
    }

    /// Published articles are visible to everyone; drafts to their author and superusers.
    pub fn can_view_article(&self, article: &Article) -> bool {
        article.is_published || self.can_modify(Some(article.author_id))
    }

    pub fn ensure_can_modify(
        &self,
        resource: Resource,
        owner: Option<Uuid>,
    ) -> Result<(), AuthorizationError> {
        if self.can_modify(owner) {
            Ok(())
        } else {
            Err(self.denied(resource))
        }
    }

    pub fn ensure_can_update_employee(&self, employee_id: Uuid) -> Result<(), AuthorizationError> {
        if self.can_update_employee(employee_id) {
            Ok(())
        } else {
            Err(self.denied(Resource::Employee))
        }
    }

    pub fn ensure_can_delete_employee(&self) -> Result<(), AuthorizationError> {
        if self.can_delete_employee() {
            Ok(())
        } else {
            Err(self.denied(Resource::Employee))
        }
    }

    fn denied(&self, resource: Resource) -> AuthorizationError {
        AuthorizationError::NotOwner {
            actor_id: self.actor_id,
            actor_name: self.actor_name.clone(),
            resource,
        }
    }
}

/// Errors raised by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The actor neither owns the resource nor is a superuser.
    NotOwner {
        actor_id: Uuid,
        actor_name: String,
        resource: Resource,
    },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationError::NotOwner {
                actor_name,
                resource,
                ..
            } => write!(
                f,
                "Employee '{}' is not allowed to modify this {}",
                actor_name, resource
            ),
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Session data stored for logged-in employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub employee_id: Uuid,
    pub username: String,
    pub is_superuser: bool,
}

impl SessionData {
    pub fn new(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id,
            username: employee.username.clone(),
            is_superuser: employee.is_superuser,
        }
    }

    pub fn authorization(&self) -> AuthorizationContext {
        AuthorizationContext::new(self.employee_id, self.username.clone(), self.is_superuser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(name: &str) -> Employee {
        Employee::new(name, format!("{}@example.com", name), "hash", "Engineer")
    }

    #[test]
    fn test_owner_can_modify() {
        let owner = employee("owner");
        let ctx = AuthorizationContext::from_employee(&owner);
        assert!(ctx.can_modify(Some(owner.id)));
        assert!(ctx
            .ensure_can_modify(Resource::Article, Some(owner.id))
            .is_ok());
    }

    #[test]
    fn test_non_owner_is_denied() {
        let ctx = AuthorizationContext::from_employee(&employee("other"));
        let err = ctx
            .ensure_can_modify(Resource::Category, Some(Uuid::new_v4()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Employee 'other' is not allowed to modify this category"
        );
    }

    #[test]
    fn test_ownerless_resource_admits_superusers_only() {
        let regular = AuthorizationContext::from_employee(&employee("regular"));
        let admin = AuthorizationContext::from_employee(&employee("admin").superuser());
        assert!(!regular.can_modify(None));
        assert!(admin.can_modify(None));
    }

    #[test]
    fn test_employee_predicates() {
        let me = employee("me");
        let ctx = AuthorizationContext::from_employee(&me);
        assert!(ctx.can_update_employee(me.id));
        assert!(!ctx.can_update_employee(Uuid::new_v4()));
        assert!(ctx.ensure_can_delete_employee().is_err());

        let admin = AuthorizationContext::from_employee(&employee("admin").superuser());
        assert!(admin.can_update_employee(me.id));
        assert!(admin.ensure_can_delete_employee().is_ok());
    }

    #[test]
    fn test_draft_visibility() {
        let author = employee("author");
        let draft = Article::new("Draft", "text", author.id, Uuid::new_v4(), false);

        assert!(AuthorizationContext::from_employee(&author).can_view_article(&draft));
        assert!(!AuthorizationContext::from_employee(&employee("reader")).can_view_article(&draft));
        assert!(
            AuthorizationContext::from_employee(&employee("admin").superuser())
                .can_view_article(&draft)
        );

        let published = Article::new("Live", "text", author.id, Uuid::new_v4(), true);
        assert!(
            AuthorizationContext::from_employee(&employee("reader")).can_view_article(&published)
        );
    }

    #[test]
    fn test_session_data_round_trips_to_context() {
        let admin = employee("admin").superuser();
        let session = SessionData::new(&admin);
        let ctx = session.authorization();
        assert_eq!(ctx.actor_id, admin.id);
        assert!(ctx.is_superuser);
        assert_eq!(ctx.actor_name, "admin");
    }
}
