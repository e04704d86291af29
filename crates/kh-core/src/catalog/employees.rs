//! Employees: directory, profiles, registration and credentials.

use super::{Catalog, CatalogError};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthorizationContext;
use crate::db::{
    ArticleFilter, EmployeeFilter, EmployeeOrder, PaginatedResult, Pagination, Visibility,
};
use crate::forms::{
    normalize_search, EmployeeProfileInput, LoginInput, PasswordChangeInput, RegistrationInput,
};
use crate::models::{ArticleSummary, Employee, EmployeeSummary};
use crate::validation::{FormErrors, NON_FIELD_ERRORS};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const EMAIL_TAKEN: &str = "This email is already in use.";
const WRONG_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";
const INVALID_LOGIN: &str = "Please enter a correct username and password. \
    Note that both fields may be case-sensitive.";

/// An employee's profile page.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeProfile {
    pub employee: Employee,
    /// Published articles, newest first.
    pub articles: PaginatedResult<ArticleSummary>,
    pub published_articles: u64,
    /// Average over all ratings on their published articles, one decimal.
    pub author_rating: f64,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Catalog {
    /// Employee directory ordered by last name, then first name.
    #[instrument(skip(self))]
    pub async fn list_employees(
        &self,
        search: Option<&str>,
        authors_only: bool,
        pagination: Pagination,
    ) -> Result<PaginatedResult<EmployeeSummary>, CatalogError> {
        let filter = EmployeeFilter {
            search: normalize_search(search),
            authors_only,
            category_id: None,
        };
        Ok(self
            .employees
            .list(&filter, EmployeeOrder::Name, &pagination)
            .await?)
    }

    pub async fn employee(&self, id: Uuid) -> Result<Employee, CatalogError> {
        self.employees
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Employee", id))
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn employee_profile(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
        pagination: Pagination,
    ) -> Result<EmployeeProfile, CatalogError> {
        let employee = self.employee(id).await?;
        let filter = ArticleFilter {
            author_id: Some(id),
            visibility: Visibility::Published,
            ..Default::default()
        };
        let articles = self.articles.list(&filter, &pagination).await?;
        let rating = self.employees.author_rating(id).await?;

        Ok(EmployeeProfile {
            published_articles: articles.total,
            author_rating: rating.display_average(),
            can_edit: ctx.can_update_employee(id),
            can_delete: ctx.can_delete_employee(),
            employee,
            articles,
        })
    }

    /// Loads a profile the caller may edit.
    pub async fn editable_employee(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Employee, CatalogError> {
        let employee = self.employee(id).await?;
        if let Err(denied) = ctx.ensure_can_update_employee(id) {
            warn!(actor = %ctx.actor_name, employee_id = %id, "Profile change denied");
            return Err(denied.into());
        }
        Ok(employee)
    }

    /// Loads an employee the caller may delete.
    pub async fn deletable_employee(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Employee, CatalogError> {
        let employee = self.employee(id).await?;
        if let Err(denied) = ctx.ensure_can_delete_employee() {
            warn!(actor = %ctx.actor_name, employee_id = %id, "Employee deletion denied");
            return Err(denied.into());
        }
        Ok(employee)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn update_employee(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
        input: &EmployeeProfileInput,
    ) -> Result<Employee, CatalogError> {
        self.editable_employee(ctx, id).await?;
        let update = input.clean()?;

        let mut errors = FormErrors::new();
        if let Some(username) = &update.username {
            self.check_username_free(username, Some(id), &mut errors)
                .await?;
        }
        if let Some(email) = &update.email {
            self.check_email_free(email, Some(id), &mut errors).await?;
        }
        errors.into_result()?;

        let updated = self.employees.update(id, &update).await.map_err(|e| {
            if e.is_constraint() {
                CatalogError::invalid("username", USERNAME_TAKEN)
            } else {
                e.into()
            }
        })?;

        info!(employee_id = %id, username = %updated.username, "Updated employee profile");
        Ok(updated)
    }

    /// Deletes an employee with their articles, ratings and comments.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn delete_employee(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Employee, CatalogError> {
        let employee = self.deletable_employee(ctx, id).await?;
        if !self.employees.delete(id).await? {
            return Err(CatalogError::not_found("Employee", id));
        }

        info!(employee_id = %id, username = %employee.username, "Deleted employee");
        Ok(employee)
    }

    /// Creates a regular (non-superuser) account.
    #[instrument(skip(self, input), fields(username = %input.username.trim()))]
    pub async fn register(&self, input: &RegistrationInput) -> Result<Employee, CatalogError> {
        let registration = input.clean()?;

        let mut errors = FormErrors::new();
        self.check_username_free(&registration.username, None, &mut errors)
            .await?;
        self.check_email_free(&registration.email, None, &mut errors)
            .await?;
        errors.into_result()?;

        let mut employee = Employee::new(
            registration.username,
            registration.email,
            hash_password(&registration.password)?,
            registration.position,
        )
        .with_names(registration.first_name, registration.last_name);
        employee.project = registration.project;
        employee.level = registration.level;

        let created = self.employees.create(&employee).await.map_err(|e| {
            if e.is_constraint() {
                CatalogError::invalid("username", USERNAME_TAKEN)
            } else {
                e.into()
            }
        })?;

        info!(employee_id = %created.id, "Registered employee");
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn change_password(
        &self,
        ctx: &AuthorizationContext,
        input: &PasswordChangeInput,
    ) -> Result<(), CatalogError> {
        let employee = self.employee(ctx.actor_id).await?;

        let mut errors = match input.clean() {
            Ok(_) => FormErrors::new(),
            Err(errors) => errors,
        };
        if !input.old_password.is_empty()
            && !verify_password(&input.old_password, &employee.password_hash)?
        {
            errors.add("old_password", WRONG_OLD_PASSWORD);
        }
        errors.into_result()?;

        let hash = hash_password(&input.new_password1)?;
        self.employees.update_password(employee.id, &hash).await?;

        info!(employee_id = %employee.id, "Changed password");
        Ok(())
    }

    /// Checks credentials and records the login time.
    #[instrument(skip(self, input), fields(username = %input.username.trim()))]
    pub async fn authenticate(&self, input: &LoginInput) -> Result<Employee, CatalogError> {
        let username = input.username.trim();
        let invalid = || CatalogError::invalid(NON_FIELD_ERRORS, INVALID_LOGIN);

        if username.is_empty() || input.password.is_empty() {
            return Err(invalid());
        }

        let employee = match self.employees.get_by_username(username).await? {
            Some(employee) if employee.is_active => employee,
            _ => {
                warn!("Login failed: unknown or inactive employee");
                return Err(invalid());
            }
        };

        if !verify_password(&input.password, &employee.password_hash)? {
            warn!(employee_id = %employee.id, "Login failed: wrong password");
            return Err(invalid());
        }

        self.employees.update_last_login(employee.id).await?;
        info!(employee_id = %employee.id, "Employee logged in");
        Ok(employee)
    }

    async fn check_username_free(
        &self,
        username: &str,
        current: Option<Uuid>,
        errors: &mut FormErrors,
    ) -> Result<(), CatalogError> {
        if let Some(existing) = self.employees.get_by_username(username).await? {
            if Some(existing.id) != current {
                errors.add("username", USERNAME_TAKEN);
            }
        }
        Ok(())
    }

    async fn check_email_free(
        &self,
        email: &str,
        current: Option<Uuid>,
        errors: &mut FormErrors,
    ) -> Result<(), CatalogError> {
        if let Some(existing) = self.employees.get_by_email(email).await? {
            if Some(existing.id) != current {
                errors.add("email", EMAIL_TAKEN);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::db::test_support::{seed_article, seed_category, seed_knowledge_base};
    use crate::db::create_rating_repository;
    use crate::models::Rating;

    fn registration(username: &str, email: &str) -> RegistrationInput {
        RegistrationInput {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Alex".to_string(),
            last_name: "Lee".to_string(),
            password1: "Knowledge1".to_string(),
            password2: "Knowledge1".to_string(),
            project: "Portal".to_string(),
            position: "Engineer".to_string(),
            level: "Senior".to_string(),
        }
    }

    fn login(username: &str, password: &str) -> LoginInput {
        LoginInput {
            username: username.to_string(),
            password: password.to_string(),
            next: None,
        }
    }

    fn profile(employee: &Employee) -> EmployeeProfileInput {
        EmployeeProfileInput {
            username: employee.username.clone(),
            email: employee.email.clone(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            level: employee.level.clone(),
            project: employee.project.clone(),
            position: employee.position.clone(),
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let fx = Fixture::new().await;

        let employee = fx
            .catalog
            .register(&registration("alee", "alee@example.com"))
            .await
            .unwrap();
        assert_eq!(employee.full_name(), "Alex Lee");
        assert!(!employee.is_superuser);
        assert_eq!(employee.level, "Senior");

        let logged_in = fx
            .catalog
            .authenticate(&login(" alee ", "Knowledge1"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, employee.id);
        assert!(fx
            .catalog
            .employee(employee.id)
            .await
            .unwrap()
            .last_login
            .is_some());

        let err = fx
            .catalog
            .authenticate(&login("alee", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.form_errors().unwrap().non_field(), [INVALID_LOGIN.to_string()]);
        assert!(fx
            .catalog
            .authenticate(&login("ghost", "Knowledge1"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username_and_email() {
        let fx = Fixture::new().await;
        fx.catalog
            .register(&registration("alee", "alee@example.com"))
            .await
            .unwrap();

        let err = fx
            .catalog
            .register(&registration("alee", "ALEE@example.com"))
            .await
            .unwrap_err();
        let errors = err.form_errors().unwrap();
        assert_eq!(errors.first("username"), Some(USERNAME_TAKEN));
        assert_eq!(errors.first("email"), Some(EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn test_profile_update_permissions_and_uniqueness() {
        let fx = Fixture::new().await;
        let (ann_employee, ann) = fx.employee("ann").await;
        let (bob_employee, bob) = fx.employee("bob").await;
        let (_, root) = fx.superuser("root").await;

        let err = fx
            .catalog
            .update_employee(&bob, ann_employee.id, &profile(&ann_employee))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let mut input = profile(&ann_employee);
        input.email = bob_employee.email.clone();
        let err = fx
            .catalog
            .update_employee(&ann, ann_employee.id, &input)
            .await
            .unwrap_err();
        assert_eq!(err.form_errors().unwrap().first("email"), Some(EMAIL_TAKEN));

        let mut input = profile(&ann_employee);
        input.first_name = "Ann".to_string();
        input.last_name = "Archer".to_string();
        let updated = fx
            .catalog
            .update_employee(&root, ann_employee.id, &input)
            .await
            .unwrap();
        assert_eq!(updated.full_name(), "Ann Archer");

        assert!(fx
            .catalog
            .delete_employee(&ann, bob_employee.id)
            .await
            .unwrap_err()
            .is_forbidden());
    }

    #[tokio::test]
    async fn test_change_password() {
        let fx = Fixture::new().await;
        let employee = fx
            .catalog
            .register(&registration("alee", "alee@example.com"))
            .await
            .unwrap();
        let ctx = AuthorizationContext::from_employee(&employee);

        let wrong = PasswordChangeInput {
            old_password: "nope".to_string(),
            new_password1: "Changed99".to_string(),
            new_password2: "Changed99".to_string(),
        };
        let err = fx.catalog.change_password(&ctx, &wrong).await.unwrap_err();
        assert_eq!(err.form_errors().unwrap().first("old_password"), Some(WRONG_OLD_PASSWORD));

        let ok = PasswordChangeInput {
            old_password: "Knowledge1".to_string(),
            ..wrong
        };
        fx.catalog.change_password(&ctx, &ok).await.unwrap();
        fx.catalog
            .authenticate(&login("alee", "Changed99"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_profile_and_directory() {
        let fx = Fixture::new().await;
        let (ann_employee, ann) = fx.employee("ann").await;
        let (bob_employee, _) = fx.employee("bob").await;
        let (_, root) = fx.superuser("root").await;
        let cars = seed_knowledge_base(&fx.pool, "Cars").await;
        let germany = seed_category(&fx.pool, "Germany", cars.id, None).await;
        let bmw = seed_article(&fx.pool, "BMW", ann_employee.id, germany.id, true).await;
        seed_article(&fx.pool, "Draft", ann_employee.id, germany.id, false).await;
        create_rating_repository(&fx.pool)
            .upsert(&Rating::new(bmw.id, bob_employee.id, 4))
            .await
            .unwrap();

        let profile = fx
            .catalog
            .employee_profile(&ann, ann_employee.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(profile.published_articles, 1);
        assert_eq!(profile.author_rating, 4.0);
        assert!(profile.can_edit);
        assert!(!profile.can_delete);

        let authors = fx
            .catalog
            .list_employees(None, true, Pagination::default())
            .await
            .unwrap();
        assert_eq!(authors.total, 1);

        let everyone = fx
            .catalog
            .list_employees(Some("o"), false, Pagination::default())
            .await
            .unwrap();
        assert_eq!(everyone.total, 2);

        fx.catalog
            .delete_employee(&root, ann_employee.id)
            .await
            .unwrap();
        assert!(fx
            .catalog
            .employee(ann_employee.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
