//! User input structs and their cleaning rules.
//!
//! Each input mirrors an HTML form. `clean()` trims text, runs the
//! `validator` rules and field-level parsing, and returns the typed values or
//! every problem found as [`FormErrors`]. Checks that need the store
//! (uniqueness, existence, old password) are done by [`crate::catalog`].

use crate::auth::password::validate_password_strength;
use crate::models::{rating_label, EmployeeUpdate};
use crate::validation::FormErrors;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Maximum length of a search query.
pub const MAX_SEARCH_LENGTH: usize = 255;

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

/// Trims a free-text search; blank means no filter.
pub fn normalize_search(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_SEARCH_LENGTH).collect())
    }
}

fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    let ok = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

fn parse_choice(raw: &str, field: &str, errors: &mut FormErrors) -> Option<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

fn check_new_passwords(first: &str, second: &str, field: &str, errors: &mut FormErrors) {
    if first.is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    if first != second {
        errors.add(field, PASSWORD_MISMATCH);
        return;
    }
    for problem in validate_password_strength(first) {
        errors.add(field, problem);
    }
}

fn start(validation: Result<(), validator::ValidationErrors>) -> FormErrors {
    match validation {
        Ok(()) => FormErrors::new(),
        Err(err) => err.into(),
    }
}

/// Knowledge base create/update form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct KnowledgeBaseInput {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters."))]
    pub title: String,
}

impl KnowledgeBaseInput {
    /// Returns the trimmed title.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let form = Self {
            title: self.title.trim().to_string(),
        };
        start(form.validate()).into_result()?;
        Ok(form.title)
    }
}

/// Category create/update form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255, message = "Topic must be 1-255 characters."))]
    pub topic: String,
    #[serde(default)]
    pub knowledge_base_id: String,
}

/// Cleaned [`CategoryInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub topic: String,
    pub knowledge_base_id: Uuid,
}

impl CategoryInput {
    pub fn clean(&self) -> Result<CategoryFields, FormErrors> {
        let form = Self {
            topic: self.topic.trim().to_string(),
            knowledge_base_id: self.knowledge_base_id.clone(),
        };
        let mut errors = start(form.validate());
        let knowledge_base_id =
            parse_choice(&form.knowledge_base_id, "knowledge_base_id", &mut errors);
        errors.into_result()?;
        Ok(CategoryFields {
            topic: form.topic,
            knowledge_base_id: knowledge_base_id.unwrap_or_default(),
        })
    }
}

/// Article create/update form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ArticleInput {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters."))]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub content: String,
    #[serde(default)]
    pub category_id: String,
    /// HTML checkbox: present when ticked.
    #[serde(default)]
    pub is_published: Option<String>,
}

/// Cleaned [`ArticleInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub is_published: bool,
}

impl ArticleInput {
    pub fn published(&self) -> bool {
        matches!(
            self.is_published.as_deref().map(str::trim),
            Some("on" | "true" | "1" | "yes")
        )
    }

    pub fn clean(&self) -> Result<ArticleFields, FormErrors> {
        let form = Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            category_id: self.category_id.clone(),
            is_published: self.is_published.clone(),
        };
        let mut errors = start(form.validate());
        let category_id = parse_choice(&form.category_id, "category_id", &mut errors);
        errors.into_result()?;
        Ok(ArticleFields {
            is_published: form.published(),
            title: form.title,
            content: form.content,
            category_id: category_id.unwrap_or_default(),
        })
    }
}

/// Rating form on the article page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RatingInput {
    #[serde(default)]
    pub rating: String,
}

impl RatingInput {
    pub fn clean(&self) -> Result<u8, FormErrors> {
        let raw = self.rating.trim();
        if raw.is_empty() {
            return Err(FormErrors::single("rating", REQUIRED));
        }
        match raw.parse::<u8>() {
            Ok(value) if rating_label(value).is_some() => Ok(value),
            _ => Err(FormErrors::single("rating", INVALID_CHOICE)),
        }
    }
}

/// Comment form on the article page.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CommentInput {
    #[validate(length(min = 1, max = 5000, message = "Comment must be 1-5000 characters."))]
    pub commentary: String,
}

impl CommentInput {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let form = Self {
            commentary: self.commentary.trim().to_string(),
        };
        start(form.validate()).into_result()?;
        Ok(form.commentary)
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct RegistrationInput {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters."),
        custom(function = "validate_username_chars")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub project: String,
    #[validate(length(min = 1, max = 255, message = "Position is required (max 255 characters)."))]
    pub position: String,
    #[serde(default)]
    #[validate(length(max = 155))]
    pub level: String,
}

/// Cleaned [`RegistrationInput`]; the password is still plain text.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub project: String,
    pub position: String,
    pub level: String,
}

impl RegistrationInput {
    pub fn clean(&self) -> Result<Registration, FormErrors> {
        let form = Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password1: self.password1.clone(),
            password2: self.password2.clone(),
            project: self.project.trim().to_string(),
            position: self.position.trim().to_string(),
            level: self.level.trim().to_string(),
        };
        let mut errors = start(form.validate());
        check_new_passwords(&form.password1, &form.password2, "password2", &mut errors);
        errors.into_result()?;
        Ok(Registration {
            username: form.username,
            email: form.email,
            first_name: form.first_name,
            last_name: form.last_name,
            password: form.password1,
            project: form.project,
            position: form.position,
            level: form.level,
        })
    }
}

/// Profile edit form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct EmployeeProfileInput {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters."),
        custom(function = "validate_username_chars")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 155))]
    pub level: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub project: String,
    #[validate(length(min = 1, max = 255, message = "Position is required (max 255 characters)."))]
    pub position: String,
}

impl EmployeeProfileInput {
    pub fn clean(&self) -> Result<EmployeeUpdate, FormErrors> {
        let form = Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            level: self.level.trim().to_string(),
            project: self.project.trim().to_string(),
            position: self.position.trim().to_string(),
        };
        start(form.validate()).into_result()?;
        Ok(EmployeeUpdate {
            username: Some(form.username),
            email: Some(form.email),
            first_name: Some(form.first_name),
            last_name: Some(form.last_name),
            project: Some(form.project),
            position: Some(form.position),
            level: Some(form.level),
        })
    }
}

/// Password change form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeInput {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

/// Cleaned [`PasswordChangeInput`]; the old password is verified by the catalog.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl PasswordChangeInput {
    pub fn clean(&self) -> Result<PasswordChange, FormErrors> {
        let mut errors = FormErrors::new();
        if self.old_password.is_empty() {
            errors.add("old_password", REQUIRED);
        }
        check_new_passwords(
            &self.new_password1,
            &self.new_password2,
            "new_password2",
            &mut errors,
        );
        errors.into_result()?;
        Ok(PasswordChange {
            old_password: self.old_password.clone(),
            new_password: self.new_password1.clone(),
        })
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after a successful login.
    #[serde(default)]
    pub next: Option<String>,
}
