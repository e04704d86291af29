//! Collected field errors for re-displaying forms.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use validator::{ValidationError, ValidationErrors};

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Field name to error messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single error on one field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one error.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages for a field; empty when the field is valid.
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    /// Errors not tied to one field.
    pub fn non_field(&self) -> &[String] {
        self.get(NON_FIELD_ERRORS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no errors were recorded.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FormErrors {}

fn message_for(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "required" => "This field is required.".to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "length" => match error.params.get("max").and_then(|v| v.as_u64()) {
            Some(max) => format!("Ensure this value has at most {} characters.", max),
            None => "This field is required.".to_string(),
        },
        "range" => "Select a valid choice.".to_string(),
        _ => "Enter a valid value.".to_string(),
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(err: ValidationErrors) -> Self {
        let mut errors = FormErrors::new();
        for (field, field_errors) in err.field_errors() {
            for error in field_errors {
                errors.add(field.to_string(), message_for(error));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "This field is required."))]
        title: String,
        #[validate(length(max = 3))]
        code: String,
    }

    #[test]
    fn test_add_and_get() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());
        errors.add("title", "Too long.");
        errors.add("title", "Taken.");
        assert_eq!(errors.get("title"), ["Too long.", "Taken."]);
        assert_eq!(errors.first("title"), Some("Too long."));
        assert!(errors.get("content").is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_into_result() {
        assert!(FormErrors::new().into_result().is_ok());
        assert!(FormErrors::single(NON_FIELD_ERRORS, "nope")
            .into_result()
            .is_err());
    }

    #[test]
    fn test_from_validation_errors() {
        let sample = Sample {
            title: String::new(),
            code: "toolong".to_string(),
        };
        let errors: FormErrors = sample.validate().unwrap_err().into();
        assert_eq!(errors.first("title"), Some("This field is required."));
        assert_eq!(
            errors.first("code"),
            Some("Ensure this value has at most 3 characters.")
        );
    }

    #[test]
    fn test_merge_and_display() {
        let mut errors = FormErrors::single("a", "one");
        errors.merge(FormErrors::single("a", "two"));
        errors.merge(FormErrors::single("b", "three"));
        assert_eq!(errors.to_string(), "a: one two; b: three");
    }
}
