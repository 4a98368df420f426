//! Submitted form shapes and the checks that do not need the store.

use crate::error::{AppError, FieldErrors, Result};
use crate::models::{CONTACT_MESSAGE_MAX_CHARS, CategoryDraft, ItemDraft, Upload};
use crate::notify::Context;
use axum::extract::Multipart;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;
const REQUIRED: &str = "This field is required.";

/// Loose address check: one `@`, something before it, a dotted domain after.
pub fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn required(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub csrf_token: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_CHARS {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX_CHARS} characters."),
            );
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if !looks_like_email(self.email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }
        if self.password1.chars().count() < PASSWORD_MIN_CHARS {
            errors.add(
                "password1",
                format!("This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."),
            );
        }
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Contact
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub contact_email: String,
    pub subject: String,
    pub message: String,
    pub csrf_token: String,
}

impl ContactForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        required(&mut errors, "name", &self.name);
        if !looks_like_email(self.contact_email.trim()) {
            errors.add("contact_email", "Enter a valid email address.");
        }
        required(&mut errors, "subject", &self.subject);
        required(&mut errors, "message", &self.message);
        if self.message.chars().count() > CONTACT_MESSAGE_MAX_CHARS {
            errors.add(
                "message",
                format!("Ensure this value has at most {CONTACT_MESSAGE_MAX_CHARS} characters."),
            );
        }
        errors
    }

    /// Notification context for [`TemplateId::ContactMessage`](crate::notify::TemplateId).
    pub fn context(&self) -> Context {
        Context::from([
            ("name".to_string(), self.name.trim().to_string()),
            ("contact_email".to_string(), self.contact_email.trim().to_string()),
            ("subject".to_string(), self.subject.trim().to_string()),
            ("message".to_string(), self.message.clone()),
        ])
    }
}

// =============================================================================
// Admin (multipart)
// =============================================================================

/// Text fields and the optional `image` file of a multipart submission.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub image: Option<Upload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(AppError::bad_request)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(AppError::bad_request)?;
                    // Browsers send an empty part when no file was picked
                    if !(file_name.is_empty() && bytes.is_empty()) {
                        form.image = Some(Upload {
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                None => {
                    let text = field.text().await.map_err(AppError::bad_request)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn into_category_draft(self) -> CategoryDraft {
        CategoryDraft {
            name: self.text("name"),
            summary: self.text("summary"),
            image: self.image,
        }
    }

    /// Item fields. An unparseable category or date is a validation error.
    pub fn into_item_draft(self) -> Result<ItemDraft> {
        let mut errors = FieldErrors::new();
        let category_id = match self.text("category").trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("category", "Select a valid category.");
                    None
                }
            },
        };
        let published_at = match self.text("published_at").trim() {
            "" => None,
            raw => match parse_datetime(raw) {
                Some(at) => Some(at),
                None => {
                    errors.add("published_at", "Enter a valid date/time.");
                    None
                }
            },
        };
        errors.into_result()?;
        Ok(ItemDraft {
            name: self.text("name"),
            summary: self.text("summary"),
            content: self.text("content"),
            category_id,
            published_at,
            image: self.image,
        })
    }
}

/// RFC 3339, or the `YYYY-MM-DDTHH:MM` a `datetime-local` input sends (UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn contact() -> ContactForm {
        ContactForm {
            name: "Ana".into(),
            contact_email: "ana@example.com".into(),
            subject: "Hello".into(),
            message: "Love the laksa.".into(),
            csrf_token: String::new(),
        }
    }

    #[test]
    fn email_check() {
        assert!(looks_like_email("ana@example.com"));
        for bad in ["", "ana", "@example.com", "ana@localhost", "ana@@x.com", "a na@x.com", "ana@x."] {
            assert!(!looks_like_email(bad), "accepted {bad:?}");
        }
    }

    #[test]
    fn contact_form_valid() {
        assert!(contact().validate().is_empty());
    }

    #[test]
    fn contact_form_flags_each_field() {
        let errors = ContactForm::default().validate();
        for field in ["name", "contact_email", "subject", "message"] {
            assert!(errors.has(field), "no error for {field}");
        }
    }

    #[test]
    fn contact_message_length_limit() {
        let mut form = contact();
        form.message = "x".repeat(CONTACT_MESSAGE_MAX_CHARS);
        assert!(form.validate().is_empty());
        form.message.push('x');
        assert!(form.validate().has("message"));
    }

    #[test]
    fn contact_context_has_form_keys() {
        let context = contact().context();
        assert_eq!(context["contact_email"], "ana@example.com");
        assert_eq!(context.len(), 4);
    }

    #[test]
    fn register_form_checks() {
        let form = RegisterForm {
            username: "ana".into(),
            email: "ana@example.com".into(),
            password1: "long enough".into(),
            password2: "long enough".into(),
            ..Default::default()
        };
        assert!(form.validate().is_empty());

        let bad = RegisterForm {
            username: "a n a".into(),
            email: "nope".into(),
            password1: "short".into(),
            password2: "other".into(),
            ..Default::default()
        };
        let errors = bad.validate();
        for field in ["username", "email", "password1", "password2"] {
            assert!(errors.has(field), "no error for {field}");
        }
    }

    #[test]
    fn parses_datetime_local_input() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-05-01T12:30"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn item_draft_rejects_bad_category() {
        let mut form = MultipartForm::default();
        form.fields.insert("category".into(), "soups".into());
        let err = form.into_item_draft().unwrap_err();
        assert!(err.field_errors().unwrap().has("category"));
    }

    #[test]
    fn item_draft_blank_category_means_default() {
        let mut form = MultipartForm::default();
        form.fields.insert("name".into(), "Pho".into());
        let draft = form.into_item_draft().unwrap();
        assert_eq!(draft.name, "Pho");
        assert_eq!(draft.category_id, None);
    }
}
