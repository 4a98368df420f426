//! Unified error handling for request handlers.
//!
//! Each layer has its own error enum; [`AppError`] gathers them and decides
//! the response. Public content routes answer "not found" with a 200 page
//! flagged `code_handled = 404`, admin lookups by id use a real 404.

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::imaging::ImagingError;
use crate::media::MediaError;
use crate::store::StoreError;
use crate::web::pages;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::fmt;
use thiserror::Error;
use tracing::error;

pub const MSG_404: &str = "Oops.. There's nothing here.";
pub const MSG_500: &str = "Internal Server Error (500)";

/// Per-field form errors, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push((field.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field.
    pub fn get(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|(f, _)| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// `Ok(())` when empty, otherwise `Err(AppError::Validation)`.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Unresolved public URL. Carries the message shown to the visitor.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("{field} is already taken")]
    Conflict { field: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn page_not_found() -> Self {
        Self::PageNotFound(MSG_404.to_string())
    }

    pub fn bad_request(message: impl fmt::Display) -> Self {
        Self::BadRequest(message.to_string())
    }

    /// Field errors for a form re-render, if this error has any.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors.clone()),
            AppError::Conflict { field } => {
                // Slugs are derived from the name, which is what the form shows
                let target = if field == "slug" { "name" } else { field.as_str() };
                let mut errors = FieldErrors::new();
                errors.add(target, format!("An entry with this {field} already exists."));
                Some(errors)
            }
            AppError::Imaging(e) => {
                let mut errors = FieldErrors::new();
                errors.add("image", e.to_string());
                Some(errors)
            }
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::PageNotFound(_) => StatusCode::OK,
            AppError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Imaging(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_)
            | AppError::Media(_)
            | AppError::Config(_)
            | AppError::Auth(_)
            | AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::RecordNotFound(what),
            StoreError::Conflict { field } => AppError::Conflict { field },
            StoreError::Protected(reason) => AppError::Forbidden(reason),
            StoreError::Join(e) => AppError::Join(e),
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, code_handled) = match &self {
            AppError::PageNotFound(message) => (message.clone(), 404),
            AppError::RecordNotFound(_) => (MSG_404.to_string(), 404),
            _ if status.is_server_error() => {
                error!("{self}");
                (MSG_500.to_string(), 500)
            }
            other => (other.to_string(), status.as_u16()),
        };
        (status, Html(pages::error_page(&message, code_handled).into_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_not_found_answers_200() {
        let response = AppError::page_not_found().into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn record_not_found_answers_404() {
        let response = AppError::RecordNotFound("item 3".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(StoreError::NotFound("x".into())),
            AppError::RecordNotFound(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::Conflict { field: "slug".into() }),
            AppError::Conflict { .. }
        ));
        assert!(matches!(
            AppError::from(StoreError::Protected("no".into())),
            AppError::Forbidden(_)
        ));
    }

    #[test]
    fn database_failure_is_500() {
        let err = AppError::from(StoreError::Database(rusqlite::Error::InvalidQuery));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn slug_conflict_is_reported_on_name() {
        let errors = AppError::Conflict { field: "slug".into() }.field_errors().unwrap();
        assert!(errors.has("name"));
        assert!(!errors.has("slug"));
    }

    #[test]
    fn other_conflicts_keep_their_field() {
        let errors = AppError::from(StoreError::Conflict { field: "name".into() })
            .field_errors()
            .unwrap();
        assert_eq!(errors.get("name"), ["An entry with this name already exists."]);
    }

    #[test]
    fn imaging_becomes_image_field_error() {
        let errors = AppError::Imaging(ImagingError::UnsupportedFormat("pdf".into()))
            .field_errors()
            .unwrap();
        assert_eq!(errors.get("image").len(), 1);
    }

    #[test]
    fn field_errors_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        let mut errors = FieldErrors::new();
        errors.add("name", "This field is required.");
        assert!(matches!(errors.into_result(), Err(AppError::Validation(_))));
    }
}
