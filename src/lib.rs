//! # Tari Kitchen
//!
//! A server-rendered recipe and blog site. Content is organised as
//! categories holding items; each item has a Markdown body, an image and a
//! generated square thumbnail. Visitors browse by slug, staff manage content
//! through an admin area, and new items and contact messages are forwarded to
//! an SNS topic.
//!
//! # Request Flow
//!
//! ```text
//! HTTP ─→ web (axum routes, maud pages)
//!          ├─→ resolve   slug → category / item, view counting
//!          ├─→ content   validate → transform → upload → commit → notify
//!          │     ├─→ imaging   fit, center-crop, JPEG encode
//!          │     ├─→ media     local disk or S3
//!          │     └─→ notify    SNS publish
//!          └─→ store     SQLite through an r2d2 pool
//! ```
//!
//! Blocking work (SQLite queries, image transforms, password hashing) runs on
//! tokio's blocking pool; handlers never block the async workers.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`web`] | Router, handlers, sessions, CSRF tokens, forms and HTML pages |
//! | [`resolve`] | Public URL resolution: category list, first-item redirect, item view |
//! | [`content`] | Save and delete protocol for categories and items |
//! | [`imaging`] | Pure-Rust thumbnail pipeline behind the `ImageBackend` trait |
//! | [`media`] | `MediaStorage` trait with local and S3 backends |
//! | [`notify`] | Notification templates and the `Transport` trait (SNS) |
//! | [`store`] | SQLite schema and queries |
//! | [`models`] | Entities and their orderings |
//! | [`auth`] | Password hashing, session tokens, safe redirects |
//! | [`slug`] | Name → URL slug |
//! | [`seed`] | Bulk loading from a content directory |
//! | [`config`] | `config.toml` loading, environment overrides, validation |
//! | [`error`] | `AppError` and its HTTP mapping |
//! | [`state`] | Shared handles given to every handler |
//!
//! # Design Decisions
//!
//! ## Friendly Not-Found
//!
//! Unresolvable public URLs answer 200 with a "go back home" page whose
//! markup carries `data-code-handled="404"`. Admin lookups by id use a real
//! 404.
//!
//! ## Thumbnails Never Upscale
//!
//! Images are downscaled to fit the thumbnail bounds and then center-cropped
//! to the exact card size. A source smaller than the card leaves black
//! padding instead of being enlarged.
//!
//! ## Notifications Never Fail a Save
//!
//! Dispatch outcomes are logged and returned as values. A missing topic or an
//! SNS outage does not undo a saved item or reject a contact message.

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod imaging;
pub mod media;
pub mod models;
pub mod notify;
pub mod resolve;
pub mod seed;
pub mod slug;
pub mod state;
pub mod store;
pub mod web;

#[cfg(test)]
pub(crate) mod test_helpers;
