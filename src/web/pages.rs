//! HTML pages.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time templating; every
//! interpolation is escaped except rendered Markdown. The stylesheet is
//! embedded at compile time and inlined into each page.

use crate::error::{FieldErrors, MSG_404};
use crate::media::MediaStorage;
use crate::models::{Category, Item, User};
use crate::resolve::{ItemView, category_path, item_path};
use crate::web::csrf::CSRF_FIELD;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::collections::HashMap;

const CSS: &str = include_str!("../../static/style.css");

/// Per-request page furniture: who is logged in, any pending message, and
/// the token that forms post back.
#[derive(Debug, Clone, Copy)]
pub struct Chrome<'a> {
    pub site_name: &'a str,
    pub user: Option<&'a User>,
    pub flash: Option<&'a str>,
    pub csrf: &'a str,
}

impl Chrome<'static> {
    /// Chrome for pages rendered without request context (error pages).
    pub fn plain() -> Self {
        Self {
            site_name: "Tari Kitchen",
            user: None,
            flash: None,
            csrf: "",
        }
    }
}

/// Submitted or stored form values, keyed by field name.
pub type FormValues = HashMap<String, String>;

fn value<'a>(values: &'a FormValues, name: &str) -> &'a str {
    values.get(name).map(String::as_str).unwrap_or_default()
}

pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut body = String::new();
    md_html::push_html(&mut body, parser);
    body
}

// ============================================================================
// HTML Components
// ============================================================================

fn base_document(chrome: Chrome, title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " · " (chrome.site_name) }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (site_header(chrome))
                @if let Some(message) = chrome.flash {
                    div.flash role="status" { (message) }
                }
                (content)
            }
        }
    }
}

fn site_header(chrome: Chrome) -> Markup {
    html! {
        header.site-header {
            a.brand href="/" { (chrome.site_name) }
            nav.site-nav {
                a href="/items/" { "Recipes" }
                a href="/contact/" { "Contact" }
                @if let Some(user) = chrome.user {
                    @if user.is_staff {
                        a href="/admin/" { "Admin" }
                    }
                    span.who { (user.username) }
                    a href="/logout" { "Log out" }
                } @else {
                    a href="/login" { "Log in" }
                    a href="/register" { "Register" }
                }
            }
        }
    }
}

fn csrf_input(chrome: Chrome) -> Markup {
    html! {
        input type="hidden" name=(CSRF_FIELD) value=(chrome.csrf);
    }
}

fn field_errors(errors: &FieldErrors, field: &str) -> Markup {
    html! {
        @for message in errors.get(field) {
            p.field-error { (message) }
        }
    }
}

fn text_input(label: &str, name: &str, kind: &str, current: &str, errors: &FieldErrors) -> Markup {
    html! {
        label.field {
            span { (label) }
            input type=(kind) name=(name) value=(current);
            (field_errors(errors, name))
        }
    }
}

fn textarea(label: &str, name: &str, current: &str, rows: u32, errors: &FieldErrors) -> Markup {
    html! {
        label.field {
            span { (label) }
            textarea name=(name) rows=(rows) { (current) }
            (field_errors(errors, name))
        }
    }
}

fn card(href: &str, image_url: &str, title: &str, summary: &str) -> Markup {
    html! {
        a.card href=(href) {
            img src=(image_url) alt=(title) loading="lazy";
            span.card-title { (title) }
            span.card-summary { (summary) }
        }
    }
}

// ============================================================================
// Public pages
// ============================================================================

/// "Go back home" page used for not-found, errors and confirmations.
///
/// `code_handled` is the status the page stands for; not-found pages are
/// served with 200 but carry 404 here.
pub fn error_page(message: &str, code_handled: u16) -> Markup {
    message_page(Chrome::plain(), message, code_handled)
}

pub fn message_page(chrome: Chrome, message: &str, code_handled: u16) -> Markup {
    let content = html! {
        main.go-back-home data-code-handled=(code_handled) {
            h1 { (message) }
            a.button href="/" { "Go back home" }
        }
    };
    let title = if code_handled == 404 { MSG_404 } else { message };
    base_document(chrome, title, Some("message"), content)
}

pub fn home_page(chrome: Chrome, popular: &[(Category, Item)], media: &dyn MediaStorage) -> Markup {
    let content = html! {
        main.home-page {
            section.hero {
                h1 { "Welcome to " (chrome.site_name) }
                p { "Recipes and stories from our kitchen." }
                a.button href="/items/" { "Browse recipes" }
            }
            @if !popular.is_empty() {
                section.popular {
                    h2 { "Popular" }
                    div.card-grid {
                        @for (category, item) in popular {
                            (card(&item_path(category, item), &media.url(&item.image_thumbnail), &item.name, &item.summary))
                        }
                    }
                }
            }
        }
    };
    base_document(chrome, "Home", None, content)
}

pub fn categories_page(chrome: Chrome, categories: &[Category], media: &dyn MediaStorage) -> Markup {
    let content = html! {
        main.categories-page {
            h1 { "Recipes" }
            div.card-grid {
                @for category in categories {
                    (card(&category_path(category), &media.url(&category.image), &category.name, &category.summary))
                }
            }
        }
    };
    base_document(chrome, "Recipes", None, content)
}

pub fn item_page(chrome: Chrome, view: &ItemView, media: &dyn MediaStorage) -> Markup {
    let ItemView { category, item, siblings, index } = view;
    let content = html! {
        main.item-page {
            aside.sidebar {
                h2 { a href="/items/" { (category.name) } }
                ol {
                    @for (i, sibling) in siblings.iter().enumerate() {
                        li class=[(i == *index).then_some("current")] {
                            a href=(item_path(category, sibling)) { (sibling.name) }
                        }
                    }
                }
            }
            article.item {
                header {
                    h1 { (item.name) }
                    p.meta {
                        time datetime=(item.published_at.to_rfc3339()) {
                            (item.published_at.format("%B %-d, %Y").to_string())
                        }
                        " · "
                        span.views { (item.views) " views" }
                    }
                }
                img.item-image src=(media.url(&item.image)) alt=(item.name);
                p.summary { (item.summary) }
                div.content { (PreEscaped(markdown_to_html(&item.content))) }
                nav.item-nav {
                    @if let Some(previous) = view.previous() {
                        a.prev href=(item_path(category, previous)) rel="prev" { "‹ " (previous.name) }
                    }
                    @if let Some(next) = view.next() {
                        a.next href=(item_path(category, next)) rel="next" { (next.name) " ›" }
                    }
                }
            }
        }
    };
    base_document(chrome, &item.name, None, content)
}

// ============================================================================
// Accounts and contact
// ============================================================================

pub fn register_page(chrome: Chrome, values: &FormValues, errors: &FieldErrors) -> Markup {
    let content = html! {
        main.form-page {
            h1 { "Register" }
            form method="post" action="/register" {
                (csrf_input(chrome))
                (text_input("Username", "username", "text", value(values, "username"), errors))
                (text_input("Email", "email", "email", value(values, "email"), errors))
                (text_input("Password", "password1", "password", "", errors))
                (text_input("Password confirmation", "password2", "password", "", errors))
                button type="submit" { "Register" }
            }
            p { "Already have an account? " a href="/login" { "Log in" } }
        }
    };
    base_document(chrome, "Register", None, content)
}

pub fn login_page(chrome: Chrome, username: &str, next: Option<&str>, error: Option<&str>) -> Markup {
    let action = match next {
        Some(next) => crate::web::session::login_url(next),
        None => "/login".to_string(),
    };
    let content = html! {
        main.form-page {
            h1 { "Log in" }
            @if let Some(error) = error {
                p.form-error { (error) }
            }
            form method="post" action=(action) {
                (csrf_input(chrome))
                (text_input("Username", "username", "text", username, &FieldErrors::new()))
                (text_input("Password", "password", "password", "", &FieldErrors::new()))
                button type="submit" { "Log in" }
            }
            p { "No account yet? " a href="/register" { "Register" } }
        }
    };
    base_document(chrome, "Log in", None, content)
}

pub fn contact_page(
    chrome: Chrome,
    values: &FormValues,
    errors: &FieldErrors,
    warning: Option<&str>,
) -> Markup {
    let content = html! {
        main.form-page {
            h1 { "Contact us" }
            @if let Some(warning) = warning {
                p.form-error { (warning) }
            }
            form method="post" action="/contact/" {
                (csrf_input(chrome))
                (text_input("Name", "name", "text", value(values, "name"), errors))
                (text_input("Email", "contact_email", "email", value(values, "contact_email"), errors))
                (text_input("Subject", "subject", "text", value(values, "subject"), errors))
                (textarea("Message", "message", value(values, "message"), 8, errors))
                button type="submit" { "Send" }
            }
        }
    };
    base_document(chrome, "Contact us", None, content)
}

// ============================================================================
// Admin
// ============================================================================

pub fn admin_dashboard(chrome: Chrome, categories: &[(Category, i64)], items: &[(Category, Item)]) -> Markup {
    let content = html! {
        main.admin-page {
            h1 { "Administration" }
            section {
                h2 { "Categories " a.button href="/admin/categories/new" { "Add" } }
                table {
                    thead { tr { th { "Name" } th { "Slug" } th { "Items" } th {} } }
                    tbody {
                        @for (category, count) in categories {
                            tr {
                                td { a href={ "/admin/categories/" (category.id) "/edit" } { (category.name) } }
                                td { (category.slug) }
                                td { (count) }
                                td {
                                    form method="post" action={ "/admin/categories/" (category.id) "/delete" } {
                                        (csrf_input(chrome))
                                        button type="submit" { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            section {
                h2 { "Items " a.button href="/admin/items/new" { "Add" } }
                table {
                    thead { tr { th { "Name" } th { "Category" } th { "Published" } th { "Views" } th {} } }
                    tbody {
                        @for (category, item) in items {
                            tr {
                                td { a href={ "/admin/items/" (item.id) "/edit" } { (item.name) } }
                                td { (category.name) }
                                td { (item.published_at.format("%Y-%m-%d %H:%M").to_string()) }
                                td { (item.views) }
                                td.actions {
                                    form method="post" action={ "/admin/items/" (item.id) "/reset-views" } {
                                        (csrf_input(chrome))
                                        button type="submit" { "Reset views" }
                                    }
                                    form method="post" action={ "/admin/items/" (item.id) "/delete" } {
                                        (csrf_input(chrome))
                                        button type="submit" { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    base_document(chrome, "Administration", Some("admin"), content)
}

fn image_input(current_url: Option<&str>, errors: &FieldErrors) -> Markup {
    html! {
        label.field {
            span { "Image" }
            @if let Some(url) = current_url {
                img.current-image src=(url) alt="Current image";
            }
            input type="file" name="image" accept="image/*";
            (field_errors(errors, "image"))
        }
    }
}

pub fn category_form(
    chrome: Chrome,
    action: &str,
    values: &FormValues,
    current_image: Option<&str>,
    errors: &FieldErrors,
) -> Markup {
    let title = if current_image.is_some() { "Edit category" } else { "New category" };
    let content = html! {
        main.form-page {
            h1 { (title) }
            form method="post" action=(action) enctype="multipart/form-data" {
                (csrf_input(chrome))
                (text_input("Name", "name", "text", value(values, "name"), errors))
                (textarea("Summary", "summary", value(values, "summary"), 3, errors))
                (image_input(current_image, errors))
                button type="submit" { "Save" }
            }
        }
    };
    base_document(chrome, title, Some("admin"), content)
}

pub fn item_form(
    chrome: Chrome,
    action: &str,
    values: &FormValues,
    categories: &[Category],
    current_image: Option<&str>,
    errors: &FieldErrors,
) -> Markup {
    let title = if current_image.is_some() { "Edit item" } else { "New item" };
    let selected = value(values, "category");
    let content = html! {
        main.form-page {
            h1 { (title) }
            form method="post" action=(action) enctype="multipart/form-data" {
                (csrf_input(chrome))
                (text_input("Name", "name", "text", value(values, "name"), errors))
                (textarea("Summary", "summary", value(values, "summary"), 3, errors))
                label.field {
                    span { "Category" }
                    select name="category" {
                        @for category in categories {
                            @let id = category.id.to_string();
                            option value=(id) selected[selected == id] { (category.name) }
                        }
                    }
                    (field_errors(errors, "category"))
                }
                (text_input("Published", "published_at", "datetime-local", value(values, "published_at"), errors))
                (textarea("Content (Markdown)", "content", value(values, "content"), 16, errors))
                (image_input(current_image, errors))
                button type="submit" { "Save" }
            }
        }
    };
    base_document(chrome, title, Some("admin"), content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{category_fixture, item_fixture};
    use chrono::Utc;

    fn staff() -> User {
        User {
            id: 1,
            username: "chef".into(),
            email: "chef@example.com".into(),
            password_hash: String::new(),
            is_staff: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn error_page_carries_handled_code() {
        let html = error_page(MSG_404, 404).into_string();
        assert!(html.contains("data-code-handled=\"404\""));
        assert!(html.contains("Oops.. There&#39;s nothing here.") || html.contains("Oops.. There's nothing here."));
        assert!(html.contains("Go back home"));
    }

    #[test]
    fn header_shows_admin_link_for_staff() {
        let user = staff();
        let chrome = Chrome {
            site_name: "Tari Kitchen",
            user: Some(&user),
            flash: Some("You are now logged in as chef"),
            csrf: "",
        };
        let html = message_page(chrome, "ok", 200).into_string();
        assert!(html.contains("href=\"/admin/\""));
        assert!(html.contains("Log out"));
        assert!(html.contains("You are now logged in as chef"));
    }

    #[test]
    fn header_shows_login_for_visitors() {
        let html = error_page("x", 500).into_string();
        assert!(html.contains("href=\"/login\""));
        assert!(!html.contains("href=\"/admin/\""));
    }

    #[test]
    fn markdown_is_rendered() {
        let html = markdown_to_html("**Boil** the *broth*");
        assert!(html.contains("<strong>Boil</strong>"));
        assert!(html.contains("<em>broth</em>"));
    }

    #[test]
    fn form_values_are_escaped() {
        let mut values = FormValues::new();
        values.insert("name".into(), "<script>".into());
        let html = contact_page(Chrome::plain(), &values, &FieldErrors::new(), None).into_string();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn item_form_selects_current_category() {
        let categories = vec![category_fixture(1, "General"), category_fixture(2, "Soups")];
        let mut values = FormValues::new();
        values.insert("category".into(), "2".into());
        let html = item_form(
            Chrome::plain(),
            "/admin/items/new",
            &values,
            &categories,
            None,
            &FieldErrors::new(),
        )
        .into_string();
        assert!(html.contains("<option value=\"2\" selected>Soups</option>"));
        assert!(html.contains("enctype=\"multipart/form-data\""));
    }

    #[test]
    fn forms_carry_the_csrf_token() {
        let chrome = Chrome {
            csrf: "f00d",
            ..Chrome::plain()
        };
        let field = "<input type=\"hidden\" name=\"csrf_token\" value=\"f00d\">";
        let pages = [
            register_page(chrome, &FormValues::new(), &FieldErrors::new()),
            login_page(chrome, "", None, None),
            contact_page(chrome, &FormValues::new(), &FieldErrors::new(), None),
            category_form(chrome, "/admin/categories/new", &FormValues::new(), None, &FieldErrors::new()),
        ];
        for page in pages {
            assert!(page.into_string().contains(field));
        }

        let category = category_fixture(2, "Soups");
        let item = item_fixture(7, "Laksa", 2);
        let html = admin_dashboard(chrome, &[(category.clone(), 1)], &[(category, item)]).into_string();
        assert_eq!(html.matches(field).count(), 3);
    }

    #[test]
    fn dashboard_links_every_action() {
        let category = category_fixture(2, "Soups");
        let item = item_fixture(7, "Laksa", 2);
        let html = admin_dashboard(Chrome::plain(), &[(category.clone(), 1)], &[(category, item)])
            .into_string();
        assert!(html.contains("/admin/categories/2/edit"));
        assert!(html.contains("/admin/categories/2/delete"));
        assert!(html.contains("/admin/items/7/edit"));
        assert!(html.contains("/admin/items/7/reset-views"));
        assert!(html.contains("/admin/items/7/delete"));
    }
}
