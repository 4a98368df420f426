//! The contact form, forwarded to the site owners through the notifier.

use super::csrf::CsrfToken;
use super::forms::ContactForm;
use super::pages::{self, FormValues};
use super::public::chrome;
use super::render;
use super::session::{CurrentUser, Flash, found, login_url};
use crate::error::Result;
use crate::notify::{DispatchResult, TemplateId};
use crate::state::AppState;
use axum::Form;
use axum::extract::State;
use axum::response::Response;
use tracing::{info, warn};

pub const INVALID_FORM: &str = "Email form is invalid.";
pub const CONTACTUS_FORM: &str = "Success! Thank you for your message.";
pub const NOT_DELIVERED: &str =
    "Sorry, messages cannot be delivered right now. Please try again later.";

const CONTACT_PATH: &str = "/contact/";

fn login_gate(state: &AppState, user: &CurrentUser) -> Option<Response> {
    (state.config.login_required_for_contact && user.user().is_none())
        .then(|| found(&login_url(CONTACT_PATH), []))
}

fn form_values(form: &ContactForm) -> FormValues {
    FormValues::from([
        ("name".to_string(), form.name.clone()),
        ("contact_email".to_string(), form.contact_email.clone()),
        ("subject".to_string(), form.subject.clone()),
        ("message".to_string(), form.message.clone()),
    ])
}

pub async fn contact_form(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
) -> Response {
    if let Some(redirect) = login_gate(&state, &user) {
        return redirect;
    }
    let mut values = FormValues::new();
    if let Some(account) = user.user() {
        values.insert("name".into(), account.username.clone());
        values.insert("contact_email".into(), account.email.clone());
    }
    let chrome = chrome(&state, &user, &flash, &csrf);
    render(
        &flash,
        pages::contact_page(chrome, &values, &Default::default(), None),
    )
}

pub async fn submit(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    if let Some(redirect) = login_gate(&state, &user) {
        return Ok(redirect);
    }
    csrf.verify(&form.csrf_token)?;

    let errors = form.validate();
    if !errors.is_empty() {
        warn!("{INVALID_FORM} {errors}");
        let chrome = chrome(&state, &user, &flash, &csrf);
        return Ok(render(
            &flash,
            pages::contact_page(chrome, &form_values(&form), &errors, Some(INVALID_FORM)),
        ));
    }

    let result = state
        .dispatcher
        .notify(&[], TemplateId::ContactMessage, &form.context())
        .await;
    let chrome = chrome(&state, &user, &flash, &csrf);
    Ok(match result {
        DispatchResult::Sent { message_id, .. } => {
            info!("Contact message from {} sent as {message_id}", form.contact_email.trim());
            render(&flash, pages::message_page(chrome, CONTACTUS_FORM, 200))
        }
        _ => render(
            &flash,
            pages::contact_page(chrome, &form_values(&form), &Default::default(), Some(NOT_DELIVERED)),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestSite;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn contact_post(body: &str) -> Request<Body> {
        Request::post(CONTACT_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, "tari_csrf=c0ffee")
            .body(Body::from(format!("{body}&csrf_token=c0ffee")))
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn valid_message_is_published_once() {
        let site = TestSite::with_transport().await;
        let app = crate::web::router(site.state.clone());

        let response = app
            .oneshot(contact_post(
                "name=Ana&contact_email=ana%40example.com&subject=Hi&message=Lovely+recipes",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains(CONTACTUS_FORM));
        let published = site.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["default"]["contact_email"], "ana@example.com");
        assert_eq!(published[0]["default"]["message"], "Lovely recipes");
    }

    #[tokio::test]
    async fn invalid_message_is_not_published() {
        let site = TestSite::with_transport().await;
        let app = crate::web::router(site.state.clone());

        let response = app
            .oneshot(contact_post("name=Ana&contact_email=nope&subject=Hi&message="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains(INVALID_FORM));
        assert!(site.published().is_empty());
    }

    #[tokio::test]
    async fn forged_post_is_not_published() {
        let site = TestSite::with_transport().await;
        let app = crate::web::router(site.state.clone());
        let request = Request::post(CONTACT_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "name=Ana&contact_email=ana%40example.com&subject=Hi&message=Hi",
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(site.published().is_empty());
    }
}
