//! Fire-and-forget notifications.
//!
//! [`Dispatcher::notify`] renders a template into a JSON payload and hands it
//! to a [`Transport`] (SNS in production). It never fails: every outcome,
//! including a missing topic or a transport error, is reported as a
//! [`DispatchResult`] and logged, so the save or form submission that
//! triggered it always completes.
//!
//! The published message is the JSON text `{"default": <payload>}`.

pub mod sns;

use crate::config::NotificationsConfig;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub use sns::SnsTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Delivery channel for rendered messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish `message`, returning the provider's message id.
    async fn publish(&self, message: &str) -> Result<String, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    /// One entry per recipient announcing a newly created item.
    NewItem,
    /// The submitted contact form, forwarded to the site owners.
    ContactMessage,
}

impl TemplateId {
    fn context_keys(self) -> &'static [&'static str] {
        match self {
            TemplateId::NewItem => &["item_name", "item_page_url", "item_image_url"],
            TemplateId::ContactMessage => &["name", "contact_email", "subject", "message"],
        }
    }

    fn addresses_recipients(self) -> bool {
        matches!(self, TemplateId::NewItem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub username: String,
    pub email: String,
}

pub type Context = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Sent { message_id: String, recipients: usize },
    NoRecipients,
    NotConfigured,
    TransportError(String),
}

impl DispatchResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchResult::Sent { .. })
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Option<Arc<dyn Transport>>,
    base_url: String,
}

impl Dispatcher {
    pub fn new(transport: Option<Arc<dyn Transport>>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /// SNS-backed dispatcher, or an unconfigured one when no topic is set.
    pub async fn from_config(config: &NotificationsConfig, base_url: &str) -> Self {
        let transport = match &config.sns_topic_arn {
            Some(arn) => {
                let transport: Arc<dyn Transport> =
                    Arc::new(SnsTransport::from_config(arn, config.region.as_deref()).await);
                Some(transport)
            }
            None => None,
        };
        Self::new(transport, base_url)
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Render the payload for `template`. Missing context keys render as
    /// empty strings.
    pub fn render(&self, template: TemplateId, recipients: &[Recipient], context: &Context) -> Value {
        let mut fields = Map::new();
        for key in template.context_keys() {
            let value = context.get(*key).cloned().unwrap_or_else(|| {
                warn!("Notification context for {template:?} is missing {key}");
                String::new()
            });
            fields.insert((*key).to_string(), Value::String(value));
        }

        match template {
            TemplateId::NewItem => Value::Array(
                recipients
                    .iter()
                    .map(|r| {
                        let mut entry = fields.clone();
                        entry.insert("base_url".into(), json!(self.base_url));
                        entry.insert("username".into(), json!(r.username));
                        entry.insert("email".into(), json!(r.email));
                        Value::Object(entry)
                    })
                    .collect(),
            ),
            TemplateId::ContactMessage => Value::Object(fields),
        }
    }

    pub async fn notify(
        &self,
        recipients: &[Recipient],
        template: TemplateId,
        context: &Context,
    ) -> DispatchResult {
        let Some(transport) = &self.transport else {
            warn!("Notifications are not configured; dropping {template:?}");
            return DispatchResult::NotConfigured;
        };
        if template.addresses_recipients() && recipients.is_empty() {
            info!("No recipients for {template:?}");
            return DispatchResult::NoRecipients;
        }

        let message = json!({ "default": self.render(template, recipients, context) }).to_string();
        match transport.publish(&message).await {
            Ok(message_id) => {
                info!("Published {template:?} as {message_id}");
                DispatchResult::Sent {
                    message_id,
                    recipients: recipients.len(),
                }
            }
            Err(e) => {
                warn!("Failed to publish {template:?}: {e}");
                DispatchResult::TransportError(e.to_string())
            }
        }
    }
}
