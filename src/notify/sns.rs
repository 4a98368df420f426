//! AWS SNS transport.

use super::{Transport, TransportError};
use async_trait::async_trait;
use aws_sdk_sns::Client;

pub struct SnsTransport {
    client: Client,
    topic_arn: String,
}

impl SnsTransport {
    pub fn new(client: Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }

    /// Client from the default AWS credential chain.
    pub async fn from_config(topic_arn: &str, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let client = Client::new(&loader.load().await);
        Self::new(client, topic_arn)
    }
}

#[async_trait]
impl Transport for SnsTransport {
    async fn publish(&self, message: &str) -> Result<String, TransportError> {
        let output = self
            .client
            .publish()
            .target_arn(&self.topic_arn)
            .message(message)
            .send()
            .await
            .map_err(|e| TransportError::Publish(e.into_service_error().to_string()))?;
        Ok(output.message_id().unwrap_or_default().to_string())
    }
}
