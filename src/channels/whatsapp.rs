//! WhatsApp outbound channel.
//!
//! Talks to a self-hosted multi-device gateway that owns the actual WhatsApp
//! sessions; one gateway device corresponds to one connected account.

use crate::channels::{ChannelError, GroupInfo, OutboundChannel};
use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub struct WhatsAppGateway {
    client: Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    device_id: Uuid,
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListGroupsResponse {
    #[serde(default)]
    groups: Vec<GatewayGroup>,
}

#[derive(Debug, Deserialize)]
struct GatewayGroup {
    jid: String,
    #[serde(default)]
    subject: String,
}

impl WhatsAppGateway {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ChannelError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl OutboundChannel for WhatsAppGateway {
    async fn send(
        &self,
        device_id: Option<Uuid>,
        destination: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let Some(device_id) = device_id else {
            return Err(ChannelError::Request(
                "no sending device selected".to_string(),
            ));
        };
        debug!("Sending WhatsApp message via device {} to {}", device_id, destination);
        let response = self
            .client
            .post(format!("{}/send/message", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&SendMessageRequest {
                device_id,
                to: destination,
                text,
            })
            .send()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_groups(&self, device_id: Uuid) -> Result<Vec<GroupInfo>, ChannelError> {
        let response = self
            .client
            .get(format!("{}/devices/{}/groups", self.base_url, device_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;
        let parsed: ListGroupsResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;
        Ok(parsed
            .groups
            .into_iter()
            .map(|g| GroupInfo {
                jid: g.jid,
                name: g.subject,
            })
            .collect())
    }
}
