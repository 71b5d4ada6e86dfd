use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod telegram;
pub mod whatsapp;

pub use telegram::TelegramChannel;
pub use whatsapp::WhatsAppGateway;

#[cfg(test)]
#[path = "channels.test.rs"]
mod channels_test;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel request failed: {0}")]
    Request(String),
    #[error("channel returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0} forwarding is not supported on this deployment")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub jid: String,
    pub name: String,
}

/// Outbound messaging capability. Implementations either deliver the text to
/// the destination address or fail with a `ChannelError`; unsupported channels
/// report `ChannelError::Unsupported` synchronously instead of silently
/// dropping the message. `device_id` is `None` when no sending session applies
/// to the channel; adapters that need one must reject the call.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    async fn send(
        &self,
        device_id: Option<Uuid>,
        destination: &str,
        text: &str,
    ) -> Result<(), ChannelError>;

    async fn list_groups(&self, device_id: Uuid) -> Result<Vec<GroupInfo>, ChannelError>;
}

/// A destination with no "@" separator is a bare phone number and is addressed
/// as a direct message; anything else is already a fully qualified JID.
pub fn normalize_destination(destination: &str) -> String {
    if destination.contains('@') {
        destination.to_string()
    } else {
        let digits: String = destination.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("{}@s.whatsapp.net", digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_becomes_direct_jid() {
        assert_eq!(normalize_destination("62812345"), "62812345@s.whatsapp.net");
    }

    #[test]
    fn formatted_number_is_stripped_to_digits() {
        assert_eq!(
            normalize_destination("+62 812-345"),
            "62812345@s.whatsapp.net"
        );
    }

    #[test]
    fn qualified_jid_passes_through() {
        assert_eq!(normalize_destination("123@g.us"), "123@g.us");
        assert_eq!(
            normalize_destination("62812345@s.whatsapp.net"),
            "62812345@s.whatsapp.net"
        );
    }
}
