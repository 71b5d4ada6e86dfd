//! Telegram outbound channel placeholder.
//!
//! Telegram delivery requires an external bot integration this deployment does
//! not carry; the adapter reports the capability as unsupported so callers and
//! tests can assert on the unimplemented path explicitly.

use crate::channels::{ChannelError, GroupInfo, OutboundChannel};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Default)]
pub struct TelegramChannel;

impl TelegramChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutboundChannel for TelegramChannel {
    async fn send(
        &self,
        _device_id: Option<Uuid>,
        _destination: &str,
        _text: &str,
    ) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported("telegram"))
    }

    async fn list_groups(&self, _device_id: Uuid) -> Result<Vec<GroupInfo>, ChannelError> {
        Err(ChannelError::Unsupported("telegram"))
    }
}
