//! In-memory `RoutingStore` double for unit tests.

use crate::shared::models::{
    Device, ForwardReceipt, Order, OrderCommand, Panel, ProviderConfig, ProviderGroup,
};
use crate::store::{RoutingStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    pub orders: Vec<Order>,
    pub panels: Vec<Panel>,
    pub groups: Vec<ProviderGroup>,
    pub configs: Vec<ProviderConfig>,
    pub devices: Vec<Device>,
    pub records: Mutex<Vec<OrderCommand>>,
}

impl MemoryStore {
    pub fn recorded(&self) -> Vec<OrderCommand> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoutingStore for MemoryStore {
    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn find_panel(&self, panel_id: Uuid) -> Result<Option<Panel>, StoreError> {
        Ok(self.panels.iter().find(|p| p.id == panel_id).cloned())
    }

    async fn active_groups_for_panel(
        &self,
        panel_id: Uuid,
    ) -> Result<Vec<ProviderGroup>, StoreError> {
        let mut groups: Vec<ProviderGroup> = self
            .groups
            .iter()
            .filter(|g| g.panel_id == panel_id && g.is_active)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }

    async fn groups_with_service_rules(
        &self,
        panel_id: Uuid,
    ) -> Result<Vec<ProviderGroup>, StoreError> {
        let mut groups: Vec<ProviderGroup> = self
            .groups
            .iter()
            .filter(|g| g.panel_id == panel_id && g.is_active && g.service_id_rules.is_some())
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }

    async fn find_provider_config(
        &self,
        user_id: Uuid,
        provider_names: &[String],
    ) -> Result<Option<ProviderConfig>, StoreError> {
        let mut configs: Vec<ProviderConfig> = self
            .configs
            .iter()
            .filter(|c| {
                c.user_id == user_id
                    && c.is_active
                    && provider_names.contains(&c.provider_name)
            })
            .cloned()
            .collect();
        configs.sort_by_key(|c| c.created_at);
        Ok(configs.into_iter().next())
    }

    async fn find_connected_device(&self, user_id: Uuid) -> Result<Option<Device>, StoreError> {
        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.user_id == user_id && d.is_connected())
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.created_at);
        Ok(devices.into_iter().next())
    }

    async fn record_forwarded(
        &self,
        order_id: Uuid,
        command: &str,
        status: &str,
        forwarded_to: &str,
        receipt: &ForwardReceipt,
    ) -> Result<usize, StoreError> {
        let receipt_json = serde_json::to_value(receipt)?;
        let mut records = self.records.lock().unwrap();
        let mut touched = 0;
        for record in records.iter_mut() {
            if record.order_id == order_id && record.command == command && record.status == status
            {
                record.forwarded_to = Some(forwarded_to.to_string());
                record.response = Some(receipt_json.clone());
                record.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }
}
