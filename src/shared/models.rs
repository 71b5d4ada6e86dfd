use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub use super::schema;
pub use super::schema::{
    devices, order_commands, orders, panels, provider_configs, provider_groups, users,
};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An upstream SMM reseller panel the user integrates with.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = panels)]
pub struct Panel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Panel {
    /// Operator-facing label: alias when set, raw panel name otherwise.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A connected outbound messaging account (one WhatsApp session per device).
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = devices)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub connection_status: String,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn is_connected(&self) -> bool {
        self.connection_status == "connected"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub panel_id: Uuid,
    pub external_order_id: String,
    pub provider_order_id: Option<String>,
    pub provider_name: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub link: Option<String>,
    pub quantity: i32,
    pub remains: Option<i32>,
    pub start_count: Option<i32>,
    pub status: String,
    pub charge: Option<BigDecimal>,
    pub can_refill: bool,
    pub can_cancel: bool,
    pub has_guarantee: bool,
    pub customer_username: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A configured forwarding destination for a panel, optionally scoped to a
/// provider. `provider_name = NULL` marks the panel default; `is_manual_service`
/// marks the catch-all for orders with no external provider.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = provider_groups)]
pub struct ProviderGroup {
    pub id: Uuid,
    pub panel_id: Uuid,
    pub provider_name: Option<String>,
    pub device_id: Option<Uuid>,
    pub group_jid: String,
    pub name: String,
    pub new_order_template: Option<String>,
    pub refill_template: Option<String>,
    pub cancel_template: Option<String>,
    pub speedup_template: Option<String>,
    pub custom_template: Option<String>,
    pub use_simple_format: bool,
    pub is_manual_service: bool,
    pub service_id_rules: Option<serde_json::Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ProviderGroup {
    /// Per-service destination overrides, parsed once at the storage boundary.
    pub fn service_rules(&self) -> ServiceIdRules {
        self.service_id_rules
            .as_ref()
            .map(ServiceIdRules::from_value)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = provider_groups)]
#[serde(rename_all = "camelCase")]
pub struct NewProviderGroup {
    pub panel_id: Uuid,
    pub provider_name: Option<String>,
    pub device_id: Option<Uuid>,
    pub group_jid: String,
    pub name: String,
    pub new_order_template: Option<String>,
    pub refill_template: Option<String>,
    pub cancel_template: Option<String>,
    pub speedup_template: Option<String>,
    pub custom_template: Option<String>,
    #[serde(default)]
    pub use_simple_format: bool,
    #[serde(default)]
    pub is_manual_service: bool,
    pub service_id_rules: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, AsChangeset)]
#[diesel(table_name = provider_groups)]
#[serde(rename_all = "camelCase")]
pub struct ProviderGroupChanges {
    pub provider_name: Option<String>,
    pub device_id: Option<Uuid>,
    pub group_jid: Option<String>,
    pub name: Option<String>,
    pub new_order_template: Option<String>,
    pub refill_template: Option<String>,
    pub cancel_template: Option<String>,
    pub speedup_template: Option<String>,
    pub custom_template: Option<String>,
    pub use_simple_format: Option<bool>,
    pub is_manual_service: Option<bool>,
    pub service_id_rules: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl ProviderGroupChanges {
    /// True when the request carried no updatable field. Diesel rejects an
    /// empty changeset at runtime, so handlers must check this first.
    pub fn is_empty(&self) -> bool {
        self.provider_name.is_none()
            && self.device_id.is_none()
            && self.group_jid.is_none()
            && self.name.is_none()
            && self.new_order_template.is_none()
            && self.refill_template.is_none()
            && self.cancel_template.is_none()
            && self.speedup_template.is_none()
            && self.custom_template.is_none()
            && self.use_simple_format.is_none()
            && self.is_manual_service.is_none()
            && self.service_id_rules.is_none()
            && self.is_active.is_none()
    }
}

/// Simpler provider-name-keyed destination used only when no provider group
/// resolves for an order.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = provider_configs)]
pub struct ProviderConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_name: String,
    pub alias: Option<String>,
    pub forward_refill: bool,
    pub forward_cancel: bool,
    pub forward_speedup: bool,
    pub whatsapp_group_jid: Option<String>,
    pub whatsapp_number: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub device_id: Option<Uuid>,
    pub new_order_template: Option<String>,
    pub refill_template: Option<String>,
    pub cancel_template: Option<String>,
    pub speedup_template: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ProviderConfig {
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.provider_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = provider_configs)]
#[serde(rename_all = "camelCase")]
pub struct NewProviderConfig {
    pub user_id: Uuid,
    pub provider_name: String,
    pub alias: Option<String>,
    #[serde(default = "default_true")]
    pub forward_refill: bool,
    #[serde(default = "default_true")]
    pub forward_cancel: bool,
    #[serde(default = "default_true")]
    pub forward_speedup: bool,
    pub whatsapp_group_jid: Option<String>,
    pub whatsapp_number: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub device_id: Option<Uuid>,
    pub new_order_template: Option<String>,
    pub refill_template: Option<String>,
    pub cancel_template: Option<String>,
    pub speedup_template: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, AsChangeset)]
#[diesel(table_name = provider_configs)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigChanges {
    pub provider_name: Option<String>,
    pub alias: Option<String>,
    pub forward_refill: Option<bool>,
    pub forward_cancel: Option<bool>,
    pub forward_speedup: Option<bool>,
    pub whatsapp_group_jid: Option<String>,
    pub whatsapp_number: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub device_id: Option<Uuid>,
    pub new_order_template: Option<String>,
    pub refill_template: Option<String>,
    pub cancel_template: Option<String>,
    pub speedup_template: Option<String>,
    pub is_active: Option<bool>,
}

impl ProviderConfigChanges {
    /// True when the request carried no updatable field. Diesel rejects an
    /// empty changeset at runtime, so handlers must check this first.
    pub fn is_empty(&self) -> bool {
        self.provider_name.is_none()
            && self.alias.is_none()
            && self.forward_refill.is_none()
            && self.forward_cancel.is_none()
            && self.forward_speedup.is_none()
            && self.whatsapp_group_jid.is_none()
            && self.whatsapp_number.is_none()
            && self.telegram_chat_id.is_none()
            && self.device_id.is_none()
            && self.new_order_template.is_none()
            && self.refill_template.is_none()
            && self.cancel_template.is_none()
            && self.speedup_template.is_none()
            && self.is_active.is_none()
    }
}

/// Audit row for one forwarding attempt of one order+command pair. Created by
/// order processing when the upstream command succeeds; this crate only
/// updates `forwarded_to`/`response` on the existing row.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = order_commands)]
pub struct OrderCommand {
    pub id: Uuid,
    pub order_id: Uuid,
    pub command: String,
    pub status: String,
    pub forwarded_to: Option<String>,
    pub response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Typed view over the `service_id_rules` JSON column: serviceId string ->
/// destination override. Malformed stored JSON degrades to an empty map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdRules(HashMap<String, String>);

impl ServiceIdRules {
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn destination_for(&self, service_id: &str) -> Option<&str> {
        self.0.get(service_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Structured delivery outcome persisted on the order_commands row. Serialized
/// to the `response` JSONB column at the storage boundary only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardReceipt {
    pub forwarded: bool,
    pub route: ForwardRoute,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub provider_name: Option<String>,
    pub provider_order_id: Option<String>,
    pub used_service_id_routing: bool,
    pub service_id: Option<String>,
    pub target_jid: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Which resolution path produced the delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardRoute {
    ProviderGroup,
    ProviderConfig,
}
