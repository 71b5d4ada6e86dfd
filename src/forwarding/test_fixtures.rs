//! Builders for routing test data.

use crate::shared::models::{Device, Order, OrderCommand, Panel, ProviderConfig, ProviderGroup};
use chrono::Utc;
use uuid::Uuid;

pub fn order_for(mutate: impl FnOnce(&mut Order)) -> Order {
    let mut order = Order {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        panel_id: Uuid::new_v4(),
        external_order_id: "55102".to_string(),
        provider_order_id: None,
        provider_name: None,
        service_id: None,
        service_name: Some("Instagram Followers".to_string()),
        link: Some("https://example.com/profile".to_string()),
        quantity: 1000,
        remains: Some(0),
        start_count: Some(120),
        status: "Completed".to_string(),
        charge: None,
        can_refill: false,
        can_cancel: false,
        has_guarantee: false,
        customer_username: None,
        customer_email: None,
        customer_phone: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    mutate(&mut order);
    order
}

pub fn group_for(panel_id: Uuid, mutate: impl FnOnce(&mut ProviderGroup)) -> ProviderGroup {
    let mut group = ProviderGroup {
        id: Uuid::new_v4(),
        panel_id,
        provider_name: None,
        device_id: None,
        group_jid: "123@g.us".to_string(),
        name: "Provider Support".to_string(),
        new_order_template: None,
        refill_template: None,
        cancel_template: None,
        speedup_template: None,
        custom_template: None,
        use_simple_format: false,
        is_manual_service: false,
        service_id_rules: None,
        is_active: true,
        created_at: Utc::now(),
    };
    mutate(&mut group);
    group
}

pub fn config_for(
    user_id: Uuid,
    provider_name: &str,
    mutate: impl FnOnce(&mut ProviderConfig),
) -> ProviderConfig {
    let mut config = ProviderConfig {
        id: Uuid::new_v4(),
        user_id,
        provider_name: provider_name.to_string(),
        alias: None,
        forward_refill: true,
        forward_cancel: true,
        forward_speedup: true,
        whatsapp_group_jid: Some("456@g.us".to_string()),
        whatsapp_number: None,
        telegram_chat_id: None,
        device_id: Some(Uuid::new_v4()),
        new_order_template: None,
        refill_template: None,
        cancel_template: None,
        speedup_template: None,
        is_active: true,
        created_at: Utc::now(),
    };
    mutate(&mut config);
    config
}

pub fn panel_for(panel_id: Uuid, user_id: Uuid, mutate: impl FnOnce(&mut Panel)) -> Panel {
    let mut panel = Panel {
        id: panel_id,
        user_id,
        name: "smm-panel".to_string(),
        alias: None,
        url: "https://panel.example.com".to_string(),
        api_key: "secret".to_string(),
        is_active: true,
        created_at: Utc::now(),
    };
    mutate(&mut panel);
    panel
}

pub fn device_for(user_id: Uuid, mutate: impl FnOnce(&mut Device)) -> Device {
    let mut device = Device {
        id: Uuid::new_v4(),
        user_id,
        label: "primary".to_string(),
        connection_status: "connected".to_string(),
        created_at: Utc::now(),
    };
    mutate(&mut device);
    device
}

pub fn command_record(order_id: Uuid, command: &str, status: &str) -> OrderCommand {
    OrderCommand {
        id: Uuid::new_v4(),
        order_id,
        command: command.to_string(),
        status: status.to_string(),
        forwarded_to: None,
        response: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
