//! Service-level forwarding tests: delivery, outcome logging, and the
//! provider-config fallback path.

use crate::channels::{ChannelError, GroupInfo, OutboundChannel, TelegramChannel};
use crate::forwarding::test_fixtures::{
    command_record, config_for, device_for, group_for, order_for,
};
use crate::forwarding::{FailReason, ForwardRequest, ForwardingService};
use crate::shared::models::Order;
use crate::store::memory::MemoryStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct MockChannel {
    sends: Mutex<Vec<(Option<Uuid>, String, String)>>,
    failing_destinations: Vec<String>,
}

impl MockChannel {
    fn failing_for(destinations: &[&str]) -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            failing_destinations: destinations.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn sent(&self) -> Vec<(Option<Uuid>, String, String)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundChannel for MockChannel {
    async fn send(
        &self,
        device_id: Option<Uuid>,
        destination: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        if self.failing_destinations.iter().any(|d| d == destination) {
            return Err(ChannelError::Request("destination unreachable".to_string()));
        }
        self.sends
            .lock()
            .unwrap()
            .push((device_id, destination.to_string(), text.to_string()));
        Ok(())
    }

    async fn list_groups(&self, _device_id: Uuid) -> Result<Vec<GroupInfo>, ChannelError> {
        Ok(Vec::new())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    channel: Arc<MockChannel>,
    service: ForwardingService,
}

fn harness(store: MemoryStore, channel: MockChannel) -> Harness {
    let store = Arc::new(store);
    let channel = Arc::new(channel);
    let service = ForwardingService::new(
        store.clone(),
        channel.clone(),
        Arc::new(TelegramChannel::new()),
    );
    Harness {
        store,
        channel,
        service,
    }
}

fn request_for(order: &Order, command: &str) -> ForwardRequest {
    ForwardRequest {
        order_id: order.id,
        command: command.to_string(),
        user_id: order.user_id,
        device_id: None,
        provider_order_id: None,
        provider_name: None,
    }
}

#[tokio::test]
async fn forwarding_updates_the_existing_command_record_once() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(Uuid::new_v4());
        g.name = "TopSmm Group".to_string();
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        records: Mutex::new(vec![command_record(order.id, "REFILL", "SUCCESS")]),
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let first = h.service.forward_command(&request_for(&order, "REFILL")).await;
    let second = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(first.success && second.success);

    let records = h.store.recorded();
    assert_eq!(records.len(), 1, "update, never insert");
    assert_eq!(records[0].forwarded_to.as_deref(), Some("TopSmm Group"));
    let response = records[0].response.as_ref().unwrap();
    assert_eq!(response["forwarded"], true);
    assert_eq!(response["groupName"], "TopSmm Group");
    assert_eq!(response["usedServiceIdRouting"], false);
}

#[tokio::test]
async fn service_id_routing_is_reported_in_outcome_and_receipt() {
    let order = order_for(|o| {
        o.provider_name = Some("TopSmm".to_string());
        o.service_id = Some("4412".to_string());
    });
    let override_group = group_for(order.panel_id, |g| {
        g.name = "Problem Services".to_string();
        g.device_id = Some(Uuid::new_v4());
        g.service_id_rules = Some(serde_json::json!({"4412": "support@g.us"}));
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![override_group],
        records: Mutex::new(vec![command_record(order.id, "CANCEL", "SUCCESS")]),
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "CANCEL")).await;
    assert!(outcome.success);
    assert!(outcome.used_service_id_routing);
    assert_eq!(outcome.service_id.as_deref(), Some("4412"));

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "support@g.us");

    let records = h.store.recorded();
    let response = records[0].response.as_ref().unwrap();
    assert_eq!(response["usedServiceIdRouting"], true);
    assert_eq!(response["serviceId"], "4412");
    assert_eq!(response["targetJid"], "support@g.us");
}

#[tokio::test]
async fn bare_number_destinations_are_normalized() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(Uuid::new_v4());
        g.group_jid = "62812345".to_string();
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(outcome.success);
    assert_eq!(h.channel.sent()[0].1, "62812345@s.whatsapp.net");
}

#[tokio::test]
async fn qualified_jids_are_sent_unchanged() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(Uuid::new_v4());
        g.group_jid = "123@g.us".to_string();
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    assert!(h.service.forward_command(&request_for(&order, "REFILL")).await.success);
    assert_eq!(h.channel.sent()[0].1, "123@g.us");
}

#[tokio::test]
async fn device_precedence_prefers_explicit_parameter() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let rule_device = Uuid::new_v4();
    let explicit_device = Uuid::new_v4();
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(rule_device);
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let mut request = request_for(&order, "REFILL");
    request.device_id = Some(explicit_device);
    assert!(h.service.forward_command(&request).await.success);
    assert_eq!(h.channel.sent()[0].0, Some(explicit_device));
}

#[tokio::test]
async fn connected_device_is_auto_resolved_when_rule_has_none() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
    });
    let disconnected = device_for(order.user_id, |d| {
        d.connection_status = "disconnected".to_string();
    });
    let connected = device_for(order.user_id, |_| {});
    let connected_id = connected.id;
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        devices: vec![disconnected, connected],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    assert!(h.service.forward_command(&request_for(&order, "REFILL")).await.success);
    assert_eq!(h.channel.sent()[0].0, Some(connected_id));
}

#[tokio::test]
async fn missing_device_fails_without_sending() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailReason::NoDevice));
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn empty_rule_destination_reports_no_target() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(Uuid::new_v4());
        g.group_jid = "  ".to_string();
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert_eq!(outcome.reason, Some(FailReason::NoTarget));
}

#[tokio::test]
async fn channel_failure_becomes_send_failed_and_skips_the_receipt() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(Uuid::new_v4());
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        records: Mutex::new(vec![command_record(order.id, "REFILL", "SUCCESS")]),
        ..Default::default()
    };
    let h = harness(store, MockChannel::failing_for(&["123@g.us"]));

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailReason::SendFailed));
    assert!(outcome.message.contains("unreachable"));
    assert!(h.store.recorded()[0].forwarded_to.is_none());
}

#[tokio::test]
async fn no_group_outcome_names_the_reason() {
    let order = order_for(|_| {});
    let store = MemoryStore {
        orders: vec![order.clone()],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailReason::NoGroup));
}

#[tokio::test]
async fn fallback_partial_success_reports_both_outcomes() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let config = config_for(order.user_id, "TopSmm", |c| {
        c.whatsapp_group_jid = Some("456@g.us".to_string());
        c.whatsapp_number = Some("62899000".to_string());
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        configs: vec![config],
        ..Default::default()
    };
    let h = harness(store, MockChannel::failing_for(&["62899000@s.whatsapp.net"]));

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(outcome.success, "partial success counts as success");
    assert!(outcome.message.contains("group 456@g.us: sent"));
    assert!(outcome.message.contains("unreachable"));
    assert_eq!(h.channel.sent().len(), 1);
}

#[tokio::test]
async fn disabled_command_skips_the_channel_entirely() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let config = config_for(order.user_id, "TopSmm", |c| c.forward_cancel = false);
    let store = MemoryStore {
        orders: vec![order.clone()],
        configs: vec![config],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "CANCEL")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailReason::Disabled));
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn new_order_has_no_disable_flag() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let config = config_for(order.user_id, "TopSmm", |c| {
        c.forward_refill = false;
        c.forward_cancel = false;
        c.forward_speedup = false;
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        configs: vec![config],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "NEW_ORDER")).await;
    assert!(outcome.success);
    assert_eq!(h.channel.sent().len(), 1);
}

#[tokio::test]
async fn telegram_only_config_is_not_attempted() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let config = config_for(order.user_id, "TopSmm", |c| {
        c.whatsapp_group_jid = None;
        c.whatsapp_number = None;
        c.telegram_chat_id = Some("-1001234".to_string());
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        configs: vec![config],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "REFILL")).await;
    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailReason::NoDestination));
    assert!(outcome.message.contains("not attempted"));
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn fallback_uses_simple_line_when_config_has_no_template() {
    let order = order_for(|o| {
        o.provider_name = Some("TopSmm".to_string());
        o.external_order_id = "55102".to_string();
        o.provider_order_id = Some("7416281".to_string());
    });
    let config = config_for(order.user_id, "TopSmm", |_| {});
    let store = MemoryStore {
        orders: vec![order.clone()],
        configs: vec![config],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    assert!(h.service.forward_command(&request_for(&order, "REFILL")).await.success);
    assert_eq!(h.channel.sent()[0].2, "7416281 refill");
}

#[tokio::test]
async fn fallback_template_substitutes_the_reduced_subset() {
    let order = order_for(|o| {
        o.provider_name = Some("TopSmm".to_string());
        o.external_order_id = "55102".to_string();
    });
    let config = config_for(order.user_id, "TopSmm", |c| {
        c.alias = Some("Top".to_string());
        c.refill_template =
            Some("{command} {externalId} via {providerAlias} ({providerName})".to_string());
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        configs: vec![config],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    assert!(h.service.forward_command(&request_for(&order, "REFILL")).await.success);
    assert_eq!(h.channel.sent()[0].2, "REFILL 55102 via Top (TopSmm)");
}

#[tokio::test]
async fn bulk_forwarding_isolates_failures_per_order() {
    let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
    let group = group_for(order.panel_id, |g| {
        g.provider_name = Some("TopSmm".to_string());
        g.device_id = Some(Uuid::new_v4());
    });
    let store = MemoryStore {
        orders: vec![order.clone()],
        groups: vec![group],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let missing = ForwardRequest {
        order_id: Uuid::new_v4(),
        command: "REFILL".to_string(),
        user_id: order.user_id,
        device_id: None,
        provider_order_id: None,
        provider_name: None,
    };
    let outcomes = h
        .service
        .forward_bulk(&[missing, request_for(&order, "REFILL")])
        .await;
    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success);
    assert!(outcomes[0].message.contains("not found"));
    assert!(outcomes[1].success);
}

#[tokio::test]
async fn unknown_command_is_rejected_without_resolution() {
    let order = order_for(|_| {});
    let store = MemoryStore {
        orders: vec![order.clone()],
        ..Default::default()
    };
    let h = harness(store, MockChannel::default());

    let outcome = h.service.forward_command(&request_for(&order, "resume")).await;
    assert!(!outcome.success);
    assert!(outcome.reason.is_none());
    assert!(outcome.message.contains("unknown command"));
}
