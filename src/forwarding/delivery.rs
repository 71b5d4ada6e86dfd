//! Delivery and outcome logging for rule-resolved destinations.

use crate::channels::{normalize_destination, OutboundChannel};
use crate::commands::ForwardCommand;
use crate::forwarding::resolver::ResolvedRule;
use crate::forwarding::templates;
use crate::forwarding::{FailReason, ForwardOutcome};
use crate::shared::models::{ForwardReceipt, ForwardRoute, Order, Panel};
use crate::store::RoutingStore;
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

/// Command records are written by order processing with this status once the
/// upstream command succeeds; delivery updates that same row.
pub const COMMAND_STATUS_SUCCESS: &str = "SUCCESS";

pub struct DeliveryRequest<'a> {
    pub order: &'a Order,
    pub command: ForwardCommand,
    pub rule: &'a ResolvedRule,
    pub panel: Option<&'a Panel>,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub provider_order_id: Option<&'a str>,
}

pub async fn deliver(
    store: &dyn RoutingStore,
    channel: &dyn OutboundChannel,
    request: DeliveryRequest<'_>,
) -> ForwardOutcome {
    let rule = request.rule;
    let order = request.order;

    let device_id = match resolve_device(store, &request).await {
        Ok(device_id) => device_id,
        Err(outcome) => return *outcome,
    };

    let destination = rule.destination.trim();
    if destination.is_empty() {
        return ForwardOutcome::failure(
            FailReason::NoTarget,
            format!(
                "Routing rule {} has no destination configured",
                rule.group.name
            ),
        );
    }

    let text = templates::format(
        request.command,
        order,
        &rule.group,
        request.panel,
        request.provider_order_id,
    );
    let target_jid = normalize_destination(destination);

    if let Err(e) = channel.send(Some(device_id), &target_jid, &text).await {
        return ForwardOutcome::failure(FailReason::SendFailed, e.to_string());
    }

    let receipt = ForwardReceipt {
        forwarded: true,
        route: ForwardRoute::ProviderGroup,
        group_id: Some(rule.group.group_jid.clone()),
        group_name: Some(rule.group.name.clone()),
        provider_name: rule.group.provider_name.clone().or(order.provider_name.clone()),
        provider_order_id: request
            .provider_order_id
            .map(str::to_string)
            .or(order.provider_order_id.clone()),
        used_service_id_routing: rule.used_service_id_routing,
        service_id: rule.service_id.clone(),
        target_jid: Some(target_jid),
        timestamp: Utc::now(),
    };

    // A receipt-write failure must never mask a successful delivery.
    if let Err(e) = store
        .record_forwarded(
            order.id,
            &request.command.to_string(),
            COMMAND_STATUS_SUCCESS,
            &rule.group.name,
            &receipt,
        )
        .await
    {
        warn!(
            "Failed to record forwarding receipt for order {} ({}): {}",
            order.external_order_id, request.command, e
        );
    }

    ForwardOutcome {
        success: true,
        reason: None,
        message: format!(
            "Forwarded {} for order {} to {}",
            request.command,
            templates::display_id(order, request.provider_order_id),
            rule.group.name
        ),
        group_name: Some(rule.group.name.clone()),
        used_service_id_routing: rule.used_service_id_routing,
        service_id: rule.service_id.clone(),
    }
}

/// Explicit device > rule device > first connected device for the user.
async fn resolve_device(
    store: &dyn RoutingStore,
    request: &DeliveryRequest<'_>,
) -> Result<Uuid, Box<ForwardOutcome>> {
    if let Some(device_id) = request.device_id {
        return Ok(device_id);
    }
    if let Some(device_id) = request.rule.group.device_id {
        return Ok(device_id);
    }
    match store.find_connected_device(request.user_id).await {
        Ok(Some(device)) => {
            info!(
                "Auto-resolved device {} ({}) for order {}",
                device.id, device.label, request.order.external_order_id
            );
            Ok(device.id)
        }
        Ok(None) => Err(Box::new(ForwardOutcome::failure(
            FailReason::NoDevice,
            "No connected device available to send from",
        ))),
        Err(e) => Err(Box::new(ForwardOutcome::failure(
            FailReason::SendFailed,
            e.to_string(),
        ))),
    }
}
