//! Fallback delivery through per-provider alias configs.
//!
//! Used only when no routing rule resolves. A config may fan out to up to
//! three destinations (WhatsApp group, WhatsApp number, Telegram chat); each
//! is attempted independently and partial success counts as overall success.

use crate::channels::{normalize_destination, ChannelError, OutboundChannel};
use crate::commands::ForwardCommand;
use crate::forwarding::delivery::COMMAND_STATUS_SUCCESS;
use crate::forwarding::templates;
use crate::forwarding::{FailReason, ForwardOutcome};
use crate::shared::models::{ForwardReceipt, ForwardRoute, Order, ProviderConfig};
use crate::store::RoutingStore;
use chrono::Utc;
use log::{info, warn};
use std::collections::HashMap;
use uuid::Uuid;

pub struct FallbackRequest<'a> {
    pub config: &'a ProviderConfig,
    pub command: ForwardCommand,
    pub order: &'a Order,
    pub provider_order_id: Option<&'a str>,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
}

pub async fn deliver(
    store: &dyn RoutingStore,
    whatsapp: &dyn OutboundChannel,
    telegram: &dyn OutboundChannel,
    request: FallbackRequest<'_>,
) -> ForwardOutcome {
    let config = request.config;
    let order = request.order;

    if !command_enabled(config, request.command) {
        return ForwardOutcome::failure(
            FailReason::Disabled,
            format!(
                "{} forwarding is disabled for provider {}",
                request.command,
                config.label()
            ),
        );
    }

    let group_jid = non_empty(config.whatsapp_group_jid.as_deref());
    let number = non_empty(config.whatsapp_number.as_deref());
    let telegram_chat = non_empty(config.telegram_chat_id.as_deref());

    if group_jid.is_none() && number.is_none() && telegram_chat.is_none() {
        return ForwardOutcome::failure(
            FailReason::NoDestination,
            format!("Provider {} has no destination configured", config.label()),
        );
    }

    let text = render(config, request.command, order, request.provider_order_id);

    let device_id = if group_jid.is_some() || number.is_some() {
        match resolve_device(store, &request).await {
            Ok(device_id) => Some(device_id),
            Err(outcome) => return *outcome,
        }
    } else {
        None
    };

    let mut notes: Vec<String> = Vec::new();
    let mut sent_to: Option<String> = None;
    let mut attempted = 0usize;
    let mut succeeded = 0usize;

    for (label, destination) in [("group", group_jid), ("number", number)] {
        let Some(destination) = destination else {
            continue;
        };
        // device_id is always Some when a WhatsApp destination exists
        let Some(device_id) = device_id else { continue };
        attempted += 1;
        let target = normalize_destination(destination);
        match whatsapp.send(Some(device_id), &target, &text).await {
            Ok(()) => {
                succeeded += 1;
                sent_to.get_or_insert(target);
                notes.push(format!("{} {}: sent", label, destination));
            }
            Err(e) => notes.push(format!("{} {}: {}", label, destination, e)),
        }
    }

    if let Some(chat_id) = telegram_chat {
        // Telegram needs a bot integration this deployment does not carry;
        // report it as not attempted rather than as a failure.
        let telegram_device = device_id.or(config.device_id);
        match telegram.send(telegram_device, chat_id, &text).await {
            Err(ChannelError::Unsupported(channel)) => {
                notes.push(format!("telegram {}: not attempted ({} unsupported)", chat_id, channel));
            }
            Ok(()) => {
                succeeded += 1;
                attempted += 1;
                notes.push(format!("telegram {}: sent", chat_id));
            }
            Err(e) => {
                attempted += 1;
                notes.push(format!("telegram {}: {}", chat_id, e));
            }
        }
    }

    let summary = notes.join("; ");

    if succeeded > 0 {
        info!(
            "Forwarded {} for order {} via provider config {}: {}",
            request.command, order.external_order_id, config.label(), summary
        );
        let receipt = ForwardReceipt {
            forwarded: true,
            route: ForwardRoute::ProviderConfig,
            group_id: config.whatsapp_group_jid.clone(),
            group_name: Some(config.label().to_string()),
            provider_name: Some(config.provider_name.clone()),
            provider_order_id: request
                .provider_order_id
                .map(str::to_string)
                .or(order.provider_order_id.clone()),
            used_service_id_routing: false,
            service_id: order.service_id.clone(),
            target_jid: sent_to,
            timestamp: Utc::now(),
        };
        if let Err(e) = store
            .record_forwarded(
                order.id,
                &request.command.to_string(),
                COMMAND_STATUS_SUCCESS,
                config.label(),
                &receipt,
            )
            .await
        {
            warn!(
                "Failed to record forwarding receipt for order {} ({}): {}",
                order.external_order_id, request.command, e
            );
        }
        return ForwardOutcome {
            success: true,
            reason: None,
            message: summary,
            group_name: Some(config.label().to_string()),
            used_service_id_routing: false,
            service_id: None,
        };
    }

    if attempted > 0 {
        ForwardOutcome::failure(FailReason::SendFailed, summary)
    } else {
        // Only a Telegram chat was configured and it could not be attempted.
        ForwardOutcome::failure(FailReason::NoDestination, summary)
    }
}

fn command_enabled(config: &ProviderConfig, command: ForwardCommand) -> bool {
    match command {
        ForwardCommand::NewOrder => true,
        ForwardCommand::Refill => config.forward_refill,
        ForwardCommand::Cancel => config.forward_cancel,
        ForwardCommand::SpeedUp => config.forward_speedup,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reduced substitution set for alias configs; falls back to the simple
/// `"id verb"` line when the config has no template for the command.
fn render(
    config: &ProviderConfig,
    command: ForwardCommand,
    order: &Order,
    provider_order_id: Option<&str>,
) -> String {
    let template = match command {
        ForwardCommand::NewOrder => config.new_order_template.as_deref(),
        ForwardCommand::Refill => config.refill_template.as_deref(),
        ForwardCommand::Cancel => config.cancel_template.as_deref(),
        ForwardCommand::SpeedUp => config.speedup_template.as_deref(),
    };
    let Some(template) = template else {
        return format!(
            "{} {}",
            templates::display_id(order, provider_order_id),
            command.verb()
        );
    };

    let mut vars: HashMap<&'static str, String> = HashMap::new();
    vars.insert("externalid", order.external_order_id.clone());
    vars.insert("orderid", order.external_order_id.clone());
    vars.insert("command", command.to_string());
    vars.insert("providername", config.provider_name.clone());
    vars.insert("provideralias", config.label().to_string());
    templates::substitute(template, &vars)
}

/// Explicit device > config device > first connected device for the user.
async fn resolve_device(
    store: &dyn RoutingStore,
    request: &FallbackRequest<'_>,
) -> Result<Uuid, Box<ForwardOutcome>> {
    if let Some(device_id) = request.device_id {
        return Ok(device_id);
    }
    if let Some(device_id) = request.config.device_id {
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
