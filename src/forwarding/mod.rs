//! Provider-group command routing: resolves where an order command should be
//! delivered, renders the message, sends it, and records the outcome.

use crate::channels::{ChannelError, GroupInfo, OutboundChannel};
use crate::commands::ForwardCommand;
use crate::shared::state::AppState;
use crate::store::RoutingStore;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub mod delivery;
pub mod provider_config;
pub mod resolver;
pub mod templates;

#[cfg(test)]
pub mod test_fixtures;

#[cfg(test)]
#[path = "forwarding.test.rs"]
mod forwarding_test;

/// Why a forwarding attempt did not deliver. All of these are result values
/// reported to the caller, never errors thrown across the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    NoGroup,
    NoDevice,
    NoTarget,
    Disabled,
    SendFailed,
    NoDestination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailReason>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub used_service_id_routing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

impl ForwardOutcome {
    pub fn failure(reason: FailReason, message: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            message: message.into(),
            group_name: None,
            used_service_id_routing: false,
            service_id: None,
        }
    }

    /// Request-level rejection (bad command token, unknown order) that is not
    /// part of the forwarding failure taxonomy.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: None,
            message: message.into(),
            group_name: None,
            used_service_id_routing: false,
            service_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    pub order_id: Uuid,
    pub command: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub device_id: Option<Uuid>,
    #[serde(default)]
    pub provider_order_id: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkForwardRequest {
    pub commands: Vec<ForwardRequest>,
}

/// Forwarding core, constructed once at startup with its store and channel
/// dependencies.
pub struct ForwardingService {
    store: Arc<dyn RoutingStore>,
    whatsapp: Arc<dyn OutboundChannel>,
    telegram: Arc<dyn OutboundChannel>,
}

impl ForwardingService {
    pub fn new(
        store: Arc<dyn RoutingStore>,
        whatsapp: Arc<dyn OutboundChannel>,
        telegram: Arc<dyn OutboundChannel>,
    ) -> Self {
        Self {
            store,
            whatsapp,
            telegram,
        }
    }

    pub async fn forward_command(&self, request: &ForwardRequest) -> ForwardOutcome {
        let command = match request.command.parse::<ForwardCommand>() {
            Ok(command) => command,
            Err(e) => return ForwardOutcome::rejected(e.to_string()),
        };

        let order = match self.store.find_order(request.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                return ForwardOutcome::rejected(format!("Order {} not found", request.order_id))
            }
            Err(e) => return ForwardOutcome::failure(FailReason::SendFailed, e.to_string()),
        };

        let panel = match self.store.find_panel(order.panel_id).await {
            Ok(panel) => panel,
            Err(e) => {
                error!("Panel lookup failed for order {}: {}", order.external_order_id, e);
                None
            }
        };

        let provider_order_id = request.provider_order_id.as_deref();
        let provider_name = request.provider_name.as_deref();

        match resolver::resolve(&*self.store, &order, provider_order_id, provider_name).await {
            Ok(resolver::ResolvedTarget::Rule(rule)) => {
                delivery::deliver(
                    &*self.store,
                    &*self.whatsapp,
                    delivery::DeliveryRequest {
                        order: &order,
                        command,
                        rule: &rule,
                        panel: panel.as_ref(),
                        user_id: request.user_id,
                        device_id: request.device_id,
                        provider_order_id,
                    },
                )
                .await
            }
            Ok(resolver::ResolvedTarget::Fallback(config)) => {
                provider_config::deliver(
                    &*self.store,
                    &*self.whatsapp,
                    &*self.telegram,
                    provider_config::FallbackRequest {
                        config: &config,
                        command,
                        order: &order,
                        provider_order_id,
                        user_id: request.user_id,
                        device_id: request.device_id,
                    },
                )
                .await
            }
            Err(resolver::ResolveError::NoGroup { message }) => {
                ForwardOutcome::failure(FailReason::NoGroup, message)
            }
            Err(resolver::ResolveError::Store(e)) => {
                error!("Routing lookup failed for order {}: {}", order.external_order_id, e);
                ForwardOutcome::failure(FailReason::SendFailed, e.to_string())
            }
        }
    }

    /// Forwards each order independently; one order's failure never aborts
    /// the batch.
    pub async fn forward_bulk(&self, requests: &[ForwardRequest]) -> Vec<ForwardOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.forward_command(request).await);
        }
        outcomes
    }

    pub async fn list_groups(&self, device_id: Uuid) -> Result<Vec<GroupInfo>, ChannelError> {
        self.whatsapp.list_groups(device_id).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsQuery {
    pub device_id: Uuid,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/forwarding/command", post(forward_command))
        .route("/api/forwarding/bulk", post(forward_bulk))
        .route("/api/forwarding/groups", get(list_groups))
}

async fn forward_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForwardRequest>,
) -> Json<ForwardOutcome> {
    Json(state.forwarder.forward_command(&request).await)
}

async fn forward_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkForwardRequest>,
) -> Json<Vec<ForwardOutcome>> {
    Json(state.forwarder.forward_bulk(&request.commands).await)
}

async fn list_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupsQuery>,
) -> impl IntoResponse {
    match state.forwarder.list_groups(query.device_id).await {
        Ok(groups) => (StatusCode::OK, Json(serde_json::json!({ "groups": groups }))),
        Err(e) => {
            error!("Failed to list groups for device {}: {}", query.device_id, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}
