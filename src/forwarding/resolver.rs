//! Destination resolution cascade.
//!
//! Decides which configured destination receives a forwarded order command.
//! Stages are tried in strict priority order and the first match wins:
//!
//! 1. service-id override on any active rule for the panel
//! 2. provider-specific rule
//! 3. manual-service catch-all rule (order has no provider at all)
//! 4. panel default rule (null provider, not manual)
//! 5. any active rule (missing configuration, logged as a warning)
//! 6. provider-config fallback alias
//!
//! Pure lookups: resolution never sends anything and never writes.

use crate::shared::models::{Order, ProviderConfig, ProviderGroup};
use crate::store::{RoutingStore, StoreError};
use log::{debug, warn};

/// Aliases under which the provider-config fallback is searched when the
/// order has no known provider.
pub const MANUAL_ALIASES: [&str; 4] = ["MANUAL", "manual", "default", "Default"];

/// A routing rule match, carrying the destination to deliver to and the rule
/// that supplies template context and device selection.
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    pub group: ProviderGroup,
    pub destination: String,
    pub used_service_id_routing: bool,
    pub service_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    Rule(ResolvedRule),
    Fallback(ProviderConfig),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{message}")]
    NoGroup { message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub async fn resolve(
    store: &dyn RoutingStore,
    order: &Order,
    provider_order_id: Option<&str>,
    provider_name: Option<&str>,
) -> Result<ResolvedTarget, ResolveError> {
    let provider_name = non_empty(provider_name).or(non_empty(order.provider_name.as_deref()));
    let provider_order_id =
        non_empty(provider_order_id).or(non_empty(order.provider_order_id.as_deref()));

    // Stage 1: service-id override. Beats provider routing so a group of
    // problematic services can be redirected to specialized support no matter
    // which provider fulfills them.
    if let Some(service_id) = non_empty(order.service_id.as_deref()) {
        for group in store.groups_with_service_rules(order.panel_id).await? {
            let rules = group.service_rules();
            if let Some(destination) = rules.destination_for(service_id) {
                debug!(
                    "Service-id override: service {} on panel {} routed to {} via rule {}",
                    service_id, order.panel_id, destination, group.name
                );
                let destination = destination.to_string();
                return Ok(ResolvedTarget::Rule(ResolvedRule {
                    group,
                    destination,
                    used_service_id_routing: true,
                    service_id: Some(service_id.to_string()),
                }));
            }
        }
    }

    let groups = store.active_groups_for_panel(order.panel_id).await?;

    // Stage 2: provider-specific rule.
    if let Some(name) = provider_name {
        if let Some(group) = groups
            .iter()
            .find(|g| g.provider_name.as_deref() == Some(name))
        {
            return Ok(plain_rule(group.clone()));
        }
    }

    // Stage 3: manual-service catch-all, only when the order carries no
    // provider identity at all.
    if provider_name.is_none() && provider_order_id.is_none() {
        if let Some(group) = groups.iter().find(|g| g.is_manual_service) {
            return Ok(plain_rule(group.clone()));
        }
    }

    // Stage 4: panel default rule.
    if let Some(group) = groups
        .iter()
        .find(|g| g.provider_name.is_none() && !g.is_manual_service)
    {
        return Ok(plain_rule(group.clone()));
    }

    // Stage 5: any active rule. Reaching this means the panel routing is
    // incomplete for this order's provider.
    if let Some(group) = groups.first() {
        warn!(
            "No specific routing rule matched order {} (provider {:?}) on panel {}; using {}",
            order.external_order_id, provider_name, order.panel_id, group.name
        );
        return Ok(plain_rule(group.clone()));
    }

    // Stage 6: provider-config fallback alias.
    let names: Vec<String> = match provider_name {
        Some(name) => vec![name.to_string()],
        None => MANUAL_ALIASES.iter().map(|a| a.to_string()).collect(),
    };
    if let Some(config) = store.find_provider_config(order.user_id, &names).await? {
        return Ok(ResolvedTarget::Fallback(config));
    }

    // Stage 7: nothing configured. Name the panel by its alias so the caller
    // can surface a configuration hint the operator recognizes.
    let panel_label = store
        .find_panel(order.panel_id)
        .await?
        .map(|p| p.label().to_string())
        .unwrap_or_else(|| order.panel_id.to_string());
    Err(ResolveError::NoGroup {
        message: format!(
            "No forwarding destination configured for panel {}. Add a provider group or a provider alias in routing settings.",
            panel_label
        ),
    })
}

fn plain_rule(group: ProviderGroup) -> ResolvedTarget {
    ResolvedTarget::Rule(ResolvedRule {
        destination: group.group_jid.clone(),
        group,
        used_service_id_routing: false,
        service_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::test_fixtures::{config_for, group_for, order_for, panel_for};
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn service_id_override_beats_provider_rule() {
        let order = order_for(|o| {
            o.provider_name = Some("TopSmm".to_string());
            o.service_id = Some("4412".to_string());
        });
        let provider_group = group_for(order.panel_id, |g| {
            g.provider_name = Some("TopSmm".to_string());
            g.name = "TopSmm Group".to_string();
        });
        let override_group = group_for(order.panel_id, |g| {
            g.name = "Problem Services".to_string();
            g.service_id_rules =
                Some(serde_json::json!({"4412": "support@g.us", "9001": "other@g.us"}));
        });
        let store = MemoryStore {
            groups: vec![provider_group, override_group],
            ..Default::default()
        };

        match resolve(&store, &order, None, order.provider_name.as_deref())
            .await
            .unwrap()
        {
            ResolvedTarget::Rule(rule) => {
                assert!(rule.used_service_id_routing);
                assert_eq!(rule.destination, "support@g.us");
                assert_eq!(rule.group.name, "Problem Services");
                assert_eq!(rule.service_id.as_deref(), Some("4412"));
            }
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_rule_matches_by_name() {
        let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
        let other = group_for(order.panel_id, |g| {
            g.provider_name = Some("OtherProvider".to_string());
        });
        let expected = group_for(order.panel_id, |g| {
            g.provider_name = Some("TopSmm".to_string());
            g.name = "TopSmm Group".to_string();
        });
        let store = MemoryStore {
            groups: vec![other, expected],
            ..Default::default()
        };

        match resolve(&store, &order, None, None).await.unwrap() {
            ResolvedTarget::Rule(rule) => {
                assert_eq!(rule.group.name, "TopSmm Group");
                assert!(!rule.used_service_id_routing);
            }
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn manual_orders_use_manual_service_group() {
        let order = order_for(|o| {
            o.provider_name = None;
            o.provider_order_id = None;
        });
        let default_group = group_for(order.panel_id, |g| g.name = "Default".to_string());
        let manual_group = group_for(order.panel_id, |g| {
            g.is_manual_service = true;
            g.name = "Manual Services".to_string();
        });
        let store = MemoryStore {
            groups: vec![default_group, manual_group],
            ..Default::default()
        };

        match resolve(&store, &order, None, None).await.unwrap() {
            ResolvedTarget::Rule(rule) => assert_eq!(rule.group.name, "Manual Services"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_order_without_matching_rule_falls_to_default() {
        // A provider order id is known, so the manual catch-all must be
        // skipped even though no provider rule matches.
        let order = order_for(|o| {
            o.provider_name = Some("UnroutedProvider".to_string());
            o.provider_order_id = Some("991".to_string());
        });
        let manual_group = group_for(order.panel_id, |g| {
            g.is_manual_service = true;
            g.name = "Manual Services".to_string();
        });
        let default_group = group_for(order.panel_id, |g| g.name = "Panel Default".to_string());
        let store = MemoryStore {
            groups: vec![manual_group, default_group],
            ..Default::default()
        };

        match resolve(&store, &order, None, None).await.unwrap() {
            ResolvedTarget::Rule(rule) => assert_eq!(rule.group.name, "Panel Default"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn last_resort_picks_oldest_active_rule() {
        let order = order_for(|o| o.provider_name = Some("UnroutedProvider".to_string()));
        let mut older = group_for(order.panel_id, |g| {
            g.provider_name = Some("SomeoneElse".to_string());
            g.name = "Older".to_string();
        });
        older.created_at = older.created_at - chrono::Duration::days(2);
        let newer = group_for(order.panel_id, |g| {
            g.provider_name = Some("AnotherOne".to_string());
            g.name = "Newer".to_string();
        });
        let store = MemoryStore {
            groups: vec![newer, older],
            ..Default::default()
        };

        match resolve(&store, &order, None, None).await.unwrap() {
            ResolvedTarget::Rule(rule) => assert_eq!(rule.group.name, "Older"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn falls_back_to_provider_config_by_name() {
        let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
        let config = config_for(order.user_id, "TopSmm", |_| {});
        let store = MemoryStore {
            configs: vec![config],
            ..Default::default()
        };

        match resolve(&store, &order, None, None).await.unwrap() {
            ResolvedTarget::Fallback(config) => assert_eq!(config.provider_name, "TopSmm"),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn manual_orders_search_fixed_fallback_aliases() {
        let order = order_for(|o| {
            o.provider_name = None;
            o.provider_order_id = None;
        });
        let config = config_for(order.user_id, "manual", |_| {});
        let store = MemoryStore {
            configs: vec![config],
            ..Default::default()
        };

        match resolve(&store, &order, None, None).await.unwrap() {
            ResolvedTarget::Fallback(config) => assert_eq!(config.provider_name, "manual"),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_group_error_names_the_panel_alias() {
        let order = order_for(|_| {});
        let panel = panel_for(order.panel_id, order.user_id, |p| {
            p.name = "panel-internal-name".to_string();
            p.alias = Some("My Reseller Panel".to_string());
        });
        let store = MemoryStore {
            panels: vec![panel],
            ..Default::default()
        };

        let err = resolve(&store, &order, None, None).await.unwrap_err();
        match err {
            ResolveError::NoGroup { message } => {
                assert!(message.contains("My Reseller Panel"), "message: {}", message);
            }
            other => panic!("expected NoGroup, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn inactive_rules_are_ignored() {
        let order = order_for(|o| o.provider_name = Some("TopSmm".to_string()));
        let inactive = group_for(order.panel_id, |g| {
            g.provider_name = Some("TopSmm".to_string());
            g.is_active = false;
        });
        let store = MemoryStore {
            groups: vec![inactive],
            ..Default::default()
        };

        assert!(resolve(&store, &order, None, None).await.is_err());
    }
}
