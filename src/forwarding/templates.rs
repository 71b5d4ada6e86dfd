//! Message rendering for resolved destinations.
//!
//! Two mutually exclusive modes per routing rule: the simple machine-parsable
//! `"id verb"` line most upstream operators expect to type back, and a rich
//! templated format with case-insensitive variable substitution. Placeholders
//! without a known value are left as literal text.

use crate::commands::ForwardCommand;
use crate::shared::models::{Order, Panel, ProviderGroup};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z]+)\}").expect("valid placeholder pattern"))
}

/// Order id shown to the upstream provider. Providers think in their own
/// order ids, so the provider-assigned id always wins over the panel-facing
/// one.
pub fn display_id(order: &Order, provider_order_id: Option<&str>) -> String {
    provider_order_id
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or(order.provider_order_id.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if order.external_order_id.is_empty() {
                "N/A".to_string()
            } else {
                order.external_order_id.clone()
            }
        })
}

pub fn format(
    command: ForwardCommand,
    order: &Order,
    group: &ProviderGroup,
    panel: Option<&Panel>,
    provider_order_id: Option<&str>,
) -> String {
    format_at(command, order, group, panel, provider_order_id, Utc::now())
}

/// Deterministic entry point: the caller supplies `now` for the timestamp
/// placeholders.
pub fn format_at(
    command: ForwardCommand,
    order: &Order,
    group: &ProviderGroup,
    panel: Option<&Panel>,
    provider_order_id: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let id = display_id(order, provider_order_id);

    if group.use_simple_format {
        return format!("{} {}", id, command.verb());
    }

    let template = group
        .custom_template
        .as_deref()
        .or(command_template(command, group))
        .unwrap_or_else(|| command.default_template());

    let vars = build_vars(command, order, group, panel, &id, now);
    substitute(template, &vars)
}

fn command_template(command: ForwardCommand, group: &ProviderGroup) -> Option<&str> {
    match command {
        ForwardCommand::NewOrder => group.new_order_template.as_deref(),
        ForwardCommand::Refill => group.refill_template.as_deref(),
        ForwardCommand::Cancel => group.cancel_template.as_deref(),
        ForwardCommand::SpeedUp => group.speedup_template.as_deref(),
    }
}

fn build_vars(
    command: ForwardCommand,
    order: &Order,
    group: &ProviderGroup,
    panel: Option<&Panel>,
    id: &str,
    now: DateTime<Utc>,
) -> HashMap<&'static str, String> {
    let or_na = |v: Option<&str>| v.unwrap_or("N/A").to_string();
    let provider_name = order
        .provider_name
        .clone()
        .unwrap_or_else(|| "Manual".to_string());
    let delivered = match order.remains {
        Some(remains) => (i64::from(order.quantity) - i64::from(remains)).to_string(),
        None => "N/A".to_string(),
    };
    let charge = order
        .charge
        .as_ref()
        .map(|c| format!("${}", c.with_scale(2)))
        .unwrap_or_else(|| "N/A".to_string());

    let mut vars: HashMap<&'static str, String> = HashMap::new();
    vars.insert("providerorderid", id.to_string());
    vars.insert("orderdisplayid", id.to_string());
    vars.insert("providername", provider_name);
    vars.insert("provideralias", group.name.clone());
    vars.insert("externalorderid", order.external_order_id.clone());
    vars.insert("externalid", order.external_order_id.clone());
    vars.insert("panelorderid", order.external_order_id.clone());
    vars.insert("orderid", order.external_order_id.clone());
    vars.insert("command", command.to_string());
    vars.insert(
        "panelalias",
        panel.map(|p| p.label().to_string()).unwrap_or_default(),
    );
    vars.insert(
        "panelname",
        panel.map(|p| p.name.clone()).unwrap_or_default(),
    );
    vars.insert("servicename", or_na(order.service_name.as_deref()));
    vars.insert("serviceid", or_na(order.service_id.as_deref()));
    vars.insert("link", or_na(order.link.as_deref()));
    vars.insert("quantity", order.quantity.to_string());
    vars.insert("status", order.status.clone());
    vars.insert("charge", charge);
    vars.insert(
        "startcount",
        order
            .start_count
            .map(|s| s.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    );
    vars.insert(
        "remains",
        order
            .remains
            .map(|r| r.to_string())
            .unwrap_or_else(|| "0".to_string()),
    );
    vars.insert("delivered", delivered);
    vars.insert("customerusername", or_na(order.customer_username.as_deref()));
    vars.insert("customeremail", or_na(order.customer_email.as_deref()));
    vars.insert("customerphone", or_na(order.customer_phone.as_deref()));
    vars.insert("canrefill", yes_no(order.can_refill));
    vars.insert("cancancel", yes_no(order.can_cancel));
    vars.insert(
        "guarantee",
        if order.has_guarantee {
            "✅ Available".to_string()
        } else {
            "❌ None".to_string()
        },
    );
    vars.insert("timestamp", now.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    vars.insert("date", now.format("%Y-%m-%d").to_string());
    vars.insert("time", now.format("%H:%M:%S").to_string());
    vars.insert(
        "orderdate",
        order.created_at.format("%Y-%m-%d %H:%M").to_string(),
    );
    vars
}

fn yes_no(flag: bool) -> String {
    if flag {
        "✅ Yes".to_string()
    } else {
        "❌ No".to_string()
    }
}

/// Case-insensitive placeholder substitution; unknown placeholders survive
/// verbatim.
pub(crate) fn substitute(template: &str, vars: &HashMap<&'static str, String>) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = caps[1].to_lowercase();
            match vars.get(key.as_str()) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarding::test_fixtures::{group_for, order_for, panel_for};
    use bigdecimal::BigDecimal;
    use chrono::TimeZone;
    use std::str::FromStr;
    use uuid::Uuid;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn display_id_prefers_parameter_over_stored_provider_id() {
        let order = order_for(|o| o.provider_order_id = Some("P2".to_string()));
        assert_eq!(display_id(&order, Some("P1")), "P1");
        assert_eq!(display_id(&order, None), "P2");
    }

    #[test]
    fn display_id_falls_back_to_external_then_na() {
        let order = order_for(|o| {
            o.provider_order_id = None;
            o.external_order_id = "55102".to_string();
        });
        assert_eq!(display_id(&order, None), "55102");

        let blank = order_for(|o| {
            o.provider_order_id = None;
            o.external_order_id = String::new();
        });
        assert_eq!(display_id(&blank, None), "N/A");
    }

    #[test]
    fn simple_format_is_exactly_id_and_verb() {
        let order = order_for(|o| o.provider_order_id = Some("7416281".to_string()));
        let group = group_for(order.panel_id, |g| g.use_simple_format = true);
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "7416281 refill");
    }

    #[test]
    fn simple_format_speed_up_verb_has_a_space() {
        let order = order_for(|o| o.provider_order_id = Some("7416281".to_string()));
        let group = group_for(order.panel_id, |g| g.use_simple_format = true);
        let text = format_at(
            ForwardCommand::SpeedUp,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "7416281 speed up");
    }

    #[test]
    fn custom_template_beats_command_template() {
        let order = order_for(|_| {});
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("custom {command}".to_string());
            g.refill_template = Some("refill-specific".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "custom REFILL");
    }

    #[test]
    fn delivered_is_quantity_minus_remains() {
        let order = order_for(|o| {
            o.quantity = 1000;
            o.remains = Some(250);
        });
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("{delivered}/{quantity} (left {remains})".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "750/1000 (left 250)");
    }

    #[test]
    fn delivered_is_na_when_remains_unknown() {
        let order = order_for(|o| {
            o.quantity = 1000;
            o.remains = None;
        });
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("{delivered} done, {remains} left".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "N/A done, 0 left");
    }

    #[test]
    fn charge_renders_as_dollars_or_na() {
        let order = order_for(|o| o.charge = Some(BigDecimal::from_str("12.5").unwrap()));
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("{charge}".to_string());
        });
        assert_eq!(
            format_at(ForwardCommand::Refill, &order, &group, None, None, fixed_now()),
            "$12.50"
        );

        let free = order_for(|o| o.charge = None);
        assert_eq!(
            format_at(ForwardCommand::Refill, &free, &group, None, None, fixed_now()),
            "N/A"
        );
    }

    #[test]
    fn placeholders_match_case_insensitively() {
        let order = order_for(|o| o.provider_order_id = Some("P9".to_string()));
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("{PROVIDERORDERID} {OrderDisplayId}".to_string());
        });
        let text = format_at(
            ForwardCommand::Cancel,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "P9 P9");
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        let order = order_for(|_| {});
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("keep {unknownToken} as-is".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "keep {unknownToken} as-is");
    }

    #[test]
    fn capability_flags_render_with_marks() {
        let order = order_for(|o| {
            o.can_refill = true;
            o.can_cancel = false;
            o.has_guarantee = true;
        });
        let group = group_for(order.panel_id, |g| {
            g.custom_template =
                Some("{canRefill} | {canCancel} | {guarantee}".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "✅ Yes | ❌ No | ✅ Available");
    }

    #[test]
    fn timestamp_placeholders_use_injected_clock() {
        let order = order_for(|o| {
            o.created_at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        });
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("{date} {time} / {orderDate}".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            None,
            None,
            fixed_now(),
        );
        assert_eq!(text, "2025-06-14 09:30:00 / 2025-01-02 03:04");
    }

    #[test]
    fn panel_placeholders_prefer_alias() {
        let order = order_for(|_| {});
        let panel = panel_for(order.panel_id, Uuid::new_v4(), |p| {
            p.name = "internal".to_string();
            p.alias = Some("My Panel".to_string());
        });
        let group = group_for(order.panel_id, |g| {
            g.custom_template = Some("{panelAlias} ({panelName})".to_string());
        });
        let text = format_at(
            ForwardCommand::Refill,
            &order,
            &group,
            Some(&panel),
            None,
            fixed_now(),
        );
        assert_eq!(text, "My Panel (internal)");
    }
}
