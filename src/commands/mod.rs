use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order-related command forwarded to an upstream provider group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForwardCommand {
    NewOrder,
    Refill,
    Cancel,
    SpeedUp,
}

impl fmt::Display for ForwardCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewOrder => write!(f, "NEW_ORDER"),
            Self::Refill => write!(f, "REFILL"),
            Self::Cancel => write!(f, "CANCEL"),
            Self::SpeedUp => write!(f, "SPEED_UP"),
        }
    }
}

impl FromStr for ForwardCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "NEW_ORDER" | "NEW" | "ORDER" => Ok(Self::NewOrder),
            "REFILL" => Ok(Self::Refill),
            "CANCEL" => Ok(Self::Cancel),
            "SPEED_UP" | "SPEEDUP" => Ok(Self::SpeedUp),
            _ => Err(UnknownCommand(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl ForwardCommand {
    /// Lowercase verb used by the simple `"id verb"` message format that
    /// upstream operators type back.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::NewOrder => "new",
            Self::Refill => "refill",
            Self::Cancel => "cancel",
            Self::SpeedUp => "speed up",
        }
    }

    /// Built-in message template used when a routing rule carries no custom
    /// or per-command template of its own.
    pub fn default_template(&self) -> &'static str {
        match self {
            Self::NewOrder => {
                "🆕 New Order\nOrder ID: {orderDisplayId}\nService: {serviceName}\nLink: {link}\nQuantity: {quantity}"
            }
            Self::Refill => {
                "♻️ Refill Request\nOrder ID: {orderDisplayId}\nService: {serviceName}\nLink: {link}\nRemains: {remains}"
            }
            Self::Cancel => {
                "🚫 Cancel Request\nOrder ID: {orderDisplayId}\nService: {serviceName}\nStatus: {status}"
            }
            Self::SpeedUp => {
                "⚡ Speed Up Request\nOrder ID: {orderDisplayId}\nService: {serviceName}\nStart Count: {startCount}\nRemains: {remains}"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_command_forms() {
        assert_eq!("refill".parse::<ForwardCommand>().unwrap(), ForwardCommand::Refill);
        assert_eq!("SPEED UP".parse::<ForwardCommand>().unwrap(), ForwardCommand::SpeedUp);
        assert_eq!("speedup".parse::<ForwardCommand>().unwrap(), ForwardCommand::SpeedUp);
        assert_eq!("new_order".parse::<ForwardCommand>().unwrap(), ForwardCommand::NewOrder);
        assert!("resume".parse::<ForwardCommand>().is_err());
    }

    #[test]
    fn round_trips_display_tokens() {
        for cmd in [
            ForwardCommand::NewOrder,
            ForwardCommand::Refill,
            ForwardCommand::Cancel,
            ForwardCommand::SpeedUp,
        ] {
            assert_eq!(cmd.to_string().parse::<ForwardCommand>().unwrap(), cmd);
        }
    }

    #[test]
    fn verbs_are_lowercase_tokens() {
        assert_eq!(ForwardCommand::SpeedUp.verb(), "speed up");
        assert_eq!(ForwardCommand::Refill.verb(), "refill");
    }
}
