use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized origin tag {0:?}")]
pub struct InvalidOrigin(pub String);

/// Who last wrote a cell. A closed sum type rather than a free-form string —
/// string form is only used at the relational-store and KV boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Origin {
    /// The authoritative remote sheet.
    Remote,
    /// Direct SQL against the store, outside the reconciler.
    LocalTerminal,
    /// Applied by the job-queue worker (optional ingress).
    Worker,
    /// A stress-test bot, named for audit purposes.
    Bot(String),
    /// Written during bootstrap, before any peer has an opinion.
    System,
}

impl Origin {
    /// True when the outbound synchronizer must never push this cell back
    /// to the remote (it already matches the authoritative sheet).
    pub fn is_remote(&self) -> bool {
        matches!(self, Origin::Remote)
    }
}

const REMOTE: &str = "remote";
const LOCAL_TERMINAL: &str = "local-terminal";
const WORKER: &str = "worker";
const SYSTEM: &str = "system";
const BOT_PREFIX: &str = "bot-";

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Remote => write!(f, "{REMOTE}"),
            Origin::LocalTerminal => write!(f, "{LOCAL_TERMINAL}"),
            Origin::Worker => write!(f, "{WORKER}"),
            Origin::Bot(name) => write!(f, "{BOT_PREFIX}{name}"),
            Origin::System => write!(f, "{SYSTEM}"),
        }
    }
}

impl FromStr for Origin {
    type Err = InvalidOrigin;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REMOTE => Ok(Origin::Remote),
            LOCAL_TERMINAL => Ok(Origin::LocalTerminal),
            WORKER => Ok(Origin::Worker),
            SYSTEM => Ok(Origin::System),
            other => other
                .strip_prefix(BOT_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| Origin::Bot(name.to_string()))
                .ok_or_else(|| InvalidOrigin(s.to_string())),
        }
    }
}

impl TryFrom<String> for Origin {
    type Error = InvalidOrigin;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Origin> for String {
    fn from(value: Origin) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_fixed_variant() {
        for o in [
            Origin::Remote,
            Origin::LocalTerminal,
            Origin::Worker,
            Origin::System,
        ] {
            let s = o.to_string();
            assert_eq!(s.parse::<Origin>().unwrap(), o);
        }
    }

    #[test]
    fn bot_variant_carries_its_name() {
        let o = Origin::Bot("stress-1".to_string());
        assert_eq!(o.to_string(), "bot-stress-1");
        assert_eq!("bot-stress-1".parse::<Origin>().unwrap(), o);
    }

    #[test]
    fn rejects_empty_bot_name_and_unknown_tags() {
        assert!("bot-".parse::<Origin>().is_err());
        assert!("nonsense".parse::<Origin>().is_err());
    }
}
