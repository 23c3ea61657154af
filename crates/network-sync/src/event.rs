//! Network event subscription filters.
//!
//! [`TriggerSet`] names the subset of Docker `network` events that wake the
//! sync loop. Every cycle recomputes full state, so the choice only affects
//! convergence latency and event volume, never the final membership.
//!
//! # Examples
//!
//! ```
//! use proxysync_network_sync::TriggerSet;
//! use proxysync_core::NetworkAction;
//!
//! let trigger: TriggerSet = "lifecycle".parse().unwrap();
//! assert!(trigger.matches(NetworkAction::Create));
//! assert!(!trigger.matches(NetworkAction::Connect));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use proxysync_core::types::NetworkAction;

use crate::error::SyncError;

/// Docker event filter key for the object type.
const FILTER_TYPE: &str = "type";
/// Docker event filter key for the action name.
const FILTER_EVENT: &str = "event";

/// Set of network actions that trigger a reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerSet {
    /// `connect` / `disconnect`: fires whenever any container joins or leaves a network,
    /// which is what changes eligibility of existing networks.
    #[default]
    Membership,
    /// `create` / `destroy`: fires only when networks appear or disappear.
    Lifecycle,
    /// All four actions.
    All,
}

impl TriggerSet {
    /// Network actions included in this set.
    pub fn actions(&self) -> &'static [NetworkAction] {
        match self {
            Self::Membership => &[NetworkAction::Connect, NetworkAction::Disconnect],
            Self::Lifecycle => &[NetworkAction::Create, NetworkAction::Destroy],
            Self::All => &[
                NetworkAction::Create,
                NetworkAction::Destroy,
                NetworkAction::Connect,
                NetworkAction::Disconnect,
            ],
        }
    }

    /// Returns `true` if `action` belongs to this set.
    pub fn matches(&self, action: NetworkAction) -> bool {
        self.actions().contains(&action)
    }

    /// Server-side filters for the Docker events endpoint.
    ///
    /// Always restricts to `type=network`, plus one `event=` entry per action.
    pub fn filters(&self) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert(FILTER_TYPE.to_owned(), vec!["network".to_owned()]);
        filters.insert(
            FILTER_EVENT.to_owned(),
            self.actions().iter().map(|a| a.as_str().to_owned()).collect(),
        );
        filters
    }
}

impl fmt::Display for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Membership => write!(f, "membership"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for TriggerSet {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "membership" => Ok(Self::Membership),
            "lifecycle" => Ok(Self::Lifecycle),
            "all" => Ok(Self::All),
            other => Err(SyncError::Config {
                field: "trigger".to_owned(),
                reason: format!("unknown trigger set '{other}'"),
            }),
        }
    }
}
