//! Node configuration types

use serde::{Deserialize, Serialize};
use sharemesh_core::{types::constants, SimTime};

/// Per-node gossip configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Upper bound on tips a freshly produced share references
    #[serde(default = "default_max_tips_to_reference")]
    pub max_tips_to_reference: u32,

    /// Admission ceiling in simulation seconds; absent means unlimited
    #[serde(default)]
    pub max_share_time_secs: Option<f64>,
}

fn default_max_tips_to_reference() -> u32 {
    constants::DEFAULT_MAX_TIPS_TO_REFERENCE
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_tips_to_reference: default_max_tips_to_reference(),
            max_share_time_secs: None,
        }
    }
}

impl NodeConfig {
    /// The admission ceiling as a timestamp
    pub fn max_timestamp(&self) -> SimTime {
        self.max_share_time_secs
            .map(SimTime::from_secs)
            .unwrap_or(SimTime::MAX)
    }
}
