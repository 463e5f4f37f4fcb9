//! Simulation configuration

use serde::{Deserialize, Serialize};
use sharemesh_core::types::constants;

/// Parameters for one simulation run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of nodes in the full mesh
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,

    /// Mean one-way link latency in seconds
    #[serde(default = "default_mean_latency")]
    pub mean_latency: f64,

    /// Variance of the link latency
    #[serde(default = "default_latency_variance")]
    pub latency_variance: f64,

    /// Mean share-generation interval in seconds
    #[serde(default = "default_share_gen_mean")]
    pub share_gen_mean: f64,

    /// Variance of the share-generation interval
    #[serde(default = "default_share_gen_variance")]
    pub share_gen_variance: f64,

    /// Cap on tips a new share references
    #[serde(default = "default_max_tips")]
    pub max_tips_to_reference: u32,

    /// How long the mesh runs, in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,

    /// Master seed for every statistical model in the run
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_num_nodes() -> u32 {
    50
}

fn default_mean_latency() -> f64 {
    0.5
}

fn default_latency_variance() -> f64 {
    0.1
}

fn default_share_gen_mean() -> f64 {
    1.0
}

fn default_share_gen_variance() -> f64 {
    0.5
}

fn default_max_tips() -> u32 {
    constants::DEFAULT_MAX_TIPS_TO_REFERENCE
}

fn default_duration_secs() -> f64 {
    30.0
}

fn default_seed() -> u64 {
    42
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_nodes: default_num_nodes(),
            mean_latency: default_mean_latency(),
            latency_variance: default_latency_variance(),
            share_gen_mean: default_share_gen_mean(),
            share_gen_variance: default_share_gen_variance(),
            max_tips_to_reference: default_max_tips(),
            duration_secs: default_duration_secs(),
            seed: default_seed(),
        }
    }
}

impl SimConfig {
    /// Admission ceiling handed to every chain, in sim seconds
    ///
    /// A quarter of the run, so late-stamped stragglers near shutdown are
    /// refused instead of skewing the accounting.
    pub fn max_share_time_secs(&self) -> f64 {
        self.duration_secs / 4.0
    }
}
