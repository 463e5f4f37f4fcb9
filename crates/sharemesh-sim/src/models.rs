//! Statistical delay models
//!
//! Each node gets its own seeded generators: a latency model skewed by a
//! per-node link factor, and a share-generation model skewed by a per-node
//! hash-power factor, so the mesh is heterogeneous but reproducible from
//! the master seed.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use sharemesh_core::NodeId;
use sharemesh_node::DelaySampler;
use std::time::Duration;

use crate::config::SimConfig;

/// Floor on every sampled delay, in seconds
const MIN_DELAY_SECS: f64 = 0.1;

/// Normal-distributed delays clamped to the floor
pub struct NormalDelay {
    normal: Normal<f64>,
    rng: ChaCha8Rng,
}

impl NormalDelay {
    /// The models are parameterized by variance, not deviation
    pub fn new(mean: f64, variance: f64, seed: u64) -> Self {
        let normal = Normal::new(mean, variance.max(0.0).sqrt())
            .expect("model parameters are finite");
        Self {
            normal,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl DelaySampler for NormalDelay {
    fn sample(&mut self) -> Duration {
        Duration::from_secs_f64(self.normal.sample(&mut self.rng).max(MIN_DELAY_SECS))
    }
}

/// Link factor: which latency class a node's connections fall into
fn latency_factor(node: NodeId) -> f64 {
    0.8 + (node.as_u32() % 5) as f64 * 0.1
}

/// Hash-power factor: how much faster than baseline a node finds shares
fn hash_power_factor(node: NodeId) -> f64 {
    0.5 + ((u64::from(node.as_u32()) * 7919) % 100) as f64 / 100.0
}

/// Decorrelate the per-purpose generator seeds from the master seed
fn derive_seed(master: u64, stream: u64) -> u64 {
    master
        .wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

/// Latency model for one directed link, owned by the sending side
pub fn link_latency_model(sender: NodeId, receiver: NodeId, config: &SimConfig) -> NormalDelay {
    let factor = latency_factor(sender);
    let stream = (u64::from(sender.as_u32()) << 32) | u64::from(receiver.as_u32());
    NormalDelay::new(
        config.mean_latency * factor,
        config.latency_variance * factor,
        derive_seed(config.seed, stream),
    )
}

/// Share-generation model for one node
pub fn share_generation_model(node: NodeId, config: &SimConfig) -> NormalDelay {
    let hash_power = hash_power_factor(node);
    NormalDelay::new(
        config.share_gen_mean / hash_power,
        config.share_gen_variance / hash_power,
        derive_seed(config.seed, u64::from(node.as_u32())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_respect_the_floor() {
        // zero mean forces the clamp on essentially every draw
        let mut model = NormalDelay::new(0.0, 0.5, 7);

        for _ in 0..100 {
            assert!(model.sample() >= Duration::from_secs_f64(MIN_DELAY_SECS));
        }
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let config = SimConfig::default();
        let mut first = share_generation_model(NodeId::new(3), &config);
        let mut second = share_generation_model(NodeId::new(3), &config);

        for _ in 0..10 {
            assert_eq!(first.sample(), second.sample());
        }
    }

    #[test]
    fn test_nodes_differ() {
        let config = SimConfig::default();
        let mut a = share_generation_model(NodeId::new(1), &config);
        let mut b = share_generation_model(NodeId::new(2), &config);

        let a_draws: Vec<Duration> = (0..5).map(|_| a.sample()).collect();
        let b_draws: Vec<Duration> = (0..5).map(|_| b.sample()).collect();
        assert_ne!(a_draws, b_draws);
    }

    #[test]
    fn test_factors_match_the_pool_profile() {
        assert_eq!(latency_factor(NodeId::new(5)), 0.8);
        assert!((latency_factor(NodeId::new(9)) - 1.2).abs() < 1e-12);
        assert_eq!(hash_power_factor(NodeId::new(0)), 0.5);
        // 7919 % 100 == 19
        assert!((hash_power_factor(NodeId::new(1)) - 0.69).abs() < 1e-12);
    }
}
