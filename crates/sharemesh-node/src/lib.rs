//! # Sharemesh Node
//!
//! The gossip participant: owns one ShareChain, produces shares on a timer,
//! deduplicates and flood-relays what it hears, and reports per-node stats.

pub mod clock;
pub mod config;
pub mod delay;
pub mod node;
pub mod runtime;

pub use clock::SimClock;
pub use config::NodeConfig;
pub use delay::{DelaySampler, FixedDelay};
pub use node::{GossipNode, Incoming, LinkId, NodeState, NodeStats};
pub use runtime::{spawn, NodeHandle};
