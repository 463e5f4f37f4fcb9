//! # Sharemesh Net
//!
//! The gossip plumbing under a node: the pipe-delimited wire codec with its
//! `REGISTER` control message, and the peer channel abstraction used for
//! flood relay. Transport policy (latency, topology, delivery scheduling)
//! lives with whoever wires the channels, not here.

pub mod peer;
pub mod wire;

pub use peer::{PeerChannel, PeerSet};
pub use wire::{WireError, WireMessage};
