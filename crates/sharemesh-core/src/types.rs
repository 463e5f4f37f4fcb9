//! Core type definitions for Sharemesh
//!
//! Shares and nodes are identified by 32-bit ids on the wire, so the
//! newtypes here stay `u32`-backed rather than widening to hashes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// ShareId - Unique identifier for a share in the DAG
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ShareId(u32);

impl ShareId {
    /// Id of the genesis share every chain is seeded with
    pub const GENESIS: Self = Self(constants::GENESIS_SHARE_ID);

    /// Sentinel "no parent" id carried by the genesis share
    pub const NONE: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Whether this id names the genesis share
    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }
}

impl fmt::Debug for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareId({})", self.0)
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ShareId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// NodeId - Unique identifier for a gossip node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creator recorded on the genesis share (the pool itself, not a miner)
    pub const POOL: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// SimTime - Logical creation time in seconds since simulation start
///
/// Backed by `f64` seconds to match the wire format; ordering uses IEEE
/// total ordering so timestamp comparisons are well defined even if a NaN
/// ever slips in through deserialization.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    pub const ZERO: Self = Self(0.0);

    /// Largest admissible time, for chains without an admission ceiling
    pub const MAX: Self = Self(f64::MAX);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Whole nanoseconds since simulation start, for id-seed mixing
    pub fn as_nanos(&self) -> u64 {
        (self.0 * 1e9) as u64
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({}s)", self.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol constants
pub mod constants {
    /// Reserved id of the genesis share
    pub const GENESIS_SHARE_ID: u32 = 1;

    /// Sentinel parent id carried by the genesis share
    pub const NO_PARENT_ID: u32 = 0;

    /// Default cap on tips a freshly produced share may reference
    pub const DEFAULT_MAX_TIPS_TO_REFERENCE: u32 = 8;
}
