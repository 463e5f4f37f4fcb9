//! Peer channels and flood fan-out
//!
//! A node never touches remote state directly: every cross-node byte goes
//! through a `PeerChannel`, an outbound handle onto whatever transport the
//! surrounding layer wired up. `PeerSet` is the node's view of its
//! neighbors, keyed by node id.

use hashbrown::HashMap;
use sharemesh_core::NodeId;
use tokio::sync::mpsc;
use tracing::debug;

/// Outbound handle to one peer
///
/// Unbounded so a flood never blocks the owning node task; the simulation
/// substrate applies latency on the receiving side.
#[derive(Clone, Debug)]
pub struct PeerChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl PeerChannel {
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Create a connected channel pair, receiver side for the transport
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Send a payload; `false` means the peer side is gone
    ///
    /// A closed channel is a stopped peer, which is a no-op rather than an
    /// error.
    pub fn send(&self, payload: Vec<u8>) -> bool {
        self.tx.send(payload).is_ok()
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The set of peers a node floods to
#[derive(Debug, Default)]
pub struct PeerSet {
    peers: HashMap<NodeId, PeerChannel>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer; the latest association for an id wins
    pub fn insert(&mut self, peer: NodeId, channel: PeerChannel) {
        self.peers.insert(peer, channel);
    }

    /// Drop a peer; in-flight and already-processed shares are unaffected
    pub fn remove(&mut self, peer: NodeId) -> Option<PeerChannel> {
        self.peers.remove(&peer)
    }

    pub fn contains(&self, peer: NodeId) -> bool {
        self.peers.contains_key(&peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Drop every channel at once, e.g. when the owning node stops
    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Flood a payload to every peer except an optional source
    ///
    /// Returns how many peers actually accepted the payload; closed
    /// channels are skipped quietly.
    pub fn broadcast_except(&self, except: Option<NodeId>, payload: &[u8]) -> usize {
        let mut delivered = 0;
        for (peer, channel) in &self.peers {
            if Some(*peer) == except {
                continue;
            }
            if channel.send(payload.to_vec()) {
                delivered += 1;
            } else {
                debug!(peer = %peer, "peer channel closed, skipping");
            }
        }
        delivered
    }

    /// Flood to the whole peer set
    pub fn broadcast(&self, payload: &[u8]) -> usize {
        self.broadcast_except(None, payload)
    }
}
