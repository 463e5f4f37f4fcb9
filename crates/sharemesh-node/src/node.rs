//! GossipNode - one sharechain participant
//!
//! A node owns its ShareChain outright and is driven from a single task, so
//! every method here is synchronous and lock-free. It produces shares on a
//! timer (handled by the runtime), floods them to its peers, and ingests,
//! deduplicates and relays whatever arrives from the mesh.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use sharemesh_core::{ChainStats, NodeId, Share, ShareChain, ShareId, SimTime};
use sharemesh_net::{PeerChannel, PeerSet, WireMessage};
use tracing::{debug, trace, warn};

use crate::config::NodeConfig;

/// Opaque token the transport assigns to one inbound channel
pub type LinkId = usize;

/// One payload delivered to a node
#[derive(Clone, Debug)]
pub struct Incoming {
    /// Which inbound channel carried the payload
    pub link: LinkId,
    /// Raw bytes as received
    pub payload: Vec<u8>,
}

/// Node lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Not accepting events; timers and broadcasts are inert
    Stopped,
    /// Producing, ingesting and relaying shares
    Running,
}

/// Per-node gossip statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeStats {
    pub node: NodeId,
    pub created: u64,
    pub sent: u64,
    pub received: u64,
    pub chain: ChainStats,
}

/// One participant in the share gossip mesh
pub struct GossipNode {
    id: NodeId,
    config: NodeConfig,
    state: NodeState,
    chain: ShareChain,
    peers: PeerSet,

    /// Ids already processed, consulted before the chain so relay decisions
    /// cover shares the chain itself refuses as duplicates
    seen: HashSet<ShareId>,

    /// Inbound-link identities learned from REGISTER messages
    link_peers: HashMap<LinkId, NodeId>,

    created: u64,
    sent: u64,
    received: u64,
}

impl GossipNode {
    /// Create a stopped node with an empty peer set
    pub fn new(id: NodeId, config: NodeConfig) -> Self {
        let chain = ShareChain::new(config.max_timestamp());
        let mut seen = HashSet::new();
        seen.insert(ShareId::GENESIS);

        Self {
            id,
            config,
            state: NodeState::Stopped,
            chain,
            peers: PeerSet::new(),
            seen,
            link_peers: HashMap::new(),
            created: 0,
            sent: 0,
            received: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// The node's local view of the DAG
    pub fn chain(&self) -> &ShareChain {
        &self.chain
    }

    /// Begin accepting events and announce identity to every known peer
    pub fn start(&mut self) {
        if self.state == NodeState::Running {
            return;
        }
        self.state = NodeState::Running;

        let register = WireMessage::Register(self.id).encode();
        self.peers.broadcast(&register);
        debug!(node = %self.id, peers = self.peers.len(), "node started");
    }

    /// Stop accepting events and close peer channels
    ///
    /// Already-processed shares stay in the chain; late events targeting
    /// this node become no-ops.
    pub fn stop(&mut self) {
        self.state = NodeState::Stopped;
        self.peers.clear();
        debug!(node = %self.id, "node stopped");
    }

    /// Register a peer channel; the latest association for an id wins
    pub fn add_peer(&mut self, peer: NodeId, channel: PeerChannel) {
        if self.state == NodeState::Running {
            channel.send(WireMessage::Register(self.id).encode());
        }
        self.peers.insert(peer, channel);
    }

    /// Drop a peer; in-flight and already-processed shares are unaffected
    pub fn remove_peer(&mut self, peer: NodeId) {
        self.peers.remove(peer);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Produce a share on the current heaviest tips and flood it
    ///
    /// Returns the new share's id, or `None` when the node is stopped or
    /// the share could not be admitted locally.
    pub fn produce_and_broadcast(&mut self, now: SimTime) -> Option<ShareId> {
        let share = self.produce_share(now)?;
        let payload = WireMessage::Share(share.clone()).encode();
        self.sent += 1;
        self.peers.broadcast(&payload);
        Some(share.id())
    }

    /// Build and locally admit a new share referencing the top tips
    fn produce_share(&mut self, now: SimTime) -> Option<Share> {
        if self.state != NodeState::Running {
            trace!(node = %self.id, "generation event on stopped node ignored");
            return None;
        }

        // heaviest first, ties toward the lowest id for reproducibility
        let mut tips: Vec<(ShareId, u32)> = self
            .chain
            .tips()
            .iter()
            .map(|(id, weight)| (*id, *weight))
            .collect();
        tips.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let take = tips.len().min(self.config.max_tips_to_reference as usize);
        let references: Vec<ShareId> = tips[..take].iter().map(|(id, _)| *id).collect();
        let parent = references[0];

        let id = self.unique_share_id(now);
        let share = Share::new(id, self.id, now, parent, references)
            .expect("tip frontier is duplicate-free and includes the parent");

        if !self.chain.add_share(share.clone()) {
            // id collision or a timestamp past the ceiling; rare enough to
            // drop the share rather than fight for a new id
            warn!(node = %self.id, share = %id, "locally produced share refused by chain");
            return None;
        }
        self.created += 1;
        self.seen.insert(id);
        trace!(node = %self.id, share = %id, "produced share");
        Some(share)
    }

    /// Derive a fresh 32-bit share id
    ///
    /// Node id, running creation count and a fine-grained timestamp are
    /// packed into one 64-bit seed and hashed; collisions are treated as
    /// negligible and surface as a refused local insertion.
    fn unique_share_id(&self, now: SimTime) -> ShareId {
        let seed = (u64::from(self.id.as_u32()) << 48)
            | ((self.created & 0xFFFF) << 32)
            | (now.as_nanos() & 0xFFFF_FFFF);
        let digest = blake3::hash(&seed.to_le_bytes());
        let bytes: [u8; 4] = digest.as_bytes()[..4]
            .try_into()
            .expect("digest carries at least four bytes");
        ShareId::new(u32::from_le_bytes(bytes))
    }

    /// Ingest one payload from the transport
    pub fn handle_incoming(&mut self, incoming: Incoming) {
        if self.state != NodeState::Running {
            trace!(node = %self.id, "event for stopped node ignored");
            return;
        }

        let message = match WireMessage::decode(&incoming.payload) {
            Ok(message) => message,
            Err(error) => {
                debug!(node = %self.id, %error, "dropping malformed payload");
                return;
            }
        };

        match message {
            WireMessage::Register(peer) => {
                trace!(node = %self.id, peer = %peer, link = incoming.link, "peer registered");
                self.link_peers.insert(incoming.link, peer);
            }
            WireMessage::Share(share) => self.handle_share(incoming.link, share),
        }
    }

    /// Dedup, admit and relay one received share
    fn handle_share(&mut self, link: LinkId, share: Share) {
        let id = share.id();
        if !self.seen.insert(id) {
            trace!(node = %self.id, share = %id, "duplicate share dropped");
            return;
        }

        let payload = WireMessage::Share(share.clone()).encode();
        // the chain may park this in pending if references are unknown yet;
        // that is a normal transient state, not an error
        self.chain.add_share(share);
        self.received += 1;

        let source = self.link_peers.get(&link).copied();
        self.sent += 1;
        self.peers.broadcast_except(source, &payload);
    }

    /// Snapshot of the node's counters and chain accounting
    pub fn stats(&self) -> NodeStats {
        NodeStats {
            node: self.id,
            created: self.created,
            sent: self.sent,
            received: self.received,
            chain: self.chain.stats(),
        }
    }

    /// Raw main-chain id sequence for external reporting
    pub fn main_chain(&self) -> Vec<ShareId> {
        self.chain.main_chain()
    }
}
