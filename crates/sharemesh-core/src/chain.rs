//! ShareChain - the per-node DAG of shares and its fork-choice rule
//!
//! Vertices are shares, edges point from a share to everything it
//! references (newer to older). The chain tracks the tip frontier with
//! subtree weights, buffers shares whose references are not yet known, and
//! answers the fork-choice queries: best tip, main chain, uncle and orphan
//! accounting.

use hashbrown::{HashMap, HashSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::share::Share;
use crate::types::{ShareId, SimTime};

/// The share DAG owned by one gossip node
///
/// Shares are stored by value in an arena keyed by id; the graph carries ids
/// only. The index is append-only: no share is ever removed or mutated after
/// insertion. Cycles cannot form because an edge is only ever added from a
/// new vertex to an already-indexed one.
pub struct ShareChain {
    /// DAG structure, edges directed child -> referenced share
    graph: DiGraph<ShareId, ()>,

    /// Maps share ids to their vertices in the graph
    index: HashMap<ShareId, NodeIndex>,

    /// All inserted shares, by value
    shares: HashMap<ShareId, Share>,

    /// Current frontier: shares with no known child, with subtree weights
    tips: HashMap<ShareId, u32>,

    /// Shares received before all of their references, retried on growth
    pending: HashMap<ShareId, Share>,

    /// Total number of shares in the chain (genesis included)
    total_shares: u32,

    /// Admission ceiling; later-stamped shares are rejected outright
    max_timestamp: SimTime,
}

impl ShareChain {
    /// Create a chain seeded with the genesis share
    pub fn new(max_timestamp: SimTime) -> Self {
        let mut chain = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            shares: HashMap::new(),
            tips: HashMap::new(),
            pending: HashMap::new(),
            total_shares: 0,
            max_timestamp,
        };
        chain.insert(Share::genesis());
        chain
    }

    /// Add a share to the chain
    ///
    /// Returns `true` only when the share was inserted into the DAG.
    /// `false` covers both outright rejection (timestamp beyond the
    /// ceiling, duplicate id) and deferred admission: a share with unknown
    /// references is parked in the pending buffer and retried automatically
    /// as the index grows, so out-of-order arrival is not an error.
    pub fn add_share(&mut self, share: Share) -> bool {
        let id = share.id();

        if share.timestamp() > self.max_timestamp {
            debug!(share = %id, timestamp = %share.timestamp(), "rejecting share past ceiling");
            return false;
        }
        if self.index.contains_key(&id) {
            trace!(share = %id, "duplicate share ignored");
            return false;
        }
        if !self.references_known(&share) {
            debug!(share = %id, "share deferred, references not yet known");
            self.pending.insert(id, share);
            return false;
        }

        self.insert(share);
        self.drain_pending();
        true
    }

    /// Whether every reference of `share` is already indexed
    fn references_known(&self, share: &Share) -> bool {
        share
            .references()
            .iter()
            .all(|reference| self.index.contains_key(reference))
    }

    /// Insert a share whose references are all present
    fn insert(&mut self, share: Share) {
        let id = share.id();
        let vertex = self.graph.add_node(id);
        self.index.insert(id, vertex);

        for reference in share.references() {
            let target = *self
                .index
                .get(reference)
                .expect("reference validated against index before insertion");
            self.graph.add_edge(vertex, target, ());
        }

        self.total_shares += 1;
        self.update_tips(&share, vertex);
        self.shares.insert(id, share);
    }

    /// Replace referenced tips with the new share in the frontier
    fn update_tips(&mut self, share: &Share, vertex: NodeIndex) {
        let weight = self.subtree_weight(vertex);
        for reference in share.references() {
            self.tips.remove(reference);
        }
        self.tips.insert(share.id(), weight);
    }

    /// Number of vertices reachable from `vertex` over out-edges, itself
    /// included - the accumulated weight behind a share
    fn subtree_weight(&self, vertex: NodeIndex) -> u32 {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        visited.insert(vertex);
        queue.push_back(vertex);

        while let Some(current) = queue.pop_front() {
            for ancestor in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(ancestor) {
                    queue.push_back(ancestor);
                }
            }
        }
        visited.len() as u32
    }

    /// Retry pending shares until a full pass admits nothing new
    ///
    /// Each admitted share may unlock further pending shares, so the scan
    /// repeats to a fixed point. A pending share that resurfaces as a
    /// duplicate is dropped; one past the ceiling stays buffered in case
    /// the ceiling is raised later.
    fn drain_pending(&mut self) {
        let mut progress = true;
        while progress {
            progress = false;

            let ready: Vec<ShareId> = self
                .pending
                .iter()
                .filter(|(_, share)| self.references_known(share))
                .map(|(id, _)| *id)
                .collect();

            for id in ready {
                let share = self
                    .pending
                    .remove(&id)
                    .expect("id was just collected from the pending buffer");
                if self.index.contains_key(&id) {
                    trace!(share = %id, "pending share already admitted, dropping");
                    continue;
                }
                if share.timestamp() > self.max_timestamp {
                    self.pending.insert(id, share);
                    continue;
                }
                debug!(share = %id, "admitting pending share");
                self.insert(share);
                progress = true;
            }
        }
    }

    /// The current frontier with subtree weights
    pub fn tips(&self) -> &HashMap<ShareId, u32> {
        &self.tips
    }

    /// The heaviest tip; ties break toward the lowest id so fork choice is
    /// reproducible across runs and platforms
    pub fn best_tip(&self) -> ShareId {
        self.tips
            .iter()
            .max_by(|(id_a, weight_a), (id_b, weight_b)| {
                weight_a.cmp(weight_b).then_with(|| id_b.cmp(id_a))
            })
            .map(|(id, _)| *id)
            .expect("chain always holds at least the genesis tip")
    }

    /// Main-chain ids from the best tip down to genesis, inclusive
    pub fn main_chain(&self) -> Vec<ShareId> {
        let mut path = Vec::new();
        let mut current = self.best_tip();

        while !current.is_genesis() {
            path.push(current);
            current = self.share_on_main_chain(current).parent();
        }
        path.push(ShareId::GENESIS);
        path
    }

    /// Length of the main chain, genesis included
    pub fn main_chain_length(&self) -> u32 {
        self.main_chain().len() as u32
    }

    /// Uncles referenced along the main chain: every non-parent reference
    /// of a main-chain share counts one
    pub fn uncle_count(&self) -> u32 {
        let mut uncles = 0;
        let mut current = self.best_tip();

        while !current.is_genesis() {
            let share = self.share_on_main_chain(current);
            uncles += share.uncle_references();
            current = share.parent();
        }
        uncles
    }

    /// Shares neither on the main chain nor counted as one of its uncles
    pub fn orphan_count(&self) -> u32 {
        self.total_shares - self.uncle_count() - self.main_chain_length()
    }

    fn share_on_main_chain(&self, id: ShareId) -> &Share {
        self.shares
            .get(&id)
            .expect("main-chain walk only visits indexed shares")
    }

    /// Get a share by id
    pub fn get(&self, id: ShareId) -> Option<&Share> {
        self.shares.get(&id)
    }

    /// Whether a share is in the DAG (pending shares are not)
    pub fn contains(&self, id: ShareId) -> bool {
        self.index.contains_key(&id)
    }

    /// The genesis share
    pub fn genesis(&self) -> &Share {
        self.shares
            .get(&ShareId::GENESIS)
            .expect("chain is seeded with genesis at construction")
    }

    /// Total number of shares in the DAG
    pub fn total_shares(&self) -> u32 {
        self.total_shares
    }

    /// Number of shares parked for missing references
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Adjust the admission ceiling
    ///
    /// Raising it retries pending shares that were stamped past the old
    /// ceiling.
    pub fn set_max_timestamp(&mut self, max_timestamp: SimTime) {
        self.max_timestamp = max_timestamp;
        self.drain_pending();
    }

    /// Snapshot of the fork-choice accounting
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            total_shares: self.total_shares,
            main_chain_length: self.main_chain_length(),
            uncle_count: self.uncle_count(),
            orphan_count: self.orphan_count(),
            tip_count: self.tips.len(),
            pending_count: self.pending.len(),
        }
    }
}

/// Chain statistics
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub total_shares: u32,
    pub main_chain_length: u32,
    pub uncle_count: u32,
    pub orphan_count: u32,
    pub tip_count: usize,
    pub pending_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeId;

    fn share(id: u32, parent: u32, references: &[u32]) -> Share {
        Share::new(
            ShareId::new(id),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::new(parent),
            references.iter().copied().map(ShareId::new).collect(),
        )
        .unwrap()
    }

    fn chain() -> ShareChain {
        ShareChain::new(SimTime::MAX)
    }

    #[test]
    fn test_genesis_invariant() {
        let chain = chain();

        assert_eq!(chain.total_shares(), 1);
        assert_eq!(chain.main_chain_length(), 1);
        assert_eq!(chain.tips().len(), 1);
        assert_eq!(chain.tips().get(&ShareId::GENESIS), Some(&1));
        assert_eq!(chain.best_tip(), ShareId::GENESIS);
        assert_eq!(chain.orphan_count(), 0);
    }

    #[test]
    fn test_duplicate_admission_is_idempotent() {
        let mut chain = chain();

        assert!(chain.add_share(share(2, 1, &[1])));
        let tips_before = chain.tips().clone();

        assert!(!chain.add_share(share(2, 1, &[1])));
        assert_eq!(chain.total_shares(), 2);
        assert_eq!(chain.tips(), &tips_before);
        assert_eq!(chain.pending_count(), 0);
    }

    #[test]
    fn test_timestamp_ceiling() {
        let mut chain = ShareChain::new(SimTime::from_secs(10.0));

        let late = Share::new(
            ShareId::new(2),
            NodeId::new(1),
            SimTime::from_secs(11.0),
            ShareId::GENESIS,
            vec![ShareId::GENESIS],
        )
        .unwrap();

        assert!(!chain.add_share(late));
        assert_eq!(chain.total_shares(), 1);
        // rejected outright, never buffered
        assert_eq!(chain.pending_count(), 0);
    }

    #[test]
    fn test_out_of_order_convergence() {
        let mut ordered = chain();
        assert!(ordered.add_share(share(2, 1, &[1])));
        assert!(ordered.add_share(share(3, 2, &[2])));

        let mut reversed = chain();
        // child first: deferred, not an error
        assert!(!reversed.add_share(share(3, 2, &[2])));
        assert_eq!(reversed.pending_count(), 1);
        // parent arrival drains the pending child
        assert!(reversed.add_share(share(2, 1, &[1])));

        assert_eq!(reversed.pending_count(), 0);
        assert_eq!(reversed.total_shares(), ordered.total_shares());
        assert_eq!(reversed.tips(), ordered.tips());
        assert_eq!(reversed.main_chain(), ordered.main_chain());
    }

    #[test]
    fn test_pending_drains_to_fixed_point() {
        let mut chain = chain();

        // a whole dangling lineage arrives before its root
        assert!(!chain.add_share(share(4, 3, &[3])));
        assert!(!chain.add_share(share(3, 2, &[2])));
        assert_eq!(chain.pending_count(), 2);

        // the missing link admits the entire lineage in one call
        assert!(chain.add_share(share(2, 1, &[1])));
        assert_eq!(chain.pending_count(), 0);
        assert_eq!(chain.total_shares(), 4);
        assert_eq!(chain.main_chain_length(), 4);
    }

    #[test]
    fn test_weight_exceeds_references() {
        let mut chain = chain();
        chain.add_share(share(2, 1, &[1]));
        chain.add_share(share(3, 1, &[1]));
        let tip_weights = chain.tips().clone();

        chain.add_share(share(4, 2, &[2, 3]));

        let child_weight = chain.tips()[&ShareId::new(4)];
        for (reference, weight) in tip_weights {
            assert!(
                child_weight > weight,
                "child weight {child_weight} not above reference {reference} weight {weight}"
            );
        }
    }

    #[test]
    fn test_best_tip_tie_breaks_to_lowest_id() {
        let mut chain = chain();
        chain.add_share(share(3, 1, &[1]));
        chain.add_share(share(2, 1, &[1]));

        // both tips weigh 2; the lower id wins deterministically
        assert_eq!(chain.tips().len(), 2);
        assert_eq!(chain.best_tip(), ShareId::new(2));
    }

    #[test]
    fn test_concrete_fork_scenario() {
        let mut chain = chain();

        // A extends genesis
        assert!(chain.add_share(share(2, 1, &[1])));
        assert_eq!(chain.tips().get(&ShareId::new(2)), Some(&2));
        assert_eq!(chain.main_chain_length(), 2);
        assert_eq!(chain.orphan_count(), 0);

        // B forks from genesis: two equal tips
        assert!(chain.add_share(share(3, 1, &[1])));
        assert_eq!(chain.tips().get(&ShareId::new(2)), Some(&2));
        assert_eq!(chain.tips().get(&ShareId::new(3)), Some(&2));

        // C rejoins both branches, naming B an uncle
        assert!(chain.add_share(share(4, 2, &[2, 3])));
        assert_eq!(chain.tips().len(), 1);
        assert_eq!(chain.tips().get(&ShareId::new(4)), Some(&4));
        assert_eq!(chain.best_tip(), ShareId::new(4));
        assert_eq!(
            chain.main_chain(),
            vec![ShareId::new(4), ShareId::new(2), ShareId::GENESIS]
        );
        assert_eq!(chain.uncle_count(), 1);
        assert_eq!(chain.main_chain_length(), 3);
        assert_eq!(chain.orphan_count(), 0);
    }

    #[test]
    fn test_conservation() {
        let mut chain = chain();
        chain.add_share(share(2, 1, &[1]));
        chain.add_share(share(3, 1, &[1]));
        chain.add_share(share(4, 2, &[2, 3]));
        chain.add_share(share(5, 1, &[1]));
        chain.add_share(share(6, 4, &[4]));

        let stats = chain.stats();
        assert_eq!(
            stats.total_shares,
            stats.main_chain_length + stats.uncle_count + stats.orphan_count
        );
        // share 5 sits in a competing subtree: a true orphan
        assert_eq!(stats.orphan_count, 1);
    }

    #[test]
    fn test_raising_ceiling_admits_buffered_share() {
        let mut chain = ShareChain::new(SimTime::from_secs(10.0));

        // under the ceiling but dangling: buffered
        let child = Share::new(
            ShareId::new(3),
            NodeId::new(1),
            SimTime::from_secs(5.0),
            ShareId::new(2),
            vec![ShareId::new(2)],
        )
        .unwrap();
        assert!(!chain.add_share(child));

        // ceiling drops below the buffered share before its parent shows up
        chain.set_max_timestamp(SimTime::from_secs(2.0));
        let parent = Share::new(
            ShareId::new(2),
            NodeId::new(1),
            SimTime::from_secs(1.0),
            ShareId::GENESIS,
            vec![ShareId::GENESIS],
        )
        .unwrap();
        assert!(chain.add_share(parent));
        assert_eq!(chain.pending_count(), 1);

        // raising it again finally admits the child
        chain.set_max_timestamp(SimTime::from_secs(10.0));
        assert_eq!(chain.pending_count(), 0);
        assert!(chain.contains(ShareId::new(3)));
    }

    #[test]
    fn test_getters() {
        let mut chain = chain();
        chain.add_share(share(2, 1, &[1]));

        assert!(chain.contains(ShareId::new(2)));
        assert!(!chain.contains(ShareId::new(9)));
        assert_eq!(chain.get(ShareId::new(2)).unwrap().parent(), ShareId::GENESIS);
        assert!(chain.genesis().is_genesis());
    }
}
