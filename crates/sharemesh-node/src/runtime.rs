//! Node runtime - the task that drives one GossipNode
//!
//! One tokio task owns the node and selects over three event sources: the
//! shutdown signal, the share-generation timer, and the inbound mailbox.
//! That keeps every ShareChain mutation on a single task, so the core needs
//! no locking, and stopping the task is exactly "cancel the timer and
//! accept nothing further".

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::clock::SimClock;
use crate::delay::DelaySampler;
use crate::node::{GossipNode, Incoming};
use sharemesh_core::NodeId;

/// Handle onto a spawned node task
pub struct NodeHandle {
    id: NodeId,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<GossipNode>,
}

impl NodeHandle {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Stop the node and hand back its final state
    ///
    /// Cancels the pending generation timer; any event already queued for
    /// the node after this point is discarded as a no-op.
    pub async fn stop(self) -> GossipNode {
        let _ = self.shutdown_tx.send(()).await;
        self.task.await.expect("node task does not panic")
    }
}

/// Spawn a node onto its own task
///
/// The node is started (announcing `REGISTER` to its peers) before the
/// first generation delay is drawn.
pub fn spawn(
    node: GossipNode,
    clock: SimClock,
    generation_delays: Box<dyn DelaySampler>,
    inbox: mpsc::UnboundedReceiver<Incoming>,
) -> NodeHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let id = node.id();
    let task = tokio::spawn(run(node, clock, generation_delays, inbox, shutdown_rx));

    NodeHandle {
        id,
        shutdown_tx,
        task,
    }
}

async fn run(
    mut node: GossipNode,
    clock: SimClock,
    mut generation_delays: Box<dyn DelaySampler>,
    mut inbox: mpsc::UnboundedReceiver<Incoming>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> GossipNode {
    node.start();
    let mut next_generation = Instant::now() + generation_delays.sample();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(node = %node.id(), "shutdown requested");
                break;
            }
            _ = time::sleep_until(next_generation) => {
                if let Some(share) = node.produce_and_broadcast(clock.now()) {
                    trace!(node = %node.id(), share = %share, "share broadcast");
                }
                next_generation = Instant::now() + generation_delays.sample();
            }
            incoming = inbox.recv() => match incoming {
                Some(incoming) => node.handle_incoming(incoming),
                None => {
                    debug!(node = %node.id(), "all transports closed");
                    break;
                }
            }
        }
    }

    node.stop();
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::delay::FixedDelay;
    use sharemesh_net::{PeerChannel, WireMessage};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_timer_drives_production() {
        let mut node = GossipNode::new(NodeId::new(1), NodeConfig::default());
        let (channel, mut peer_rx) = PeerChannel::pair();
        node.add_peer(NodeId::new(2), channel);

        let (_inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let handle = spawn(
            node,
            SimClock::start_now(),
            Box::new(FixedDelay::new(Duration::from_millis(100))),
            inbox_rx,
        );

        // five generation intervals elapse on the paused clock
        time::sleep(Duration::from_millis(550)).await;
        let node = handle.stop().await;

        assert_eq!(node.stats().created, 5);
        assert_eq!(node.chain().main_chain_length(), 6);

        // the peer saw the REGISTER announcement plus every share
        let mut register_count = 0;
        let mut share_count = 0;
        while let Ok(payload) = peer_rx.try_recv() {
            match WireMessage::decode(&payload).unwrap() {
                WireMessage::Register(_) => register_count += 1,
                WireMessage::Share(_) => share_count += 1,
            }
        }
        assert_eq!(register_count, 1);
        assert_eq!(share_count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_generation() {
        let node = GossipNode::new(NodeId::new(1), NodeConfig::default());
        let (_inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let handle = spawn(
            node,
            SimClock::start_now(),
            Box::new(FixedDelay::new(Duration::from_secs(3600))),
            inbox_rx,
        );

        // stop long before the first timer fires
        let node = handle.stop().await;
        assert_eq!(node.stats().created, 0);
        assert_eq!(node.state(), crate::node::NodeState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbox_feeds_the_chain() {
        let node = GossipNode::new(NodeId::new(1), NodeConfig::default());
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let handle = spawn(
            node,
            SimClock::start_now(),
            Box::new(FixedDelay::new(Duration::from_secs(3600))),
            inbox_rx,
        );

        let share = sharemesh_core::Share::new(
            sharemesh_core::ShareId::new(2),
            NodeId::new(9),
            sharemesh_core::SimTime::from_secs(0.5),
            sharemesh_core::ShareId::GENESIS,
            vec![sharemesh_core::ShareId::GENESIS],
        )
        .unwrap();
        inbox_tx
            .send(Incoming {
                link: 0,
                payload: WireMessage::Share(share).encode(),
            })
            .unwrap();

        time::sleep(Duration::from_millis(10)).await;
        let node = handle.stop().await;

        assert_eq!(node.stats().received, 1);
        assert_eq!(node.chain().total_shares(), 2);
    }
}
