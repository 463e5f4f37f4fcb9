//! Simulation harness
//!
//! Builds a full mesh of gossip nodes over in-process channels, injects
//! per-message link latency, runs for the configured duration and collects
//! every node's final state. Because each message gets an independently
//! sampled delay, later messages can overtake earlier ones - exactly the
//! out-of-order delivery the pending buffer exists for.

use sharemesh_core::NodeId;
use sharemesh_net::PeerChannel;
use sharemesh_node::{spawn, GossipNode, Incoming, NodeConfig, NodeHandle, SimClock};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::models::{link_latency_model, share_generation_model};
use crate::report::SimSummary;
use sharemesh_node::DelaySampler;

/// Run one simulation to completion and summarize it
pub async fn run(config: &SimConfig) -> SimSummary {
    info!(
        nodes = config.num_nodes,
        duration_secs = config.duration_secs,
        seed = config.seed,
        "starting simulation"
    );

    let clock = SimClock::start_now();
    let node_config = NodeConfig {
        max_tips_to_reference: config.max_tips_to_reference,
        max_share_time_secs: Some(config.max_share_time_secs()),
    };

    // one mailbox per node; the forwarders feed them
    let ids: Vec<NodeId> = (1..=config.num_nodes).map(NodeId::new).collect();
    let mut nodes: Vec<GossipNode> = ids
        .iter()
        .map(|id| GossipNode::new(*id, node_config.clone()))
        .collect();
    let mut inboxes = Vec::new();
    let mut inbox_txs = Vec::new();
    for _ in &ids {
        let (tx, rx) = mpsc::unbounded_channel::<Incoming>();
        inbox_txs.push(tx);
        inboxes.push(rx);
    }

    // every ordered pair gets a latency-injecting link
    for (from, &sender) in ids.iter().enumerate() {
        for (to, &receiver) in ids.iter().enumerate() {
            if from == to {
                continue;
            }
            let (channel, rx) = PeerChannel::pair();
            nodes[from].add_peer(receiver, channel);
            spawn_link(
                rx,
                inbox_txs[to].clone(),
                from,
                link_latency_model(sender, receiver, config),
            );
        }
    }
    debug!(links = ids.len() * (ids.len() - 1), "mesh wired");

    // drop our copies so mailboxes close once the links wind down
    drop(inbox_txs);

    let mut handles: Vec<NodeHandle> = Vec::new();
    for (node, inbox) in nodes.into_iter().zip(inboxes) {
        let generation = Box::new(share_generation_model(node.id(), config));
        handles.push(spawn(node, clock, generation, inbox));
    }

    sleep(Duration::from_secs_f64(config.duration_secs)).await;

    info!("simulation window elapsed, stopping nodes");
    let nodes = futures::future::join_all(handles.into_iter().map(NodeHandle::stop)).await;
    SimSummary::from_stats(nodes.iter().map(GossipNode::stats).collect())
}

/// Forward one directed link, delaying each payload independently
///
/// The receiver identifies this inbound channel by the sender's index, the
/// same token the node sees in `Incoming::link`.
fn spawn_link(
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    inbox: mpsc::UnboundedSender<Incoming>,
    link: usize,
    mut latency: impl DelaySampler + 'static,
) {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let delay = latency.sample();
            let inbox = inbox.clone();
            tokio::spawn(async move {
                sleep(delay).await;
                // a closed mailbox is a stopped node: delivery is a no-op
                let _ = inbox.send(Incoming { link, payload });
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_small_mesh_run() {
        let config = SimConfig {
            num_nodes: 3,
            duration_secs: 8.0,
            mean_latency: 0.2,
            latency_variance: 0.01,
            share_gen_mean: 1.0,
            share_gen_variance: 0.1,
            ..SimConfig::default()
        };

        let summary = run(&config).await;

        assert_eq!(summary.nodes.len(), 3);
        for stats in &summary.nodes {
            assert!(stats.created > 0, "node {} produced nothing", stats.node);
            assert!(stats.chain.total_shares > 1);
            assert_eq!(
                stats.chain.total_shares,
                stats.chain.main_chain_length
                    + stats.chain.uncle_count
                    + stats.chain.orphan_count
            );
        }
    }
}
