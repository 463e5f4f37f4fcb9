//! Run reporting
//!
//! Console stats per node plus pool-wide aggregates, with optional CSV and
//! JSON dumps for offline analysis. The CSV is simple enough to format by
//! hand.

use serde::{Deserialize, Serialize};
use sharemesh_node::NodeStats;
use std::io::Write;
use std::path::Path;

/// Aggregated outcome of one simulation run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimSummary {
    pub nodes: Vec<NodeStats>,
    pub total_created: u64,
    pub average_orphans: f64,
}

impl SimSummary {
    pub fn from_stats(nodes: Vec<NodeStats>) -> Self {
        let total_created = nodes.iter().map(|stats| stats.created).sum();
        let total_orphans: u64 = nodes
            .iter()
            .map(|stats| u64::from(stats.chain.orphan_count))
            .sum();
        let average_orphans = if nodes.is_empty() {
            0.0
        } else {
            total_orphans as f64 / nodes.len() as f64
        };

        Self {
            nodes,
            total_created,
            average_orphans,
        }
    }

    /// Print the per-node table and aggregates to stdout
    pub fn print_console(&self) {
        println!("=== Sharemesh simulation results ===");
        for stats in &self.nodes {
            println!("Node {} statistics:", stats.node);
            println!("  - Shares created:   {}", stats.created);
            println!("  - Shares sent:      {}", stats.sent);
            println!("  - Shares received:  {}", stats.received);
            println!("  - Total shares:     {}", stats.chain.total_shares);
            println!("  - Main chain:       {}", stats.chain.main_chain_length);
            println!("  - Uncles:           {}", stats.chain.uncle_count);
            println!("  - Orphans:          {}", stats.chain.orphan_count);
        }
        println!("Shares created across the pool: {}", self.total_created);
        println!("Average orphans per node: {:.2}", self.average_orphans);
    }

    /// Write one CSV row per node
    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        let mut out = std::fs::File::create(path)?;
        writeln!(
            out,
            "node,created,sent,received,total_shares,main_chain_length,uncles,orphans"
        )?;
        for stats in &self.nodes {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                stats.node,
                stats.created,
                stats.sent,
                stats.received,
                stats.chain.total_shares,
                stats.chain.main_chain_length,
                stats.chain.uncle_count,
                stats.chain.orphan_count,
            )?;
        }
        Ok(())
    }

    /// Dump the whole summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self)
            .expect("summary has no non-serializable fields");
        std::fs::write(path, text)
    }
}
