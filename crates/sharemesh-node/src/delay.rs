//! Delay sources
//!
//! The node consumes share-generation intervals (and the simulation
//! substrate consumes per-link latencies) as opaque numeric generators
//! behind this trait, so statistical models stay out of the protocol code.

use std::time::Duration;

/// An opaque stream of delays
pub trait DelaySampler: Send {
    /// Draw the next delay
    fn sample(&mut self) -> Duration;
}

/// A constant delay stream, mostly for tests and pacing experiments
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl DelaySampler for FixedDelay {
    fn sample(&mut self) -> Duration {
        self.delay
    }
}
