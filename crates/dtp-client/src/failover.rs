//! Per-session choice of which replica holder to try next.

use std::sync::Arc;

use dtp_types::Location;

use crate::error::BlockReadError;
use crate::failure_cache::FailureCounts;

/// Pop-only queue of the datanodes holding one block.
///
/// Each call to [`next`](Self::next) returns the remaining datanode with the
/// fewest recorded failures (ties keep the naming service's order). Counts
/// are read from the shared cache at call time, so failures recorded by other
/// readers since this session started are taken into account.
pub struct DatanodeFailover {
    failures: Arc<dyn FailureCounts>,
    /// Candidates not yet handed out, with their original position.
    remaining: Vec<(usize, Location)>,
    current: Option<Location>,
    last_error: Option<BlockReadError>,
}

impl DatanodeFailover {
    /// Duplicate locations are collapsed into their first occurrence.
    pub fn new(locations: &[Location], failures: Arc<dyn FailureCounts>) -> Self {
        let mut remaining: Vec<(usize, Location)> = Vec::with_capacity(locations.len());
        for (index, location) in locations.iter().enumerate() {
            if !remaining.iter().any(|(_, seen)| seen == location) {
                remaining.push((index, location.clone()));
            }
        }

        Self {
            failures,
            remaining,
            current: None,
            last_error: None,
        }
    }

    /// Pop the best-ranked remaining datanode.
    pub fn next(&mut self) -> Result<Location, BlockReadError> {
        let best = self
            .remaining
            .iter()
            .enumerate()
            .min_by_key(|(_, (index, location))| (self.failures.failure_count(location), *index))
            .map(|(pos, _)| pos)
            .ok_or(BlockReadError::Exhausted)?;

        let (_, location) = self.remaining.remove(best);
        self.current = Some(location.clone());
        Ok(location)
    }

    /// Remember `err` and charge it to the datanode last returned by `next`.
    pub fn record_failure(&mut self, err: BlockReadError) {
        if let Some(location) = &self.current {
            self.failures.record_failure(location);
        }
        self.last_error = Some(err);
    }

    pub fn num_remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn last_error(&self) -> Option<&BlockReadError> {
        self.last_error.as_ref()
    }

    /// The datanode most recently handed out.
    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }
}
