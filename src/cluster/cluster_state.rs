use crate::characteristic::Difference;
use crate::cluster::ClusterOutcome;
use crate::error::SearchResult;
use crate::search_config::{Deadline, Face, SearchConfig};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct ClusterState {
    pub face: Face,
    pub rounds: usize,
    /// Pins the input (round `0`) and the output (round `rounds`) state difference.
    pub fixed: BTreeMap<String, Difference>,
    /// The weight counted by the next step.
    pub weight: usize,
    /// First weight outside of the window.
    pub window_end: usize,
    pub probability: f64,
    pub trails: u64,
    pub deadline: Deadline,
    pub(crate) outcome: Option<SearchResult<ClusterOutcome>>,
}

impl ClusterState {
    /// Cluster the `face` differential `input -> output`, starting at `min_weight` (usually the
    /// weight of the best trail) and covering [`SearchConfig::cluster_window`] weights.
    pub fn new(
        config: &SearchConfig,
        face: Face,
        input: Difference,
        output: Difference,
        min_weight: usize,
    ) -> ClusterState {
        let rounds = config.rounds_for(face);
        let mut fixed = BTreeMap::new();
        fixed.insert(config.state_variable(0), input);
        fixed.insert(config.state_variable(rounds), output);
        ClusterState {
            face,
            rounds,
            fixed,
            weight: min_weight,
            window_end: min_weight + config.cluster_window(face),
            probability: 0.0,
            trails: 0,
            deadline: Deadline::start(config.time_limit),
            outcome: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub(crate) fn current(&self, timed_out: bool) -> ClusterOutcome {
        ClusterOutcome {
            probability: self.probability,
            trails: self.trails,
            timed_out,
        }
    }
}
