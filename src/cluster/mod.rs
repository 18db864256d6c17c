//! Clustering: the probability of a differential as the sum over all of its trails.
//!
//! Both end points are fixed, and for every weight of a bounded window the solver enumerates
//! all trails of exactly that weight. Each trail of weight `w` contributes `2^-w`.

mod cluster_state;
mod weight_window;


use crate::error::SearchResult;
use crate::search_config::SearchConfig;
pub use cluster_state::ClusterState;
use computation_process::Computation;
pub use weight_window::WeightWindow;

/// The accumulated probability of one clustering pass.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterOutcome {
    pub probability: f64,
    /// Number of distinct trails counted.
    pub trails: u64,
    /// The budget ran out before the whole window was counted.
    pub timed_out: bool,
}

/// Counts trails between two fixed differences over a window of weights.
pub type ClusterSearch =
    Computation<SearchConfig, ClusterState, SearchResult<ClusterOutcome>, WeightWindow>;
