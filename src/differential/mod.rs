//! Standalone differential search.
//!
//! These operations work on [`Face::Differential`], i.e. `config.rounds` rounds starting at
//! `config.start_weight`, with `config.blocked` excluded from every query. They reuse the
//! trail search and the clustering of the boomerang faces.

mod enumeration;


use crate::characteristic::Difference;
use crate::cluster::{ClusterOutcome, ClusterSearch, ClusterState};
use crate::error::SearchResult;
use crate::search_config::{Face, SearchConfig};
use crate::trail::{TrailOutcome, TrailSearch, TrailSearchState};
use computation_process::Algorithm;
pub use enumeration::{
    BlockAndResume, CharacteristicEnumeration, EnumeratedCharacteristic, EnumerationEnd,
    EnumerationState,
};
use log::info;

/// Find the minimal-weight characteristic of the standalone differential.
///
/// Cancellation through an enclosing `cancel_this` trigger is reported as
/// [`TrailOutcome::TimedOut`] at the starting weight.
pub fn find_min_weight_characteristic(config: &SearchConfig) -> SearchResult<TrailOutcome> {
    config.validate()?;
    let state = TrailSearchState::new(config, Face::Differential).with_blocked(&config.blocked);
    match TrailSearch::run(config.clone(), state) {
        Ok(outcome) => outcome,
        Err(_) => {
            info!("Differential trail search cancelled.");
            Ok(TrailOutcome::TimedOut {
                weight: config.start_weight,
            })
        }
    }
}

/// Cluster the standalone differential `input -> output`, starting at `min_weight`.
///
/// The window covers `word_size / differential_limit` weights. Cancellation is reported as
/// a timed out, empty outcome.
pub fn differential_probability(
    config: &SearchConfig,
    input: Difference,
    output: Difference,
    min_weight: usize,
) -> SearchResult<ClusterOutcome> {
    config.validate()?;
    let state = ClusterState::new(config, Face::Differential, input, output, min_weight);
    match ClusterSearch::run(config.clone(), state) {
        Ok(outcome) => outcome,
        Err(_) => {
            info!("Clustering of {input} -> {output} cancelled.");
            Ok(ClusterOutcome {
                probability: 0.0,
                trails: 0,
                timed_out: true,
            })
        }
    }
}
