//! Boomerang search for Feistel-like ciphers.
//!
//! A boomerang splits the cipher into an upper and a lower part. The search repeatedly
//! looks for an upper trail, then enumerates lower trails that start where the upper trail
//! ends and checks whether the two connect through the switch (see [`crate::bct`]). Every
//! connecting pair is clustered on both faces and contributes
//! `p_upper^2 * p_lower^2 * p_switch` to the boomerang probability.
//!
//! The first accepted switch pins the input difference of the upper trail and the output
//! difference of the lower trail. All further trails share these end points, so the
//! accumulated probability estimates one boomerang distinguisher.
//!
//! [`BoomerangSearch`] yields one [`BoomerangIteration`] per upper trail, the last one being
//! terminal. [`search_boomerang`] runs it to completion.

mod boomerang_state;
mod switch_loop;

#[cfg(test)]
mod tests;

use crate::characteristic::Difference;
use crate::error::SearchResult;
use crate::log_probability;
use crate::search_config::SearchConfig;
pub use boomerang_state::{BoomerangEndpoints, BoomerangState, BoomerangStatistics};
use computation_process::{Generator, Stateful};
use log::info;
pub use switch_loop::SwitchLoop;

/// How one upper trail (or the whole search) ended.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IterationResult {
    /// All admissible lower trails of the upper trail were processed; carries the
    /// accumulated boomerang probability.
    Probability(f64),
    /// No lower trail exists for the upper trail; a different upper trail is tried next.
    NoLowerTrail,
    /// No further upper trail exists below the end weight. Terminal.
    UpperExhausted,
    /// The time budget ran out. Terminal.
    TimedOut,
}

impl IterationResult {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IterationResult::UpperExhausted | IterationResult::TimedOut)
    }
}

/// One item produced by [`BoomerangSearch`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoomerangIteration {
    pub result: IterationResult,
    /// The boomerang probability accumulated so far.
    pub probability: f64,
    pub endpoints: BoomerangEndpoints,
    pub statistics: BoomerangStatistics,
}

/// Enumerates upper trails and accumulates the boomerang probability.
pub type BoomerangSearch =
    Generator<SearchConfig, BoomerangState, SearchResult<BoomerangIteration>, SwitchLoop>;

/// The final result of [`search_boomerang`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoomerangReport {
    pub probability: f64,
    /// Either [`IterationResult::UpperExhausted`] or [`IterationResult::TimedOut`].
    pub termination: IterationResult,
    /// Input difference of the boomerang, once pinned.
    pub input: Option<Difference>,
    /// Output difference of the boomerang, once pinned.
    pub output: Option<Difference>,
    pub statistics: BoomerangStatistics,
}

/// Run a complete boomerang search.
///
/// Fails on configuration problems and solver errors. Running out of time (either through
/// [`SearchConfig::time_limit`] or an enclosing `cancel_this` trigger) is not an error; the
/// report carries the probability reached so far.
pub fn search_boomerang(config: &SearchConfig) -> SearchResult<BoomerangReport> {
    config.validate_boomerang()?;
    config.scratch.ensure_exists()?;
    let state = BoomerangState::new(config)?;
    let lower_output = config.state_variable(config.lower_rounds);

    let mut report = BoomerangReport {
        probability: 0.0,
        termination: IterationResult::TimedOut,
        input: None,
        output: None,
        statistics: BoomerangStatistics::default(),
    };
    for iteration in BoomerangSearch::configure(config.clone(), state) {
        let iteration = match iteration {
            Ok(iteration) => iteration?,
            Err(_) => {
                info!("Boomerang search cancelled.");
                report.termination = IterationResult::TimedOut;
                break;
            }
        };
        report.probability = iteration.probability;
        report.input = iteration.endpoints.get(&config.state_variable(0));
        report.output = iteration.endpoints.get(&lower_output);
        report.statistics = iteration.statistics;
        if iteration.result.is_terminal() {
            report.termination = iteration.result;
            break;
        }
    }

    info!(
        "Boomerang search finished ({:?}): {} -> {}, probability {}.",
        report.termination,
        report.input.unwrap_or_default(),
        report.output.unwrap_or_default(),
        log_probability(report.probability)
    );
    Ok(report)
}
