use crate::boomerang::boomerang_state::Phase;
use crate::boomerang::{BoomerangIteration, BoomerangState, IterationResult};
use crate::bct::Switch;
use crate::characteristic::Difference;
use crate::cluster::{ClusterOutcome, ClusterSearch, ClusterState};
use crate::error::SearchResult;
use crate::log_probability;
use crate::search_config::{Face, SearchConfig};
use crate::trail::{TrailOutcome, TrailSearch, TrailSearchState};
use cancel_this::is_cancelled;
use computation_process::Incomplete::Suspended;
use computation_process::{Completable, Computable, GeneratorStep, Stateful};
use log::{debug, info, warn};

/// The [`GeneratorStep`] of the boomerang state machine.
///
/// Every step either starts a sub-search, advances the running one by one solver call, or
/// performs one transition. An item is produced whenever an upper trail is finished and when
/// the search terminates.
pub struct SwitchLoop;

impl GeneratorStep<SearchConfig, BoomerangState, SearchResult<BoomerangIteration>>
    for SwitchLoop
{
    fn step(
        context: &SearchConfig,
        state: &mut BoomerangState,
    ) -> Completable<Option<SearchResult<BoomerangIteration>>> {
        if matches!(state.phase, Phase::Terminal) {
            return Ok(None);
        }

        is_cancelled!()?;

        match advance(context, state)? {
            Ok(None) => Err(Suspended),
            Ok(Some(result)) => {
                if result.is_terminal() {
                    state.phase = Phase::Terminal;
                }
                Ok(Some(Ok(state.iteration(result))))
            }
            Err(error) => {
                state.phase = Phase::Terminal;
                Ok(Some(Err(error)))
            }
        }
    }
}

impl BoomerangState {
    fn iteration(&self, result: IterationResult) -> BoomerangIteration {
        BoomerangIteration {
            result,
            probability: self.probability,
            endpoints: self.endpoints.clone(),
            statistics: self.statistics,
        }
    }
}

type Transition = SearchResult<Option<IterationResult>>;

fn advance(context: &SearchConfig, state: &mut BoomerangState) -> Completable<Transition> {
    let transition = match &mut state.phase {
        Phase::Terminal => Ok(None),
        Phase::Idle => start_upper(context, state),
        Phase::SearchUpper(search) => {
            let outcome = search.try_compute()?;
            upper_found(context, state, outcome)
        }
        Phase::NextLower => next_lower(context, state),
        Phase::SearchLower(search) => {
            let outcome = search.try_compute()?;
            lower_found(state, outcome)
        }
        Phase::ValidateSwitch => validate_switch(context, state),
        Phase::ClusterUpper(cluster) => {
            let outcome = cluster.try_compute()?;
            clustered(context, state, Face::Upper, outcome)
        }
        Phase::ClusterLower(cluster) => {
            let outcome = cluster.try_compute()?;
            clustered(context, state, Face::Lower, outcome)
        }
        Phase::Accumulate => accumulate(state),
    };
    Ok(transition)
}

/// Search the next upper trail, starting from the boomerang input once it is pinned.
pub(crate) fn start_upper(context: &SearchConfig, state: &mut BoomerangState) -> Transition {
    let mut search = TrailSearchState::new(context, Face::Upper)
        .with_weight(state.upper_weight)
        .with_blocked(&state.blocked_upper)
        .with_deadline(state.deadline);
    let input = context.state_variable(0);
    if let Some(value) = state.endpoints.get(&input) {
        search = search.with_fixed(input, value);
    }
    info!(
        "Searching upper trail from weight {} ({} upper trails blocked).",
        state.upper_weight,
        state.blocked_upper.len()
    );
    state.phase = Phase::SearchUpper(TrailSearch::configure(context.clone(), search));
    Ok(None)
}

fn upper_found(
    context: &SearchConfig,
    state: &mut BoomerangState,
    outcome: SearchResult<TrailOutcome>,
) -> Transition {
    match outcome? {
        TrailOutcome::Found {
            characteristic,
            weight,
        } => {
            state.accept_upper(context, characteristic, weight);
            state.phase = Phase::NextLower;
            Ok(None)
        }
        TrailOutcome::Exhausted { weight } => {
            info!(
                "No further upper trail below weight {weight}. Final boomerang probability {}.",
                log_probability(state.probability)
            );
            Ok(Some(IterationResult::UpperExhausted))
        }
        TrailOutcome::TimedOut { .. } => Ok(Some(IterationResult::TimedOut)),
    }
}

/// Either search another lower trail for the current upper trail, or finish it.
pub(crate) fn next_lower(context: &SearchConfig, state: &mut BoomerangState) -> Transition {
    if state.deadline.reached() {
        return Ok(Some(IterationResult::TimedOut));
    }
    let Some(beta) = state
        .current
        .as_ref()
        .map(|pair| pair.upper.output_difference())
    else {
        state.phase = Phase::Idle;
        return Ok(None);
    };

    if !state.lower_window_open(context) {
        info!(
            "Completed upper trail with boomerang probability {}.",
            log_probability(state.probability)
        );
        state.finish_upper();
        state.phase = Phase::Idle;
        return Ok(Some(IterationResult::Probability(state.probability)));
    }

    let output = context.state_variable(context.lower_rounds);
    let first_switch = !state.endpoints.is_pinned(&output);
    let exclusions = state.layout.invalid_switches(
        beta,
        &state.table,
        first_switch,
        &context.state_variable(0),
        context.word_size,
    );
    debug!(
        "Blocking {} invalid switching differences for {}.",
        exclusions.len(),
        beta.to_hex(context.word_size)
    );

    let mut search = TrailSearchState::new(context, Face::Lower)
        .with_blocked(&state.blocked_lower)
        .with_exclusions(exclusions)
        .with_deadline(state.deadline);
    if let Some(value) = state.endpoints.get(&output) {
        search = search.with_fixed(output, value);
    }
    state.phase = Phase::SearchLower(TrailSearch::configure(context.clone(), search));
    Ok(None)
}

fn lower_found(state: &mut BoomerangState, outcome: SearchResult<TrailOutcome>) -> Transition {
    match outcome? {
        TrailOutcome::Found {
            characteristic,
            weight,
        } => {
            state.accept_lower(characteristic, weight);
            state.phase = Phase::ValidateSwitch;
            Ok(None)
        }
        TrailOutcome::Exhausted { .. } => {
            info!("No lower trail for the current upper trail. Trying a different upper trail.");
            state.lower_exhausted();
            state.phase = Phase::Idle;
            Ok(Some(IterationResult::NoLowerTrail))
        }
        TrailOutcome::TimedOut { .. } => Ok(Some(IterationResult::TimedOut)),
    }
}

/// Check the switch of the current pair; an accepted switch pins the boomerang end points.
pub(crate) fn validate_switch(context: &SearchConfig, state: &mut BoomerangState) -> Transition {
    let Some(pair) = state.current.as_ref() else {
        state.phase = Phase::Idle;
        return Ok(None);
    };
    let Some((lower, _)) = pair.lower.as_ref() else {
        state.phase = Phase::NextLower;
        return Ok(None);
    };
    let alpha = pair.upper.input_difference();
    let beta = pair.upper.output_difference();
    let gamma = lower.input_difference();
    let delta = lower.output_difference();
    let upper_clustered = pair.upper_probability.is_some();

    match state.layout.check(beta, gamma, &state.table) {
        Switch::Rejected => {
            state.statistics.switches_rejected += 1;
            info!(
                "Invalid switch {} -> {}. Searching for another lower trail.",
                beta.to_hex(context.word_size),
                gamma.to_hex(context.word_size)
            );
            state.phase = Phase::NextLower;
        }
        Switch::Accepted(probability) => {
            debug!("Switch accepted with probability {}.", log_probability(probability));
            if let Some(pair) = state.current.as_mut() {
                pair.switch = probability;
            }
            for variable in state.pin_endpoints(context, alpha, delta) {
                info!(
                    "Fixed {variable} in boomerang to {}.",
                    state.endpoints.get(&variable).unwrap_or_default()
                );
            }
            let face = if upper_clustered {
                Face::Lower
            } else {
                Face::Upper
            };
            state.phase = cluster_phase(context, state, face);
        }
    }
    Ok(None)
}

/// A fresh clustering of the current upper or lower trail.
fn cluster_phase(context: &SearchConfig, state: &BoomerangState, face: Face) -> Phase {
    let Some(pair) = state.current.as_ref() else {
        return Phase::Idle;
    };
    let (input, output, weight): (Difference, Difference, usize) = match (face, &pair.lower) {
        (Face::Lower, Some((lower, weight))) => {
            (lower.input_difference(), lower.output_difference(), *weight)
        }
        (Face::Lower, None) => return Phase::NextLower,
        _ => (
            pair.upper.input_difference(),
            pair.upper.output_difference(),
            pair.upper_weight,
        ),
    };
    info!("Clustering {face} differential {input} -> {output} from weight {weight}.");
    let cluster = ClusterState::new(context, face, input, output, weight)
        .with_deadline(state.deadline);
    let cluster = ClusterSearch::configure(context.clone(), cluster);
    match face {
        Face::Lower => Phase::ClusterLower(cluster),
        _ => Phase::ClusterUpper(cluster),
    }
}

/// Store a clustering result. A zero probability is transient and the clustering repeats.
fn clustered(
    context: &SearchConfig,
    state: &mut BoomerangState,
    face: Face,
    outcome: SearchResult<ClusterOutcome>,
) -> Transition {
    let outcome = outcome?;
    if outcome.timed_out {
        return Ok(Some(IterationResult::TimedOut));
    }
    if outcome.probability == 0.0 {
        warn!("Clustering of {face} differential found no trail. Retrying.");
        state.phase = cluster_phase(context, state, face);
        return Ok(None);
    }

    if let Some(pair) = state.current.as_mut() {
        match face {
            Face::Lower => pair.lower_probability = Some(outcome.probability),
            _ => pair.upper_probability = Some(outcome.probability),
        }
    }
    state.phase = match face {
        Face::Lower => Phase::Accumulate,
        _ => cluster_phase(context, state, Face::Lower),
    };
    Ok(None)
}

/// Fold the current pair into the boomerang probability and look for another lower trail.
pub(crate) fn accumulate(state: &mut BoomerangState) -> Transition {
    let (upper, lower, switch) = match state.current.as_ref() {
        Some(pair) => (
            pair.upper_probability.unwrap_or_default(),
            pair.lower_probability.unwrap_or_default(),
            pair.switch,
        ),
        None => (0.0, 0.0, 0.0),
    };
    state.accumulate(upper, lower, switch);
    info!(
        "Found boomerang trail: {}, {}, {}. Boomerang probability {}.",
        log_probability(upper),
        log_probability(lower),
        log_probability(switch),
        log_probability(state.probability)
    );
    state.phase = Phase::NextLower;
    Ok(None)
}
