use crate::cipher::ConstraintParameters;
use crate::cluster::{ClusterOutcome, ClusterState};
use crate::error::{SearchError, SearchResult};
use crate::log_probability;
use crate::search_config::SearchConfig;
use cancel_this::is_cancelled;
use computation_process::Incomplete::Suspended;
use computation_process::{Completable, ComputationStep};
use log::{debug, info};

/// A [`ComputationStep`] that counts the trails of one weight and adds them to the
/// probability of a [`ClusterState`].
pub struct WeightWindow;

impl ComputationStep<SearchConfig, ClusterState, SearchResult<ClusterOutcome>> for WeightWindow {
    fn step(
        context: &SearchConfig,
        state: &mut ClusterState,
    ) -> Completable<SearchResult<ClusterOutcome>> {
        if let Some(outcome) = &state.outcome {
            return Ok(outcome.clone());
        }

        is_cancelled!()?;

        let outcome = match count_weight(context, state) {
            Ok(None) => return Err(Suspended),
            Ok(Some(outcome)) => Ok(outcome),
            Err(error) => Err(error),
        };
        state.outcome = Some(outcome.clone());
        Ok(outcome)
    }
}

fn count_weight(
    context: &SearchConfig,
    state: &mut ClusterState,
) -> SearchResult<Option<ClusterOutcome>> {
    let weight = state.weight;
    if state.deadline.reached() {
        info!(
            "[weight:{weight}] Clustering of {} differential timed out at {}.",
            state.face,
            log_probability(state.probability)
        );
        return Ok(Some(state.current(true)));
    }
    if weight >= state.window_end {
        info!(
            "Clustered {} differential: {} trails, probability {}.",
            state.face,
            state.trails,
            log_probability(state.probability)
        );
        return Ok(Some(state.current(false)));
    }

    let model = context.model.as_ref();
    context.scratch.ensure_exists()?;
    let path = context
        .scratch
        .cluster_file(state.face, model.name(), state.rounds);
    let log = context.scratch.solver_log();
    context.scratch.clear_log(&log)?;

    let parameters = ConstraintParameters {
        rounds: state.rounds,
        word_size: context.word_size,
        weight,
        iterative: context.iterative,
        fixed: &state.fixed,
        blocked: &[],
    };
    model
        .create_constraint_file(&path, &parameters)
        .map_err(|e| SearchError::io(&path, e))?;

    let raw = context.solver.count_solutions(&path, &log)?;
    // Every trail is encoded by exactly two satisfying assignments.
    if raw % 2 != 0 {
        return Err(SearchError::InconsistentCount(format!(
            "odd number of solution markers ({raw}) at weight {weight}"
        )));
    }
    let solutions = raw / 2;
    state.probability += (-(weight as f64)).exp2() * solutions as f64;
    state.trails += solutions;
    state.weight += 1;

    debug!(
        "[weight:{weight}] Found {solutions} {} trails; total {} with probability {} ({:.2}s).",
        state.face,
        state.trails,
        log_probability(state.probability),
        state.deadline.elapsed().as_secs_f64()
    );
    Ok(None)
}
