use crate::cipher::ConstraintParameters;
use crate::error::{SearchError, SearchResult};
use crate::search_config::SearchConfig;
use crate::solver::{Decision, append_exclusions};
use crate::trail::{TrailOutcome, TrailSearchState};
use cancel_this::is_cancelled;
use computation_process::Incomplete::Suspended;
use computation_process::{Completable, ComputationStep};
use log::{debug, info};

/// A [`ComputationStep`] that performs one solver query at the current weight of a
/// [`TrailSearchState`], and increases the weight if the query is unsatisfiable.
pub struct IterativeDeepening;

impl ComputationStep<SearchConfig, TrailSearchState, SearchResult<TrailOutcome>>
    for IterativeDeepening
{
    fn step(
        context: &SearchConfig,
        state: &mut TrailSearchState,
    ) -> Completable<SearchResult<TrailOutcome>> {
        if let Some(outcome) = &state.outcome {
            return Ok(outcome.clone());
        }

        is_cancelled!()?;

        let outcome = match try_weight(context, state) {
            Ok(None) => return Err(Suspended),
            Ok(Some(outcome)) => Ok(outcome),
            Err(error) => Err(error),
        };
        state.outcome = Some(outcome.clone());
        Ok(outcome)
    }
}

/// Query the solver for a trail of exactly `state.weight`.
fn try_weight(
    context: &SearchConfig,
    state: &mut TrailSearchState,
) -> SearchResult<Option<TrailOutcome>> {
    let weight = state.weight;
    if state.deadline.reached() {
        info!(
            "[weight:{weight}] {} trail search timed out after {:.2}s.",
            state.face,
            state.deadline.elapsed().as_secs_f64()
        );
        return Ok(Some(TrailOutcome::TimedOut { weight }));
    }
    if weight >= context.end_weight {
        info!(
            "[weight:{weight}] {} trail search reached the weight limit.",
            state.face
        );
        return Ok(Some(TrailOutcome::Exhausted { weight }));
    }

    let model = context.model.as_ref();
    debug!(
        "[weight:{weight}] Searching {} trail of {} ({} rounds, {}s elapsed).",
        state.face,
        model.name(),
        state.rounds,
        state.deadline.elapsed().as_secs()
    );

    context.scratch.ensure_exists()?;
    let path =
        context
            .scratch
            .constraint_file(state.face, model.name(), context.word_size, state.rounds);
    let parameters = ConstraintParameters {
        rounds: state.rounds,
        word_size: context.word_size,
        weight,
        iterative: context.iterative,
        fixed: &state.fixed,
        blocked: &state.blocked,
    };
    model
        .create_constraint_file(&path, &parameters)
        .map_err(|e| SearchError::io(&path, e))?;
    if !state.exclusions.is_empty() {
        debug!(
            "[weight:{weight}] Appending {} exclusions to `{}`.",
            state.exclusions.len(),
            path.display()
        );
        append_exclusions(&path, &state.exclusions)?;
    }

    match context.solver.solve(&path)? {
        Decision::Satisfiable(output) => {
            let characteristic =
                context
                    .parser
                    .parse(&output, model, state.rounds, context.word_size)?;
            info!(
                "[weight:{weight}] Found {} trail of {} in {:.2}s:\n{characteristic}",
                state.face,
                model.name(),
                state.deadline.elapsed().as_secs_f64()
            );
            Ok(Some(TrailOutcome::Found {
                characteristic,
                weight,
            }))
        }
        Decision::Unsatisfiable => {
            state.weight += 1;
            Ok(None)
        }
    }
}
