use crate::characteristic::Characteristic;
use crate::error::SearchResult;
use crate::search_config::{Deadline, Face, SearchConfig};
use crate::trail::{TrailOutcome, TrailSearch, TrailSearchState};
use cancel_this::is_cancelled;
use computation_process::{Completable, Computable, Generator, GeneratorStep, Stateful};
use log::info;

/// One item of a [`CharacteristicEnumeration`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumeratedCharacteristic {
    pub characteristic: Characteristic,
    pub weight: usize,
}

/// Enumerates distinct characteristics of the standalone differential in ascending weight.
pub type CharacteristicEnumeration = Generator<
    SearchConfig,
    EnumerationState,
    SearchResult<EnumeratedCharacteristic>,
    BlockAndResume,
>;

pub struct EnumerationState {
    search: TrailSearch,
    /// `config.blocked` followed by every characteristic produced so far.
    pub blocked: Vec<Characteristic>,
    pub produced: usize,
    deadline: Deadline,
    /// Why the enumeration stopped, once it did.
    pub termination: Option<EnumerationEnd>,
}

/// Why a [`CharacteristicEnumeration`] stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnumerationEnd {
    /// `max_characteristics` were produced.
    Limit,
    /// No further characteristic exists below the end weight.
    Exhausted { weight: usize },
    TimedOut { weight: usize },
    /// The last item was a solver or parser error.
    Failed,
}

impl EnumerationState {
    pub fn new(config: &SearchConfig) -> EnumerationState {
        let deadline = Deadline::start(config.time_limit);
        let blocked = config.blocked.clone();
        let search = TrailSearchState::new(config, Face::Differential)
            .with_blocked(&blocked)
            .with_deadline(deadline);
        EnumerationState {
            search: TrailSearch::configure(config.clone(), search),
            blocked,
            produced: 0,
            deadline,
            termination: None,
        }
    }

    fn is_finished(&self) -> bool {
        self.termination.is_some()
    }
}

/// A [`GeneratorStep`] that blocks every characteristic it finds and resumes the trail
/// search at the same weight.
pub struct BlockAndResume;

impl GeneratorStep<SearchConfig, EnumerationState, SearchResult<EnumeratedCharacteristic>>
    for BlockAndResume
{
    fn step(
        context: &SearchConfig,
        state: &mut EnumerationState,
    ) -> Completable<Option<SearchResult<EnumeratedCharacteristic>>> {
        if state.is_finished() {
            return Ok(None);
        }
        if state.produced >= context.max_characteristics {
            info!("Enumerated {} characteristics.", state.produced);
            state.termination = Some(EnumerationEnd::Limit);
            return Ok(None);
        }

        is_cancelled!()?;

        let outcome = match state.search.try_compute()? {
            Ok(outcome) => outcome,
            Err(error) => {
                state.termination = Some(EnumerationEnd::Failed);
                return Ok(Some(Err(error)));
            }
        };
        match outcome {
            TrailOutcome::Found {
                characteristic,
                weight,
            } => {
                state.blocked.push(characteristic.clone());
                state.produced += 1;
                let search = TrailSearchState::new(context, Face::Differential)
                    .with_weight(weight)
                    .with_blocked(&state.blocked)
                    .with_deadline(state.deadline);
                state.search = TrailSearch::configure(context.clone(), search);
                Ok(Some(Ok(EnumeratedCharacteristic {
                    characteristic,
                    weight,
                })))
            }
            TrailOutcome::Exhausted { weight } => {
                info!(
                    "[weight:{weight}] Enumerated all {} characteristics.",
                    state.produced
                );
                state.termination = Some(EnumerationEnd::Exhausted { weight });
                Ok(None)
            }
            TrailOutcome::TimedOut { weight } => {
                info!(
                    "[weight:{weight}] Enumeration timed out after {} characteristics.",
                    state.produced
                );
                state.termination = Some(EnumerationEnd::TimedOut { weight });
                Ok(None)
            }
        }
    }
}
