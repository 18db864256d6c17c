use crate::characteristic::{Characteristic, Difference};
use crate::error::SearchResult;
use crate::search_config::{Deadline, Face, SearchConfig};
use crate::solver::Exclusion;
use crate::trail::TrailOutcome;
use std::collections::BTreeMap;

/// The evolving state of one [`crate::trail::TrailSearch`].
///
/// The weight only ever grows. Once the search finishes, its outcome is kept so that
/// repeated polling returns the same result.
#[derive(Clone, Debug)]
pub struct TrailSearchState {
    pub face: Face,
    pub rounds: usize,
    /// The weight of the next solver query.
    pub weight: usize,
    pub fixed: BTreeMap<String, Difference>,
    pub blocked: Vec<Characteristic>,
    /// Appended to the constraint file after the model wrote it.
    pub exclusions: Vec<Exclusion>,
    pub deadline: Deadline,
    pub(crate) outcome: Option<SearchResult<TrailOutcome>>,
}

impl TrailSearchState {
    /// Start at the face's configured minimal weight, with nothing fixed or blocked.
    pub fn new(config: &SearchConfig, face: Face) -> TrailSearchState {
        TrailSearchState {
            face,
            rounds: config.rounds_for(face),
            weight: config.start_weight_for(face),
            fixed: BTreeMap::new(),
            blocked: Vec::new(),
            exclusions: Vec::new(),
            deadline: Deadline::start(config.time_limit),
            outcome: None,
        }
    }

    pub fn with_weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }

    /// Pin `variable` to `value` in every query.
    pub fn with_fixed(mut self, variable: impl Into<String>, value: Difference) -> Self {
        self.fixed.insert(variable.into(), value);
        self
    }

    pub fn with_blocked(mut self, blocked: &[Characteristic]) -> Self {
        self.blocked = blocked.to_vec();
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Share the deadline of an enclosing search.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// The finished outcome, if any.
    pub fn outcome(&self) -> Option<&SearchResult<TrailOutcome>> {
        self.outcome.as_ref()
    }
}
