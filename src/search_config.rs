use crate::characteristic::Characteristic;
use crate::cipher::{CipherModel, validate_model};
use crate::error::{SearchError, SearchResult};
use crate::scratch::ScratchSpace;
use crate::solver::{CharacteristicParser, SolverRunner};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The part of the cipher a trail search targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Face {
    /// The upper trail of a boomerang (ends at the switch).
    Upper,
    /// The lower trail of a boomerang (starts at the switch).
    Lower,
    /// A standalone differential.
    Differential,
}

impl Display for Face {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Face::Upper => "upper",
            Face::Lower => "lower",
            Face::Differential => "differential",
        };
        write!(f, "{name}")
    }
}

/// Wall-clock budget of a search, checked cooperatively between solver invocations.
#[derive(Copy, Clone, Debug)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn start(limit: Option<Duration>) -> Deadline {
        Deadline {
            started: Instant::now(),
            limit,
        }
    }

    pub fn reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.started.elapsed() >= limit)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// A configuration object shared by all search computations.
///
/// The configuration is immutable for the duration of a run. Everything that evolves during
/// the search (current weight, blocked trails, pinned boomerang endpoints) is part of the
/// state of the individual computations.
#[derive(Clone)]
pub struct SearchConfig {
    pub model: Arc<dyn CipherModel>,
    pub solver: Arc<dyn SolverRunner>,
    pub parser: Arc<dyn CharacteristicParser>,
    /// Width of the cipher state in bits (at most 128).
    pub word_size: usize,
    /// Rounds of a standalone differential (default: `5`).
    pub rounds: usize,
    /// Rounds of the upper boomerang trail (default: `5`).
    pub upper_rounds: usize,
    /// Rounds of the lower boomerang trail (default: `5`).
    pub lower_rounds: usize,
    /// Starting weight of a standalone differential search (default: `0`).
    pub start_weight: usize,
    /// Starting weight of the upper trail search (default: `0`).
    pub upper_weight: usize,
    /// Starting weight of the lower trail search (default: `0`).
    pub lower_weight: usize,
    /// Trail searches give up once this weight is reached (default: `1000`).
    pub end_weight: usize,
    /// Clustering of an upper trail covers `word_size / upper_limit` weights (default: `8`).
    pub upper_limit: usize,
    /// Clustering of a lower trail covers `word_size / lower_limit` weights (default: `8`).
    pub lower_limit: usize,
    /// Clustering of a standalone differential covers `word_size / differential_limit`
    /// weights (default: `8`).
    pub differential_limit: usize,
    /// Only search for iterative characteristics (default: `false`).
    pub iterative: bool,
    /// Wall-clock budget of the whole run (default: unlimited).
    pub time_limit: Option<Duration>,
    /// Stop enumerating standalone characteristics after this many (default: `10_000_000`).
    pub max_characteristics: usize,
    /// Characteristics excluded from standalone differential searches.
    pub blocked: Vec<Characteristic>,
    pub scratch: ScratchSpace,
}

impl SearchConfig {
    /// Create a new [`SearchConfig`] with default bounds for words of `word_size` bits.
    pub fn new(
        model: Arc<dyn CipherModel>,
        solver: Arc<dyn SolverRunner>,
        parser: Arc<dyn CharacteristicParser>,
        word_size: usize,
    ) -> SearchConfig {
        SearchConfig {
            model,
            solver,
            parser,
            word_size,
            rounds: 5,
            upper_rounds: 5,
            lower_rounds: 5,
            start_weight: 0,
            upper_weight: 0,
            lower_weight: 0,
            end_weight: 1000,
            upper_limit: 8,
            lower_limit: 8,
            differential_limit: 8,
            iterative: false,
            time_limit: None,
            max_characteristics: 10_000_000,
            blocked: Vec::new(),
            scratch: ScratchSpace::default(),
        }
    }

    /// Check the cipher model and the numeric bounds. Fails with
    /// [`SearchError::Configuration`].
    pub fn validate(&self) -> SearchResult<()> {
        validate_model(self.model.as_ref(), self.word_size)?;
        if self.upper_limit == 0 || self.lower_limit == 0 || self.differential_limit == 0 {
            return Err(SearchError::Configuration(
                "clustering limits must be positive".to_string(),
            ));
        }
        if self.rounds == 0 || self.upper_rounds == 0 || self.lower_rounds == 0 {
            return Err(SearchError::Configuration(
                "round counts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Like [`SearchConfig::validate`], but also requires a paradigm with boomerang switches.
    pub fn validate_boomerang(&self) -> SearchResult<()> {
        self.validate()?;
        let paradigm = self.model.paradigm();
        if !paradigm.supports_boomerang() {
            return Err(SearchError::Configuration(format!(
                "boomerang search is not supported for `{paradigm}` designs"
            )));
        }
        Ok(())
    }

    pub fn rounds_for(&self, face: Face) -> usize {
        match face {
            Face::Upper => self.upper_rounds,
            Face::Lower => self.lower_rounds,
            Face::Differential => self.rounds,
        }
    }

    pub fn start_weight_for(&self, face: Face) -> usize {
        match face {
            Face::Upper => self.upper_weight,
            Face::Lower => self.lower_weight,
            Face::Differential => self.start_weight,
        }
    }

    /// Number of weights a clustering pass of this face covers.
    pub fn cluster_window(&self, face: Face) -> usize {
        let limit = match face {
            Face::Upper => self.upper_limit,
            Face::Lower => self.lower_limit,
            Face::Differential => self.differential_limit,
        };
        self.word_size.div_ceil(limit)
    }

    /// Name of the state difference variable in the given round (e.g. `X3`).
    pub fn state_variable(&self, round: usize) -> String {
        let labels = self.model.variable_labels();
        let label = labels.first().map(String::as_str).unwrap_or("X");
        format!("{label}{round}")
    }

    /// Number of substitution-sized nibbles in a word.
    pub fn nibbles(&self) -> usize {
        self.word_size / self.model.substitution_bits().max(1)
    }
}
