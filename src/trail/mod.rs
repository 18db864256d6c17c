//! Iterative-deepening search for a single differential trail.
//!
//! The search starts at the face's minimal weight and asks the solver whether a trail of
//! exactly that weight exists. If not, the weight is increased by one and the query repeats.
//! Consequently, the first trail found has the minimal weight admitted by the fixed
//! variables, the blocked characteristics and the exclusions of the [`TrailSearchState`].
//!
//! One step of the computation is one solver invocation.
//!
//! # Example
//!
//! ```no_run
//! use boomerang_search::search_config::{Face, SearchConfig};
//! use boomerang_search::trail::{TrailOutcome, TrailSearch, TrailSearchState};
//! use computation_process::Algorithm;
//!
//! fn upper_trail(config: SearchConfig) {
//!     let state = TrailSearchState::new(&config, Face::Upper);
//!     match TrailSearch::run(config, state) {
//!         Ok(Ok(TrailOutcome::Found { characteristic, .. })) => println!("{characteristic}"),
//!         Ok(Ok(outcome)) => println!("no trail: {outcome:?}"),
//!         Ok(Err(error)) => eprintln!("search failed: {error}"),
//!         Err(_) => eprintln!("cancelled"),
//!     }
//! }
//! ```

mod iterative_deepening;
mod trail_state;


use crate::characteristic::Characteristic;
use crate::error::SearchResult;
use crate::search_config::SearchConfig;
use computation_process::Computation;
pub use iterative_deepening::IterativeDeepening;
pub use trail_state::TrailSearchState;

/// The terminal result of a trail search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrailOutcome {
    /// A trail of the given (minimal) weight.
    Found {
        characteristic: Characteristic,
        weight: usize,
    },
    /// No trail exists below the end weight.
    Exhausted { weight: usize },
    /// The wall-clock budget ran out before a trail was found.
    TimedOut { weight: usize },
}

impl TrailOutcome {
    pub fn weight(&self) -> usize {
        match self {
            TrailOutcome::Found { weight, .. }
            | TrailOutcome::Exhausted { weight }
            | TrailOutcome::TimedOut { weight } => *weight,
        }
    }
}

/// Minimal-weight trail search driven by [`IterativeDeepening`].
pub type TrailSearch =
    Computation<SearchConfig, TrailSearchState, SearchResult<TrailOutcome>, IterativeDeepening>;
