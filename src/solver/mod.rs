//! The boundary between the search engine and the external constraint solver.
//!
//! The search only ever talks to a solver through [`SolverRunner`] (to decide or count
//! constraint files) and [`CharacteristicParser`] (to turn a satisfying assignment into a
//! [`crate::characteristic::Characteristic`]). [`ExternalSolver`] and [`AssignmentParser`]
//! implement these for the STP/Boolector/CryptoMiniSat tool chain.

mod constraints;
mod external;
mod parser;

pub use constraints::{Exclusion, QUERY, append_exclusions};
pub use external::{DecisionBackend, ExternalSolver, SolverPaths};
pub use parser::{AssignmentParser, CharacteristicParser};

use crate::error::{SearchError, SearchResult};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Marker line printed by the SAT solver for every enumerated solution.
pub const SOLUTION_MARKER: &str = "s SATISFIABLE";

/// Result of running the solver in decision mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The raw solver output containing the satisfying assignment.
    Satisfiable(String),
    Unsatisfiable,
}

pub trait SolverRunner: Send + Sync {
    /// Decide a single constraint file.
    fn solve(&self, constraint_file: &Path) -> SearchResult<Decision>;

    /// Enumerate all solutions of a constraint file, appending every output line to
    /// `log_file`. Returns the raw number of [`SOLUTION_MARKER`] lines.
    ///
    /// The call blocks until the solver exits.
    fn count_solutions(&self, constraint_file: &Path, log_file: &Path) -> SearchResult<u64>;
}

/// Count [`SOLUTION_MARKER`] lines in a solver log.
pub fn count_markers_in_log(log_file: &Path) -> SearchResult<u64> {
    let file = std::fs::File::open(log_file).map_err(|e| SearchError::io(log_file, e))?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| SearchError::io(log_file, e))?;
        if line.contains(SOLUTION_MARKER) {
            count += 1;
        }
    }
    Ok(count)
}
