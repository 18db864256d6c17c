use crate::characteristic::{Characteristic, Difference};
use crate::error::{SearchError, SearchResult};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// The structural paradigm of a cipher's round function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Paradigm {
    Spn,
    Arx,
    Feistel,
    GeneralizedFeistel,
}

impl Paradigm {
    /// Boomerang connectivity through Feistel-like switches is only defined for these.
    pub fn supports_boomerang(&self) -> bool {
        matches!(self, Paradigm::Feistel | Paradigm::GeneralizedFeistel)
    }
}

impl FromStr for Paradigm {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spn" => Ok(Paradigm::Spn),
            "arx" => Ok(Paradigm::Arx),
            "feistel" => Ok(Paradigm::Feistel),
            "gfn" => Ok(Paradigm::GeneralizedFeistel),
            other => Err(SearchError::Configuration(format!(
                "unknown design paradigm `{other}`"
            ))),
        }
    }
}

impl Display for Paradigm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Paradigm::Spn => "spn",
            Paradigm::Arx => "arx",
            Paradigm::Feistel => "feistel",
            Paradigm::GeneralizedFeistel => "gfn",
        };
        write!(f, "{name}")
    }
}

/// Everything a [`CipherModel`] needs to emit one constraint file.
pub struct ConstraintParameters<'a> {
    pub rounds: usize,
    pub word_size: usize,
    /// The exact weight of the characteristic the solver should look for.
    pub weight: usize,
    /// Only look for iterative characteristics (input difference = output difference).
    pub iterative: bool,
    /// Variables pinned to a fixed difference, keyed by variable name (e.g. `X0`).
    pub fixed: &'a BTreeMap<String, Difference>,
    /// Characteristics that must not be returned again.
    pub blocked: &'a [Characteristic],
}

/// The capabilities a cipher model must provide to take part in a search.
///
/// Implementations translate one cipher's round function into solver-native constraints.
/// The remaining methods expose the substitution layer used for boomerang switches.
pub trait CipherModel: Send + Sync {
    fn name(&self) -> &str;

    /// Write a constraint file describing `parameters.rounds` rounds of differential
    /// propagation, including the weight assertion, the non-zero assertion, the optional
    /// iterative assertion, all fixed variables and one negative assertion per blocked
    /// characteristic. The file must end with the solver query.
    fn create_constraint_file(
        &self,
        path: &Path,
        parameters: &ConstraintParameters,
    ) -> std::io::Result<()>;

    fn substitution_table(&self) -> &[u8];

    /// Width of the substitution table input in bits.
    fn substitution_bits(&self) -> usize;

    /// Nibble wiring applied between the upper and the lower part of a switch.
    fn permutation(&self) -> &[usize];

    fn paradigm(&self) -> Paradigm;

    /// Variable classes used in the constraint file; the first one is the state difference.
    fn variable_labels(&self) -> Vec<String>;
}

/// Check that a model is usable for a search over words of `word_size` bits.
pub fn validate_model(model: &dyn CipherModel, word_size: usize) -> SearchResult<()> {
    let bits = model.substitution_bits();
    if !(1..=8).contains(&bits) {
        return Err(SearchError::Configuration(format!(
            "substitution width {bits} is not in 1..=8"
        )));
    }

    let table = model.substitution_table();
    if table.len() != 1 << bits {
        return Err(SearchError::Configuration(format!(
            "substitution table has {} entries, expected {}",
            table.len(),
            1 << bits
        )));
    }
    if let Some(bad) = table.iter().find(|v| usize::from(**v) >= 1 << bits) {
        return Err(SearchError::Configuration(format!(
            "substitution table entry {bad:#x} exceeds {bits} bits"
        )));
    }

    if word_size == 0 || word_size > 128 || word_size % bits != 0 {
        return Err(SearchError::Configuration(format!(
            "word size {word_size} is not a multiple of {bits} in 1..=128"
        )));
    }

    let nibbles = word_size / bits;
    if let Some(bad) = model.permutation().iter().find(|p| **p >= nibbles) {
        return Err(SearchError::Configuration(format!(
            "permutation entry {bad} exceeds the {nibbles} nibbles of a word"
        )));
    }

    if model.variable_labels().is_empty() {
        return Err(SearchError::Configuration(
            "model declares no variable labels".to_string(),
        ));
    }

    Ok(())
}
