use crate::characteristic::{Characteristic, Difference};
use crate::cipher::CipherModel;
use crate::error::{SearchError, SearchResult};
use std::collections::BTreeMap;

/// Turns raw solver output into a [`Characteristic`].
pub trait CharacteristicParser: Send + Sync {
    fn parse(
        &self,
        output: &str,
        model: &dyn CipherModel,
        rounds: usize,
        word_size: usize,
    ) -> SearchResult<Characteristic>;
}

/// Parses variable assignments printed by STP (`ASSERT( X0 = 0x0012 );`) or by Boolector
/// in model mode (`<id> <value> <name>`, values in hexadecimal).
///
/// Only variables of the form `<label><round>` for the model's labels are retained.
#[derive(Copy, Clone, Debug, Default)]
pub struct AssignmentParser;

impl CharacteristicParser for AssignmentParser {
    fn parse(
        &self,
        output: &str,
        model: &dyn CipherModel,
        rounds: usize,
        word_size: usize,
    ) -> SearchResult<Characteristic> {
        let labels = model.variable_labels();
        let mut values = BTreeMap::new();
        for line in output.lines() {
            let assignment = match stp_assignment(line) {
                Some((name, value)) => Some((name, Difference::parse(value))),
                None => boolector_assignment(line).map(|(name, value)| (name, parse_hex(value))),
            };
            let Some((name, value)) = assignment else {
                continue;
            };
            if is_trail_variable(name, &labels, rounds) {
                values.insert(name.to_string(), value?);
            }
        }

        if values.is_empty() {
            return Err(SearchError::Parse(
                "output contains no satisfying assignment".to_string(),
            ));
        }

        Ok(Characteristic::new(rounds, word_size, labels, values))
    }
}

fn stp_assignment(line: &str) -> Option<(&str, &str)> {
    let inner = line.trim().strip_prefix("ASSERT(")?;
    let inner = inner.trim_end().strip_suffix(';')?.trim_end().strip_suffix(')')?;
    let (name, value) = inner.split_once('=')?;
    Some((name.trim(), value.trim()))
}

fn boolector_assignment(line: &str) -> Option<(&str, &str)> {
    let mut tokens = line.split_whitespace();
    let id = tokens.next()?;
    let value = tokens.next()?;
    let name = tokens.next()?;
    if tokens.next().is_some() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((name, value))
}

/// Boolector prints bare hexadecimal digits when run with `-x`.
fn parse_hex(value: &str) -> SearchResult<Difference> {
    if value.starts_with('#') {
        return Difference::parse(value);
    }
    u128::from_str_radix(value, 16)
        .map(Difference)
        .map_err(|e| SearchError::Parse(format!("invalid value `{value}`: {e}")))
}

fn is_trail_variable(name: &str, labels: &[String], rounds: usize) -> bool {
    labels.iter().any(|label| {
        name.strip_prefix(label.as_str())
            .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .and_then(|rest| rest.parse::<usize>().ok())
            .is_some_and(|round| round <= rounds)
    })
}
