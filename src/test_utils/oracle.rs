//! A [`SolverRunner`] that answers queries from a fixed list of trails.
//!
//! The oracle reads constraint files written by [`super::ToyCipher`] and behaves like a
//! solver over a cipher whose only characteristics are the listed [`ToyTrail`]s: a query is
//! satisfiable iff some trail has the requested round count and exact weight, agrees with all
//! fixed variables, is not blocked and violates none of the appended exclusions.

use crate::characteristic::Difference;
use crate::error::{SearchError, SearchResult};
use crate::solver::{Decision, SOLUTION_MARKER, SolverRunner};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Debug)]
pub struct ToyTrail {
    pub rounds: usize,
    pub weight: usize,
    pub values: BTreeMap<String, u128>,
}

impl ToyTrail {
    pub fn new(rounds: usize, weight: usize, values: &[(&str, u128)]) -> ToyTrail {
        ToyTrail {
            rounds,
            weight,
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn get(&self, variable: &str) -> u128 {
        self.values.get(variable).copied().unwrap_or(0)
    }
}

/// One query as seen by the oracle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub rounds: usize,
    pub weight: usize,
    pub iterative: bool,
    pub fixed: Vec<(String, u128)>,
    pub blocked: Vec<Vec<(String, u128)>>,
    /// `(variable, optional (high, low) bit range, value)`
    pub excluded: Vec<(String, Option<(usize, usize)>, u128)>,
}

#[derive(Default)]
pub struct Oracle {
    pub trails: Vec<ToyTrail>,
    /// Report one extra solution marker per counting query.
    pub odd_counts: bool,
    /// Every counting query reports zero solutions this many times before answering.
    pub zero_counts_before_answer: AtomicUsize,
    pub decisions: Mutex<Vec<Query>>,
    pub counts: Mutex<Vec<Query>>,
}

impl Oracle {
    pub fn new(trails: Vec<ToyTrail>) -> Oracle {
        Oracle {
            trails,
            ..Default::default()
        }
    }

    fn matching(&self, query: &Query) -> Vec<&ToyTrail> {
        self.trails
            .iter()
            .filter(|t| t.rounds == query.rounds && t.weight == query.weight)
            .filter(|t| query.fixed.iter().all(|(k, v)| t.get(k) == *v))
            .filter(|t| {
                !query
                    .blocked
                    .iter()
                    .any(|block| block.iter().all(|(k, v)| t.get(k) == *v))
            })
            .filter(|t| {
                !query.excluded.iter().any(|(k, range, v)| {
                    let value = t.get(k);
                    match range {
                        Some((high, low)) => {
                            let mask = (1u128 << (high - low + 1)) - 1;
                            (value >> low) & mask == *v
                        }
                        None => value == *v,
                    }
                })
            })
            .filter(|t| {
                !query.iterative || t.get("X0") == t.get(&format!("X{}", query.rounds))
            })
            .collect()
    }
}

impl SolverRunner for Oracle {
    fn solve(&self, constraint_file: &Path) -> SearchResult<Decision> {
        let query = read_query(constraint_file)?;
        let decision = match self.matching(&query).first() {
            Some(trail) => {
                let mut output = String::new();
                for (variable, value) in &trail.values {
                    output.push_str(&format!("ASSERT( {variable} = {value:#06x} );\n"));
                }
                output.push_str("Invalid.\n");
                Decision::Satisfiable(output)
            }
            None => Decision::Unsatisfiable,
        };
        self.decisions.lock().unwrap().push(query);
        Ok(decision)
    }

    fn count_solutions(&self, constraint_file: &Path, log_file: &Path) -> SearchResult<u64> {
        let query = read_query(constraint_file)?;
        let zero = self
            .zero_counts_before_answer
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let mut raw = if zero {
            0
        } else {
            2 * self.matching(&query).len() as u64
        };
        if self.odd_counts {
            raw += 1;
        }
        let log = format!("{SOLUTION_MARKER}\nv 1 -2 0\n").repeat(raw as usize);
        std::fs::write(log_file, log).map_err(|e| SearchError::io(log_file, e))?;
        self.counts.lock().unwrap().push(query);
        Ok(raw)
    }
}

fn read_query(path: &Path) -> SearchResult<Query> {
    let content = std::fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
    let mut query = Query::default();
    for line in content.lines() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("ROUNDS") => query.rounds = number(tokens.next()),
            Some("WEIGHT") => query.weight = number(tokens.next()),
            Some("ITERATIVE") => query.iterative = number(tokens.next()) == 1,
            Some("FIXED") => {
                let variable = tokens.next().unwrap_or_default().to_string();
                query.fixed.push((variable, value(tokens.next())?));
            }
            Some("BLOCK") => {
                let mut block = Vec::new();
                for term in tokens.next().unwrap_or_default().split(';') {
                    if let Some((k, v)) = term.split_once('=') {
                        block.push((k.to_string(), value(Some(v))?));
                    }
                }
                query.blocked.push(block);
            }
            _ => {
                if let Some(exclusion) = read_exclusion(line)? {
                    query.excluded.push(exclusion);
                }
            }
        }
    }
    Ok(query)
}

fn read_exclusion(line: &str) -> SearchResult<Option<(String, Option<(usize, usize)>, u128)>> {
    let Some(inner) = line
        .trim()
        .strip_prefix("ASSERT(NOT(")
        .and_then(|l| l.strip_suffix("));"))
    else {
        return Ok(None);
    };
    let Some((variable, v)) = inner.split_once('=') else {
        return Ok(None);
    };
    let variable = variable.trim();
    let (name, range) = match variable.split_once('[') {
        Some((name, range)) => {
            let range = range.trim_end_matches(']');
            let (high, low) = range.split_once(':').unwrap_or((range, range));
            (name, Some((number(Some(high)), number(Some(low)))))
        }
        None => (variable, None),
    };
    Ok(Some((name.to_string(), range, value(Some(v.trim()))?)))
}

fn number(token: Option<&str>) -> usize {
    token.and_then(|t| t.trim().parse().ok()).unwrap_or_default()
}

fn value(token: Option<&str>) -> SearchResult<u128> {
    Difference::parse(token.unwrap_or_default()).map(|d| d.0)
}
