//! Boomerang connectivity of a substitution layer.
//!
//! The [`ConnectivityTable`] is the Feistel boomerang connectivity table (FBCT) of a single
//! S-box. [`SwitchLayout`] describes which S-boxes of a cipher state take part in the switch
//! between the upper and the lower trail, and uses the table to compute the probability of a
//! switch or the solver exclusions that rule out impossible ones.

mod switch;


use crate::cipher::{CipherModel, Paradigm};
use crate::error::{SearchError, SearchResult};
use log::debug;
use std::fmt::{Display, Formatter};
pub use switch::{Switch, SwitchLayout, check_switch};

/// A square table of connectivity counts indexed by `(input difference, output difference)`
/// of one S-box. Both axes have `2^bits` entries.
///
/// The table is built once per search and is read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectivityTable {
    bits: usize,
    entries: Vec<u32>,
}

impl ConnectivityTable {
    /// Build the FBCT of `sbox`: entry `(di, do)` counts the inputs `x` for which
    /// `S(x) ^ S(x ^ di) ^ S(x ^ do) ^ S(x ^ di ^ do) == 0`.
    ///
    /// Only Feistel-like paradigms have a switch through this table; anything else is a
    /// [`SearchError::Configuration`].
    pub fn build(sbox: &[u8], bits: usize, paradigm: Paradigm) -> SearchResult<ConnectivityTable> {
        if !paradigm.supports_boomerang() {
            return Err(SearchError::Configuration(format!(
                "no boomerang connectivity table for `{paradigm}` designs"
            )));
        }
        if !(1..=8).contains(&bits) || sbox.len() != 1 << bits {
            return Err(SearchError::Configuration(format!(
                "a {bits}-bit S-box needs {} entries, found {}",
                1usize << bits,
                sbox.len()
            )));
        }

        let size = 1usize << bits;
        let s = |x: usize| usize::from(sbox[x]);
        let mut entries = vec![0u32; size * size];
        for di in 0..size {
            for d_out in 0..size {
                entries[di * size + d_out] = (0..size)
                    .filter(|&x| s(x) ^ s(x ^ di) ^ s(x ^ d_out) ^ s(x ^ di ^ d_out) == 0)
                    .count() as u32;
            }
        }

        let table = ConnectivityTable { bits, entries };
        debug!(
            "Built {size}x{size} connectivity table ({} full entries).",
            table.full_count()
        );
        Ok(table)
    }

    /// Build the table of the substitution layer of a cipher model.
    pub fn for_model(model: &dyn CipherModel) -> SearchResult<ConnectivityTable> {
        Self::build(
            model.substitution_table(),
            model.substitution_bits(),
            model.paradigm(),
        )
    }

    /// The entry at `(input, output)`. Differences outside of the table have no connectivity.
    pub fn get(&self, input: usize, output: usize) -> u32 {
        let size = self.size();
        if input >= size || output >= size {
            return 0;
        }
        self.entries[input * size + output]
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        1 << self.bits
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn row(&self, input: usize) -> &[u32] {
        let size = self.size();
        &self.entries[input * size..(input + 1) * size]
    }

    /// Number of entries that connect with probability one.
    pub fn full_count(&self) -> usize {
        let full = self.size() as u32;
        self.entries.iter().filter(|e| **e == full).count()
    }
}

impl Display for ConnectivityTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self.size().to_string().len().max(2);
        write!(f, "{:>width$} |", "")?;
        for column in 0..self.size() {
            write!(f, " {column:>width$x}")?;
        }
        writeln!(f)?;
        for input in 0..self.size() {
            write!(f, "{input:>width$x} |")?;
            for count in self.row(input) {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
