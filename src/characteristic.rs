use crate::error::{SearchError, SearchResult};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A difference value of a single cipher word (at most 128 bits wide).
///
/// Nibbles are indexed from the least significant end, i.e. nibble `0` is the last hex
/// digit of the textual representation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Difference(pub u128);

impl Difference {
    pub const ZERO: Difference = Difference(0);

    /// Parse a solver value. Accepts `0x`/`#x` hexadecimal and `0b`/`#b` binary notation.
    pub fn parse(text: &str) -> SearchResult<Difference> {
        let text = text.trim();
        let (digits, radix) = if let Some(hex) = strip_any(text, &["0x", "0X", "#x"]) {
            (hex, 16)
        } else if let Some(bin) = strip_any(text, &["0b", "#b"]) {
            (bin, 2)
        } else {
            return Err(SearchError::Parse(format!(
                "difference `{text}` has no radix prefix"
            )));
        };
        u128::from_str_radix(digits, radix)
            .map(Difference)
            .map_err(|e| SearchError::Parse(format!("invalid difference `{text}`: {e}")))
    }

    /// Extract the nibble at `index` for nibbles of `width` bits.
    pub fn nibble(&self, index: usize, width: usize) -> usize {
        let shift = index * width;
        if shift >= 128 {
            return 0;
        }
        let mask = (1u128 << width) - 1;
        ((self.0 >> shift) & mask) as usize
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Render as zero-padded hexadecimal for a word of `word_size` bits.
    pub fn to_hex(&self, word_size: usize) -> String {
        format!("0x{:0width$x}", self.0, width = word_size.div_ceil(4))
    }

    /// Render as a bit-vector literal of exactly `width` bits: hexadecimal when `width` is a
    /// multiple of four, binary otherwise.
    pub fn to_literal(&self, width: usize) -> String {
        if width.is_multiple_of(4) {
            self.to_hex(width)
        } else {
            format!("0b{:0width$b}", self.0)
        }
    }
}

impl Display for Difference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u128> for Difference {
    fn from(value: u128) -> Self {
        Difference(value)
    }
}

fn strip_any<'a>(text: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| text.strip_prefix(p))
}

/// A differential characteristic (trail) as reported by the solver.
///
/// The values are stored per variable label (e.g. `X`, `S`, `P`, `w`) and round. The first
/// label is always the state difference, so `X0` is the input difference and `X{rounds}`
/// is the output difference of the trail.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Characteristic {
    rounds: usize,
    word_size: usize,
    labels: Vec<String>,
    values: BTreeMap<String, Difference>,
}

impl Characteristic {
    pub fn new(
        rounds: usize,
        word_size: usize,
        labels: Vec<String>,
        values: BTreeMap<String, Difference>,
    ) -> Characteristic {
        Characteristic {
            rounds,
            word_size,
            labels,
            values,
        }
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The value of variable `label` in the given `round`, if the solver assigned it.
    pub fn value(&self, label: &str, round: usize) -> Option<Difference> {
        self.values.get(&format!("{label}{round}")).copied()
    }

    /// Values of all labels in one round, in label order.
    pub fn round(&self, round: usize) -> Vec<Option<Difference>> {
        self.labels.iter().map(|l| self.value(l, round)).collect()
    }

    pub fn input_difference(&self) -> Difference {
        self.state_value(0)
    }

    pub fn output_difference(&self) -> Difference {
        self.state_value(self.rounds)
    }

    /// Sum of the Hamming weights of all `w` variables.
    pub fn weight(&self) -> u32 {
        (0..self.rounds)
            .filter_map(|r| self.value("w", r))
            .map(|w| w.0.count_ones())
            .sum()
    }

    /// All assigned `(variable, value)` pairs, ordered by variable name.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, Difference)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn state_value(&self, round: usize) -> Difference {
        self.labels
            .first()
            .and_then(|label| self.value(label, round))
            .unwrap_or_default()
    }
}

impl Display for Characteristic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rounds")?;
        for label in &self.labels {
            write!(f, "\t{label}")?;
        }
        writeln!(f)?;
        for round in 0..=self.rounds {
            write!(f, "{round}")?;
            for value in self.round(round) {
                match value {
                    Some(v) => write!(f, "\t{}", v.to_hex(self.word_size))?,
                    None => write!(f, "\tnone")?,
                }
            }
            writeln!(f)?;
        }
        write!(f, "Weight: {}", self.weight())
    }
}
