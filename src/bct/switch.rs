use crate::bct::ConnectivityTable;
use crate::characteristic::Difference;
use crate::cipher::Paradigm;
use crate::solver::Exclusion;

/// Result of checking a boomerang switch.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Switch {
    /// The switch is possible with the given probability (in `(0, 1]`).
    Accepted(f64),
    /// Some active S-box cannot connect the two differences.
    Rejected,
}

impl Switch {
    pub fn probability(&self) -> f64 {
        match self {
            Switch::Accepted(p) => *p,
            Switch::Rejected => 0.0,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Switch::Accepted(_))
    }
}

/// The S-box positions that take part in the switch between an upper and a lower trail.
///
/// Each position is a pair `(beta nibble, gamma nibble)`: the nibble of the upper output
/// difference entering an S-box, and the nibble of the lower input difference it is wired to
/// by the permutation. Nibbles are counted from the least significant end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchLayout {
    bits: usize,
    positions: Vec<(usize, usize)>,
}

impl SwitchLayout {
    /// Generalized Feistel networks switch through every other nibble, classic Feistel
    /// networks through every nibble of one half. Positions whose permuted nibble does not
    /// exist are skipped.
    pub fn new(
        paradigm: Paradigm,
        word_size: usize,
        bits: usize,
        permutation: &[usize],
    ) -> SwitchLayout {
        let nibbles = word_size / bits.max(1);
        let active: Vec<usize> = match paradigm {
            Paradigm::GeneralizedFeistel => (0..nibbles).step_by(2).collect(),
            Paradigm::Feistel => (0..nibbles / 2).collect(),
            Paradigm::Spn | Paradigm::Arx => Vec::new(),
        };
        let positions = active
            .into_iter()
            .filter_map(|beta| permutation.get(beta).map(|gamma| (beta, *gamma)))
            .collect();
        SwitchLayout { bits, positions }
    }

    pub fn positions(&self) -> &[(usize, usize)] {
        &self.positions
    }

    /// Multiply `table[b][g] / 2^bits` over all positions, rejecting on the first zero entry.
    pub fn check(&self, beta: Difference, gamma: Difference, table: &ConnectivityTable) -> Switch {
        let full = f64::from(1u32 << self.bits);
        let mut probability = 1.0;
        for (b, g) in &self.positions {
            let count = table.get(beta.nibble(*b, self.bits), gamma.nibble(*g, self.bits));
            if count == 0 {
                return Switch::Rejected;
            }
            probability *= f64::from(count) / full;
        }
        Switch::Accepted(probability)
    }

    /// Exclusions on the lower trail's input (`state_variable`) that rule out every switch
    /// `table` proves impossible for the upper output `beta`.
    ///
    /// Before the boomerang end point is pinned (`first_switch`), only switches of
    /// probability one are admitted. The lower input may never equal `beta` itself.
    pub fn invalid_switches(
        &self,
        beta: Difference,
        table: &ConnectivityTable,
        first_switch: bool,
        state_variable: &str,
        word_size: usize,
    ) -> Vec<Exclusion> {
        let full = table.size() as u32;
        let mut exclusions = Vec::new();
        for (b, g) in &self.positions {
            let input = beta.nibble(*b, self.bits);
            if input == 0 {
                continue;
            }
            let low = g * self.bits;
            let variable = format!("{state_variable}[{}:{low}]", low + self.bits - 1);
            for output in 0..table.size() {
                let count = table.get(input, output);
                if count == 0 || (first_switch && count != full) {
                    let value = Difference(output as u128).to_literal(self.bits);
                    exclusions.push(Exclusion::new(variable.clone(), value));
                }
            }
        }
        exclusions.push(Exclusion::new(state_variable, beta.to_literal(word_size)));
        exclusions
    }
}

/// Check the switch between the upper output `beta` and the lower input `gamma`.
pub fn check_switch(
    beta: Difference,
    gamma: Difference,
    table: &ConnectivityTable,
    permutation: &[usize],
    paradigm: Paradigm,
    word_size: usize,
) -> Switch {
    SwitchLayout::new(paradigm, word_size, table.bits(), permutation).check(beta, gamma, table)
}
