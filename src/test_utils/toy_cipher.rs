//! A cipher model that writes a small line-based constraint file instead of real STP.
//!
//! The format is understood by [`super::Oracle`]:
//!
//! ```text
//! ROUNDS 1
//! WEIGHT 3
//! ITERATIVE 0
//! FIXED X0 0x0010
//! BLOCK X0=0x0010;X1=0x0100
//! QUERY(FALSE);
//! COUNTEREXAMPLE;
//! ```
//!
//! Exclusions appended by [`crate::solver::append_exclusions`] keep their STP syntax.

use crate::cipher::{CipherModel, ConstraintParameters, Paradigm};
use crate::solver::QUERY;
use crate::test_utils::WARP_SBOX;
use std::io::Write;
use std::path::Path;

pub struct ToyCipher {
    pub sbox: Vec<u8>,
    pub permutation: Vec<usize>,
    pub paradigm: Paradigm,
}

impl ToyCipher {
    /// Four 4-bit nibbles; even nibbles switch into the permuted odd/even positions.
    pub fn gfn() -> ToyCipher {
        ToyCipher {
            sbox: WARP_SBOX.to_vec(),
            permutation: vec![3, 0, 1, 2],
            paradigm: Paradigm::GeneralizedFeistel,
        }
    }

    /// Four 4-bit nibbles; the lower half switches into the upper half.
    pub fn feistel() -> ToyCipher {
        ToyCipher {
            sbox: WARP_SBOX.to_vec(),
            permutation: vec![2, 3, 0, 1],
            paradigm: Paradigm::Feistel,
        }
    }
}

impl CipherModel for ToyCipher {
    fn name(&self) -> &str {
        "toy"
    }

    fn create_constraint_file(
        &self,
        path: &Path,
        parameters: &ConstraintParameters,
    ) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "% toy w={}", parameters.word_size)?;
        writeln!(file, "ROUNDS {}", parameters.rounds)?;
        writeln!(file, "WEIGHT {}", parameters.weight)?;
        writeln!(file, "ITERATIVE {}", u8::from(parameters.iterative))?;
        for (variable, value) in parameters.fixed {
            writeln!(file, "FIXED {variable} {value}")?;
        }
        for blocked in parameters.blocked {
            let terms = blocked
                .assignments()
                .map(|(variable, value)| format!("{variable}={value}"))
                .collect::<Vec<_>>();
            writeln!(file, "BLOCK {}", terms.join(";"))?;
        }
        write!(file, "{QUERY}")
    }

    fn substitution_table(&self) -> &[u8] {
        &self.sbox
    }

    fn substitution_bits(&self) -> usize {
        4
    }

    fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    fn paradigm(&self) -> Paradigm {
        self.paradigm
    }

    fn variable_labels(&self) -> Vec<String> {
        vec!["X".to_string(), "w".to_string()]
    }
}
