#[cfg(test)]
mod test_utils;

pub mod bct;
pub mod boomerang;
pub mod characteristic;
pub mod cipher;
pub mod cluster;
pub mod differential;
pub mod error;
pub mod scratch;
pub mod search_config;
pub mod solver;
pub mod trail;

pub use error::{SearchError, SearchResult};

/// A utility method for printing probabilities as powers of two (e.g. `2^-12.42`).
pub fn log_probability(probability: f64) -> String {
    if probability <= 0.0 {
        return "0".to_string();
    }
    format!("2^{:.2}", probability.log2())
}
