pub mod oracle;
pub mod toy_cipher;

pub use oracle::{Oracle, ToyTrail};
pub use toy_cipher::ToyCipher;

use crate::scratch::ScratchSpace;
use crate::search_config::SearchConfig;
use crate::solver::AssignmentParser;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Initialize env_logger for tests. Safe to call multiple times.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// The WARP S-box.
pub const WARP_SBOX: [u8; 16] = [
    0xC, 0xA, 0xD, 0x3, 0xE, 0xB, 0xF, 0x7, 0x8, 0x9, 0x1, 0x5, 0x0, 0x2, 0x4, 0x6,
];

/// A scratch space unique to the calling test (tests run concurrently in one process).
pub fn test_scratch() -> ScratchSpace {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let id = NEXT.fetch_add(1, Ordering::SeqCst);
    ScratchSpace {
        directory: std::env::temp_dir()
            .join("boomerang-search-tests")
            .join(std::process::id().to_string()),
        run_id: format!("t{id}"),
    }
}

/// A configuration over a 16-bit generalized Feistel [`ToyCipher`], answered by `oracle`.
///
/// Both boomerang faces have one round, the clustering window covers two weights.
pub fn toy_config(oracle: Oracle) -> SearchConfig {
    toy_config_shared(Arc::new(oracle))
}

/// Same as [`toy_config`], but the caller keeps a handle to the oracle to inspect its calls.
pub fn toy_config_shared(oracle: Arc<Oracle>) -> SearchConfig {
    let mut config = SearchConfig::new(
        Arc::new(ToyCipher::gfn()),
        oracle,
        Arc::new(AssignmentParser),
        16,
    );
    config.rounds = 1;
    config.upper_rounds = 1;
    config.lower_rounds = 1;
    config.end_weight = 10;
    config.scratch = test_scratch();
    config
}
