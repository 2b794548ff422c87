use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates the random number generator of a run.
///
/// # Arguments
///
///  * `seed` - Seed number that allows reproducible results.
///
/// # Returns
///
/// A StdRng
pub fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Eight lowercase hex characters identifying a run.
pub fn generate_run_id(rng: &mut StdRng) -> String {
    format!("{:08x}", rng.random::<u32>())
}

/// Absolute form of a directory argument, falling back to `<cwd>/<default>`.
pub fn resolve_path(cwd: &Path, value: Option<&str>, default: &str) -> PathBuf {
    let path = PathBuf::from(value.unwrap_or(default));
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
