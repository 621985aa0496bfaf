//! Process-wide thread pool setup

use crate::config::RuntimeConfig;
use crate::error::{InsightError, Result};
use std::sync::OnceLock;
use tracing::{debug, info};

static RUNTIME: OnceLock<RuntimeConfig> = OnceLock::new();

/// Cap the numeric backends' worker threads for the whole process.
///
/// Only the first call configures the global rayon pool; later calls return
/// the configuration that is already in effect.
pub fn init(config: RuntimeConfig) -> Result<&'static RuntimeConfig> {
    if let Some(active) = RUNTIME.get() {
        debug!(n_threads = active.n_threads, "Runtime already initialized");
        return Ok(active);
    }

    if config.n_threads == 0 {
        return Err(InsightError::ConfigError("n_threads must be positive".to_string()));
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.n_threads)
        .build_global()
    {
        Ok(()) => info!(n_threads = config.n_threads, "Global thread pool configured"),
        // Another component built the pool first; keep running on it.
        Err(e) => debug!(error = %e, "Global thread pool already built"),
    }

    Ok(RUNTIME.get_or_init(|| config))
}

/// Configuration applied by [`init`], if any
pub fn active() -> Option<&'static RuntimeConfig> {
    RUNTIME.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = init(RuntimeConfig { n_threads: 2 }).unwrap().clone();
        let second = init(RuntimeConfig { n_threads: 8 }).unwrap();

        assert_eq!(&first, second);
        assert_eq!(active(), Some(second));
    }
}
