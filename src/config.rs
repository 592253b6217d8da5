//! Run configuration.
//!
//! Loading configuration from a file or the command line is an external
//! concern (a JSON parser, a CLI flag parser) that stays outside this crate;
//! `meshtrace` only specifies the shape of the result as [`RunConfig`] and
//! the [`ConfigSource`] contract that produces one.

use crate::exchange::ExchangeConfig;
use serde::{Deserialize, Serialize};

/// The knobs the engine needs at construction time, independent of how they
/// were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of simulated ranks to partition the mesh across.
    pub num_ranks: usize,
    /// Which halo exchange variant the transport loop's exchange pattern
    /// should use.
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Global time step passed to every `run_step` call.
    pub dt: f64,
    /// Maximum rejection-sampling attempts before a truncated distribution
    /// gives up with `DistributionUnsatisfiable`. Handed to
    /// [`crate::particle::ParticleEmitter::with_max_rejection_attempts`] when
    /// an embedder builds its emitters from a loaded `RunConfig`.
    #[serde(default = "default_rejection_cap")]
    pub max_rejection_attempts: usize,
}

fn default_rejection_cap() -> usize {
    crate::distributions::MAX_REJECTION_ATTEMPTS
}

/// Produces a [`RunConfig`] from wherever it actually lives (a file, an
/// environment, a remote config service). `meshtrace` does not implement
/// this trait itself; an embedding binary supplies a concrete source and
/// hands the resulting [`RunConfig`] to the engine.
pub trait ConfigSource {
    type Error;

    fn load(&self) -> Result<RunConfig, Self::Error>;
}

/// A [`ConfigSource`] that deserializes a [`RunConfig`] from an in-memory
/// JSON string, for tests and embedders that already have the document
/// (e.g. read from a file themselves) and just need the `serde_json` glue.
pub struct JsonStringSource<'a> {
    pub json: &'a str,
}

impl ConfigSource for JsonStringSource<'_> {
    type Error = serde_json::Error;

    fn load(&self) -> Result<RunConfig, Self::Error> {
        serde_json::from_str(self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults_for_omitted_fields() {
        let source = JsonStringSource { json: r#"{"num_ranks": 4, "dt": 0.1}"# };
        let config = source.load().unwrap();
        assert_eq!(config.num_ranks, 4);
        assert_eq!(config.exchange, ExchangeConfig::TwoSidedNonBlocking);
        assert_eq!(config.max_rejection_attempts, crate::distributions::MAX_REJECTION_ATTEMPTS);
    }

    #[test]
    fn rejects_malformed_json() {
        let source = JsonStringSource { json: "{not json" };
        assert!(source.load().is_err());
    }
}
