use figment::{providers::Env, Figment};
use serde::Deserialize;

use crate::error::LogBufferResult;

/// Prefix for environment variables read by [`load_config`].
pub const ENV_PREFIX: &str = "LOGBUFFER_";

/// Log buffer configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Label attached to the buffer's tracing events
    #[serde(default)]
    pub name: Option<String>,
    /// Bytes reserved up front for the content history
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: None,
            initial_capacity: default_initial_capacity(),
        }
    }
}

fn default_initial_capacity() -> usize {
    4096
}

/// Loads configuration from `LOGBUFFER_*` environment variables.
pub fn load_config() -> LogBufferResult<Config> {
    Ok(Figment::new().merge(Env::prefixed(ENV_PREFIX)).extract()?)
}
