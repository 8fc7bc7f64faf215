//! Config for the evaluator behaviors
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Flags are case-insensitive, set them to `"true"` to enable them.
//!
//! - `ARENA_VERBOSE`: print every pairing result (default: `true`)
//! - `ARENA_LOG`: enable logging to a file (default: `false`)
//! - `ARENA_SEED`: seed of every random choice (default: random)

/// Configuration for evaluator behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) seed: Option<u64>,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The evaluator prints pairing results to stdout.
    /// - Logging to file is disabled.
    /// - Tournaments are seeded randomly.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            seed: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// The following environment variables are recognized:
    /// - `ARENA_VERBOSE`: if set to `"true"`, enables verbose output (default: `true`)
    /// - `ARENA_LOG`: if set to `"true"`, enables logging to file (default: `false`)
    /// - `ARENA_SEED`: unsigned integer seed (default: none)
    ///
    /// Any other value (including unset) will result in using the default value for each field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        Self {
            verbose: get_env_flag("ARENA_VERBOSE", true),
            log: get_env_flag("ARENA_LOG", false),
            seed: std::env::var("ARENA_SEED")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Enable or disable verbose mode.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Make every tournament reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
