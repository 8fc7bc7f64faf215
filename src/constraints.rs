//! Timing and parallelism limits of a tournament.
//!
//! The main entry point is [`ConstraintsBuilder`]. Limits include:
//!
//! - **Message timeout**: how long the referee waits for each agent message
//! - **Shutdown timeout**: how long agents may keep running after the last round
//! - **Parallel matches**: how many matches of one bracket round run at the same time
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use rps_arena::constraints::ConstraintsBuilder;
//!
//! let constraints = ConstraintsBuilder::new()
//!     .with_message_timeout(Duration::from_millis(200))
//!     .with_parallel_matches(4)
//!     .build()
//!     .unwrap();
//! ```
//!
//! Constraints can also be read from environment variables using
//! [`ConstraintsBuilder::from_env()`].

use std::{env, time::Duration};

use anyhow::bail;

/// Default deadline of every referee/agent exchange.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_millis(100);
/// Default time left to agents to return after the last round.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// A builder for [`Constraints`].
///
/// By default both timeouts are 100 ms and as many matches run in parallel as there are
/// physical CPUs.
#[derive(Debug, Default, Clone)]
pub struct ConstraintsBuilder {
    message_timeout: Option<Duration>,
    shutdown_timeout: Option<Duration>,
    parallel_matches: Option<usize>,
}

impl ConstraintsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder configured from environment variables.
    ///
    /// Read environment variables are:
    /// - `MESSAGE_TIMEOUT_MS` (u64): deadline of each message in milliseconds
    /// - `SHUTDOWN_TIMEOUT_MS` (u64): shutdown deadline in milliseconds
    /// - `PARALLEL_MATCHES` (usize): number of matches run at the same time
    ///
    /// Unset or unparsable variables keep the default value.
    #[must_use]
    pub fn from_env() -> Self {
        fn parse_usize(var: &str) -> Option<usize> {
            env::var(var).ok()?.parse().ok()
        }

        fn parse_duration_millis(var: &str) -> Option<Duration> {
            env::var(var)
                .ok()?
                .parse::<u64>()
                .ok()
                .map(Duration::from_millis)
        }

        ConstraintsBuilder {
            message_timeout: parse_duration_millis("MESSAGE_TIMEOUT_MS"),
            shutdown_timeout: parse_duration_millis("SHUTDOWN_TIMEOUT_MS"),
            parallel_matches: parse_usize("PARALLEL_MATCHES"),
        }
    }

    /// Sets the maximum duration of a single exchange with an agent.
    #[must_use]
    pub fn with_message_timeout(self, duration: Duration) -> Self {
        Self {
            message_timeout: Some(duration),
            ..self
        }
    }

    /// Sets how long agents may take to return once the last round result is sent.
    #[must_use]
    pub fn with_shutdown_timeout(self, duration: Duration) -> Self {
        Self {
            shutdown_timeout: Some(duration),
            ..self
        }
    }

    #[must_use]
    pub fn with_parallel_matches(self, count: usize) -> Self {
        Self {
            parallel_matches: Some(count),
            ..self
        }
    }

    /// # Errors
    ///
    /// When a timeout is zero or no match may run.
    pub fn build(self) -> anyhow::Result<Constraints> {
        let message_timeout = self.message_timeout.unwrap_or(DEFAULT_MESSAGE_TIMEOUT);
        let shutdown_timeout = self.shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        if message_timeout.is_zero() || shutdown_timeout.is_zero() {
            bail!("timeouts must be positive");
        }

        // physical CPUs: agents of a match run on two threads already
        let parallel_matches = self.parallel_matches.unwrap_or_else(num_cpus::get_physical);
        if parallel_matches == 0 {
            bail!("at least one match must be allowed to run");
        }

        Ok(Constraints {
            message_timeout,
            shutdown_timeout,
            parallel_matches,
        })
    }
}

/// Obtained using [`ConstraintsBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constraints {
    pub(crate) message_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) parallel_matches: usize,
}

impl Constraints {
    pub fn builder() -> ConstraintsBuilder {
        ConstraintsBuilder::new()
    }

    pub fn message_timeout(&self) -> Duration {
        self.message_timeout
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn parallel_matches(&self) -> usize {
        self.parallel_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let constraints = ConstraintsBuilder::new().build().unwrap();
        assert_eq!(constraints.message_timeout(), Duration::from_millis(100));
        assert_eq!(constraints.shutdown_timeout(), Duration::from_millis(100));
        assert!(constraints.parallel_matches() >= 1);
    }

    #[test]
    fn impossible_constraints() {
        assert!(Constraints::builder()
            .with_parallel_matches(0)
            .build()
            .is_err());
        assert!(Constraints::builder()
            .with_message_timeout(Duration::ZERO)
            .build()
            .is_err());
    }
}
