//! How long to wait before retrying a failed connection.

use backoff::{
    backoff::{Backoff, Constant},
    ExponentialBackoffBuilder,
};
use serde::Deserialize;
use std::time::Duration;

/// Used when no strategy is configured, or a strategy has nothing to offer
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// A retry delay generator. Reset whenever a connection succeeds.
pub type ReconnectStrategy = Box<dyn Backoff + Send + Sync>;

/// The same delay every time
pub fn fixed(delay: Duration) -> ReconnectStrategy
{
    Box::new(Constant::new(delay))
}

/// Delays growing from `initial` towards `max`, with jitter
pub fn exponential(initial: Duration, max: Duration) -> ReconnectStrategy
{
    Box::new(
        ExponentialBackoffBuilder::new()
            .with_initial_interval(initial)
            .with_max_interval(max)
            .with_max_elapsed_time(None)
            .build(),
    )
}

/// Configuration-file form of a [`ReconnectStrategy`]. Times are in seconds.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ReconnectConfig
{
    Fixed { delay: u64 },
    Exponential { initial: u64, max: u64 },
}

impl Default for ReconnectConfig
{
    fn default() -> Self
    {
        Self::Fixed {
            delay: DEFAULT_RECONNECT_DELAY.as_secs(),
        }
    }
}

impl ReconnectConfig
{
    pub fn build(&self) -> ReconnectStrategy
    {
        match self
        {
            Self::Fixed { delay } => fixed(Duration::from_secs(*delay)),
            Self::Exponential { initial, max } => {
                exponential(Duration::from_secs(*initial), Duration::from_secs(*max))
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_is_one_minute_fixed()
    {
        let mut strategy = ReconnectConfig::default().build();

        for _ in 0..5
        {
            assert_eq!(strategy.next_backoff(), Some(DEFAULT_RECONNECT_DELAY));
        }
    }

    #[test]
    fn parses_tagged_strategies()
    {
        let fixed: ReconnectConfig =
            serde_json::from_str(r#"{"strategy": "fixed", "delay": 30}"#).unwrap();
        assert_eq!(fixed, ReconnectConfig::Fixed { delay: 30 });

        let exp: ReconnectConfig =
            serde_json::from_str(r#"{"strategy": "exponential", "initial": 5, "max": 600}"#)
                .unwrap();
        assert_eq!(exp, ReconnectConfig::Exponential { initial: 5, max: 600 });
    }

    #[test]
    fn exponential_never_gives_up()
    {
        let mut strategy = exponential(Duration::from_secs(2), Duration::from_secs(10));

        let first = strategy.next_backoff().unwrap();
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_secs(3));

        for _ in 0..50
        {
            let delay = strategy.next_backoff().unwrap();
            // Jitter can take a capped interval up to half again over the cap
            assert!(delay <= Duration::from_secs(15));
        }
    }
}
