use crate::{Error, IsolationLevel, Result};
use std::{env, ops::RangeInclusive, str::FromStr, time::Duration};

/// Session level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Affected row counts accepted after an insert or upsert, anything else is logged
    /// and swallowed. Backends report 1 for an insert, 2 for an upsert that updated
    /// and 0 for an upsert that left the row untouched.
    pub accepted_write_counts: RangeInclusive<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accepted_write_counts: 0..=2,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `ROWKIT_ACCEPTED_WRITE_COUNTS` (`min..=max`).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = env::var("ROWKIT_ACCEPTED_WRITE_COUNTS") {
            config.accepted_write_counts = parse_range(&value)?;
        }
        Ok(config)
    }
}

/// Transaction runner settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Attempts, the first one included.
    pub tries: u32,
    /// Base delay between attempts, a random jitter up to the same amount is added.
    pub retry_delay: Duration,
    /// Isolation set when the transaction starts, `None` keeps the connection default.
    pub isolation: Option<IsolationLevel>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            tries: 3,
            retry_delay: Duration::from_millis(1000),
            isolation: Some(IsolationLevel::ReadUncommitted),
        }
    }
}

impl TransactionConfig {
    /// Defaults overridden by `ROWKIT_TX_TRIES` and `ROWKIT_TX_RETRY_DELAY_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(tries) = configured::<u32>("ROWKIT_TX_TRIES")? {
            config.tries = tries.max(1);
        }
        if let Some(delay) = configured::<u64>("ROWKIT_TX_RETRY_DELAY_MS")? {
            config.retry_delay = Duration::from_millis(delay);
        }
        Ok(config)
    }

    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_isolation(mut self, isolation: Option<IsolationLevel>) -> Self {
        self.isolation = isolation;
        self
    }
}

fn configured<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::new(e).context(format!("Invalid value `{value}` for {name}")))
}

fn parse_range(value: &str) -> Result<RangeInclusive<u64>> {
    let error = || Error::msg(format!("Invalid range `{value}`, expected `min..=max`"));
    let (min, max) = value.trim().split_once("..=").ok_or_else(error)?;
    let min = min.trim().parse::<u64>().map_err(|_| error())?;
    let max = max.trim().parse::<u64>().map_err(|_| error())?;
    if min > max {
        return Err(error());
    }
    Ok(min..=max)
}
