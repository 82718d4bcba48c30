//! Watcher strategies.

use crate::SagaError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default debounce delay when a strategy is named `debounce` without
/// an explicit delay and no configuration is available.
pub(crate) const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// How matching actions start executions of a saga's effect.
///
/// Action order is dispatch order. "In flight" means started and not
/// yet completed or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    /// Cancel the in-flight execution, then start a new one.
    TakeLatest,
    /// Start a new concurrent execution for every action.
    TakeEvery,
    /// Start only when nothing is in flight; drop actions while busy.
    TakeLeading,
    /// Start once after the delay passes with no further action.
    Debounce(Duration),
}

impl WatchStrategy {
    /// Checks the strategy's parameters.
    ///
    /// # Errors
    ///
    /// [`SagaError::InvalidStrategy`] for a zero debounce delay.
    pub fn validate(&self) -> Result<(), SagaError> {
        match self {
            Self::Debounce(d) if d.is_zero() => Err(SagaError::InvalidStrategy(
                "debounce delay must be greater than zero".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Parses a strategy name, using `default_debounce` for a bare
    /// `debounce`.
    ///
    /// Accepted: `take_latest`, `take_every`, `take_leading`,
    /// `debounce`, `debounce:<ms>`.
    ///
    /// # Errors
    ///
    /// [`SagaError::UnknownStrategy`] naming the input, or
    /// [`SagaError::InvalidStrategy`] for an unparseable delay.
    pub fn parse_with_default(s: &str, default_debounce: Duration) -> Result<Self, SagaError> {
        match s.trim() {
            "take_latest" => Ok(Self::TakeLatest),
            "take_every" => Ok(Self::TakeEvery),
            "take_leading" => Ok(Self::TakeLeading),
            "debounce" => Ok(Self::Debounce(default_debounce)),
            other => match other.strip_prefix("debounce:") {
                Some(ms) => ms
                    .trim()
                    .parse::<u64>()
                    .map(|ms| Self::Debounce(Duration::from_millis(ms)))
                    .map_err(|_| SagaError::InvalidStrategy(format!("bad debounce delay '{ms}'"))),
                None => Err(SagaError::UnknownStrategy(other.to_string())),
            },
        }
    }

    /// Strategy name without parameters.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TakeLatest => "take_latest",
            Self::TakeEvery => "take_every",
            Self::TakeLeading => "take_leading",
            Self::Debounce(_) => "debounce",
        }
    }
}

impl fmt::Display for WatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debounce(d) => write!(f, "debounce:{}", d.as_millis()),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for WatchStrategy {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_default(s, DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!("take_latest".parse::<WatchStrategy>().unwrap(), WatchStrategy::TakeLatest);
        assert_eq!("take_every".parse::<WatchStrategy>().unwrap(), WatchStrategy::TakeEvery);
        assert_eq!(" take_leading ".parse::<WatchStrategy>().unwrap(), WatchStrategy::TakeLeading);
        assert_eq!(
            "debounce".parse::<WatchStrategy>().unwrap(),
            WatchStrategy::Debounce(DEFAULT_DEBOUNCE)
        );
        assert_eq!(
            "debounce:50".parse::<WatchStrategy>().unwrap(),
            WatchStrategy::Debounce(Duration::from_millis(50))
        );
    }

    #[test]
    fn bare_debounce_uses_given_default() {
        let s = WatchStrategy::parse_with_default("debounce", Duration::from_millis(7)).unwrap();
        assert_eq!(s, WatchStrategy::Debounce(Duration::from_millis(7)));
    }

    #[test]
    fn unknown_strategy_named_in_error() {
        match "take_most".parse::<WatchStrategy>() {
            Err(SagaError::UnknownStrategy(name)) => assert_eq!(name, "take_most"),
            other => panic!("expected UnknownStrategy, got {other:?}"),
        }
        assert!(matches!(
            "debounce:soon".parse::<WatchStrategy>(),
            Err(SagaError::InvalidStrategy(_))
        ));
    }

    #[test]
    fn zero_debounce_invalid() {
        assert!(WatchStrategy::Debounce(Duration::ZERO).validate().is_err());
        assert!(WatchStrategy::Debounce(Duration::from_millis(1)).validate().is_ok());
        assert!(WatchStrategy::TakeEvery.validate().is_ok());
    }

    #[test]
    fn display_parses_back() {
        for s in [
            WatchStrategy::TakeLatest,
            WatchStrategy::Debounce(Duration::from_millis(120)),
        ] {
            assert_eq!(s.to_string().parse::<WatchStrategy>().unwrap(), s);
        }
    }
}
