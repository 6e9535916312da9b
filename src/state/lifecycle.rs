//! Race start scheduling and phase arithmetic.

use thiserror::Error;

/// Fixed lead time between an owner pressing start and the race going live.
pub const START_LEAD_MS: u64 = 5_000;

/// Stored lifecycle of a race. Only the start timestamp is persisted; every
/// later phase is derived from it and the observer's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceLifecycle {
    /// Nobody has started the race yet.
    Waiting,
    /// A start timestamp has been written; it never changes afterwards.
    Scheduled {
        /// Epoch milliseconds at which typing opens.
        started_at: u64,
    },
}

/// Events that can be applied to a [`RaceLifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Schedule the race to open at `at` (epoch milliseconds).
    Start {
        /// Requested start timestamp.
        at: u64,
    },
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the race was in when the event arrived.
    pub from: RaceLifecycle,
    /// Rejected event.
    pub event: LifecycleEvent,
}

/// Phase of a race as seen by an observer at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedPhase {
    /// No start timestamp: the roster is shown.
    Waiting,
    /// Start is in the future.
    Countdown {
        /// Milliseconds left until the start timestamp (always > 0).
        remaining_ms: u64,
    },
    /// Start timestamp reached or passed.
    Active,
}

impl RaceLifecycle {
    /// Rebuild the lifecycle from a stored start timestamp.
    pub fn from_started_at(started_at: Option<u64>) -> Self {
        match started_at {
            Some(started_at) => Self::Scheduled { started_at },
            None => Self::Waiting,
        }
    }

    /// Start timestamp, when one was written.
    pub fn started_at(&self) -> Option<u64> {
        match self {
            Self::Waiting => None,
            Self::Scheduled { started_at } => Some(*started_at),
        }
    }

    /// Compute the lifecycle reached by applying `event`.
    pub fn apply(self, event: LifecycleEvent) -> Result<Self, InvalidTransition> {
        match (self, event) {
            (Self::Waiting, LifecycleEvent::Start { at }) => Ok(Self::Scheduled { started_at: at }),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }

    /// Derive the observed phase at `now_ms`.
    pub fn observe(&self, now_ms: u64) -> ObservedPhase {
        phase_at(self.started_at(), now_ms)
    }
}

/// A race is live once the observer's clock reaches the start timestamp.
pub fn is_active(started_at: u64, now_ms: u64) -> bool {
    now_ms >= started_at
}

/// Derive the observed phase from a start timestamp and the observer's clock.
pub fn phase_at(started_at: Option<u64>, now_ms: u64) -> ObservedPhase {
    match started_at {
        None => ObservedPhase::Waiting,
        Some(started_at) if is_active(started_at, now_ms) => ObservedPhase::Active,
        Some(started_at) => ObservedPhase::Countdown {
            remaining_ms: started_at - now_ms,
        },
    }
}

/// Whole seconds displayed for a countdown, rounded up.
pub fn countdown_seconds(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_race_is_always_waiting() {
        for now in [0, 1, 5_000, u64::MAX] {
            assert_eq!(phase_at(None, now), ObservedPhase::Waiting);
        }
    }

    #[test]
    fn countdown_rounds_remaining_time_up() {
        let start = 10_000;
        assert_eq!(
            phase_at(Some(start), 5_000),
            ObservedPhase::Countdown { remaining_ms: 5_000 }
        );
        assert_eq!(countdown_seconds(5_000), 5);
        assert_eq!(countdown_seconds(4_001), 5);
        assert_eq!(countdown_seconds(4_000), 4);
        assert_eq!(countdown_seconds(1), 1);
    }

    #[test]
    fn countdown_seconds_never_increase_as_time_passes() {
        let start = 20_000;
        let mut previous = u64::MAX;
        for now in (15_000..20_000).step_by(250) {
            let ObservedPhase::Countdown { remaining_ms } = phase_at(Some(start), now) else {
                panic!("expected countdown at {now}");
            };
            let seconds = countdown_seconds(remaining_ms);
            assert!(seconds <= previous);
            previous = seconds;
        }
        assert_eq!(previous, 1);
    }

    #[test]
    fn race_is_active_from_start_onwards() {
        let start = 10_000;
        assert_eq!(phase_at(Some(start), start), ObservedPhase::Active);
        assert_eq!(phase_at(Some(start), start + 1), ObservedPhase::Active);
        // Observed an hour late: still straight to typing.
        assert_eq!(phase_at(Some(start), start + 3_600_000), ObservedPhase::Active);
    }

    #[test]
    fn start_is_write_once() {
        let scheduled = RaceLifecycle::Waiting
            .apply(LifecycleEvent::Start { at: 42 })
            .unwrap();
        assert_eq!(scheduled, RaceLifecycle::Scheduled { started_at: 42 });
        assert_eq!(scheduled.started_at(), Some(42));

        let err = scheduled
            .apply(LifecycleEvent::Start { at: 99 })
            .unwrap_err();
        assert_eq!(err.from, scheduled);
        assert_eq!(err.event, LifecycleEvent::Start { at: 99 });
    }

    #[test]
    fn lifecycle_round_trips_through_stored_timestamp() {
        assert_eq!(RaceLifecycle::from_started_at(None), RaceLifecycle::Waiting);
        assert_eq!(
            RaceLifecycle::from_started_at(Some(7)).observe(6),
            ObservedPhase::Countdown { remaining_ms: 1 }
        );
    }
}
