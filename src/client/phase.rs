//! Phase of the race page.

use crate::{
    dto::race::RaceSnapshot,
    state::lifecycle::{ObservedPhase, countdown_seconds, phase_at},
};

/// Phase of the race page as rendered for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// No snapshot received yet.
    Initializing,
    /// Race not started: roster is shown.
    Waiting,
    /// Start is scheduled in the future.
    Countdown {
        /// Whole seconds left, rounded up.
        seconds: u64,
    },
    /// Typing is open.
    Active,
}

impl ViewPhase {
    /// Derive the phase from the latest snapshot at `now_ms`.
    pub fn derive(snapshot: Option<&RaceSnapshot>, now_ms: u64) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::Initializing;
        };
        match phase_at(snapshot.race.started_at, now_ms) {
            ObservedPhase::Waiting => Self::Waiting,
            ObservedPhase::Countdown { remaining_ms } => Self::Countdown {
                seconds: countdown_seconds(remaining_ms),
            },
            ObservedPhase::Active => Self::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::dto::race::RaceSummary;

    fn snapshot(started_at: Option<u64>) -> RaceSnapshot {
        RaceSnapshot {
            race: RaceSummary {
                id: Uuid::new_v4(),
                text: "text".into(),
                started_at,
                created_at: 0,
            },
            entrants: vec![],
            version: 1,
        }
    }

    #[test]
    fn no_snapshot_is_initializing() {
        assert_eq!(ViewPhase::derive(None, 0), ViewPhase::Initializing);
    }

    #[test]
    fn unstarted_race_waits_at_any_time() {
        let race = snapshot(None);
        for now in [0, 10_000, u64::MAX] {
            assert_eq!(ViewPhase::derive(Some(&race), now), ViewPhase::Waiting);
        }
    }

    #[test]
    fn countdown_seconds_decrease_until_start() {
        let race = snapshot(Some(10_000));
        let seconds: Vec<ViewPhase> = [5_000, 5_001, 8_999, 9_000, 9_999]
            .into_iter()
            .map(|now| ViewPhase::derive(Some(&race), now))
            .collect();
        assert_eq!(
            seconds,
            vec![
                ViewPhase::Countdown { seconds: 5 },
                ViewPhase::Countdown { seconds: 5 },
                ViewPhase::Countdown { seconds: 2 },
                ViewPhase::Countdown { seconds: 1 },
                ViewPhase::Countdown { seconds: 1 },
            ]
        );
        assert_eq!(ViewPhase::derive(Some(&race), 10_000), ViewPhase::Active);
    }

    #[test]
    fn late_join_goes_straight_to_active() {
        let race = snapshot(Some(10_000));
        assert_eq!(ViewPhase::derive(Some(&race), 600_000), ViewPhase::Active);
    }
}
