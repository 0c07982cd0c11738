//! Merge decision logic
//!
//! Determines whether and how one account's watch state overwrites
//! another's. This layer is pure: it never touches the store, so every
//! rule can be tested against plain state values.

use chrono::{DateTime, Utc};
use tracing::debug;

use watchlink_core::domain::PlaybackState;

/// Why a merge left the target untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Position and played flag already agree on both sides
    AlreadyInSync,
    /// The source has never played the item, so there is nothing to copy
    SourceNeverPlayed,
    /// The source's state is not newer than the target's
    SourceNotNewer,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyInSync => write!(f, "already in sync"),
            SkipReason::SourceNeverPlayed => write!(f, "source never played"),
            SkipReason::SourceNotNewer => write!(f, "source not newer"),
        }
    }
}

/// Result of a merge decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing to write; the target keeps its record as-is
    Unchanged(SkipReason),
    /// The target's record should be replaced with this state
    Write(PlaybackState),
}

/// Decides how watch state flows across a sync link
///
/// Last-write-wins across the link: the source's record replaces the
/// target's whole record when it is both different and newer.
pub struct MergePolicy;

impl MergePolicy {
    /// Decides whether `source`'s state should overwrite `target`'s
    ///
    /// The merge is skipped when any of these hold:
    /// 1. Both sides agree on position and played flag (nothing to do)
    /// 2. The source has no last-played timestamp (it never played the
    ///    item; a bare record must not clobber real history)
    /// 3. Both timestamps are present and the source's is not strictly
    ///    newer (the target already has fresher or equal state)
    ///
    /// A target with no timestamp never wins: rule 3 only applies when
    /// both sides carry one, so a timestamped source always overwrites a
    /// timestampless target that differs.
    ///
    /// The write replaces the whole record. A played source resets the
    /// target's resume position to zero; the play count increments only
    /// when the target flips from unplayed to played, so re-propagating
    /// the same watched state cannot inflate it.
    pub fn merge_decision(target: &PlaybackState, source: &PlaybackState) -> MergeOutcome {
        let positions_match = target.position_ticks == source.position_ticks;
        let played_match = target.played == source.played;

        if positions_match && played_match {
            return MergeOutcome::Unchanged(SkipReason::AlreadyInSync);
        }

        let Some(source_played_at) = source.last_played else {
            return MergeOutcome::Unchanged(SkipReason::SourceNeverPlayed);
        };

        if let Some(target_played_at) = target.last_played {
            if source_played_at <= target_played_at {
                return MergeOutcome::Unchanged(SkipReason::SourceNotNewer);
            }
        }

        debug!(
            source_position = source.position_ticks,
            source_played = source.played,
            target_position = target.position_ticks,
            target_played = target.played,
            "Overwriting target watch state from source"
        );

        let newly_played = !target.played && source.played;

        MergeOutcome::Write(PlaybackState {
            position_ticks: if source.played {
                0
            } else {
                source.position_ticks
            },
            played: source.played,
            play_count: if newly_played {
                target.play_count + 1
            } else {
                target.play_count
            },
            last_played: source.last_played,
            audio_stream_index: source.audio_stream_index,
            subtitle_stream_index: source.subtitle_stream_index,
        })
    }

    /// Computes the target's new record from a live play event
    ///
    /// Played-to-completion resets the position to zero and marks the
    /// item played; otherwise the reported position is kept (zero when
    /// the host reported none) and the played flag clears. The play
    /// count increments only on an unplayed-to-played transition. The
    /// last-played timestamp is always stamped with `now`, which the
    /// caller supplies so tests can pin the clock.
    pub fn apply_play_event(
        state: &PlaybackState,
        position_ticks: Option<i64>,
        played_to_completion: bool,
        now: DateTime<Utc>,
    ) -> PlaybackState {
        let was_unplayed = !state.played;

        PlaybackState {
            position_ticks: if played_to_completion {
                0
            } else {
                position_ticks.unwrap_or(0)
            },
            played: played_to_completion,
            play_count: if was_unplayed && played_to_completion {
                state.play_count + 1
            } else {
                state.play_count
            },
            last_played: Some(now),
            audio_stream_index: state.audio_stream_index,
            subtitle_stream_index: state.subtitle_stream_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn played_state(play_count: u32, last_played: Option<DateTime<Utc>>) -> PlaybackState {
        PlaybackState {
            position_ticks: 0,
            played: true,
            play_count,
            last_played,
            audio_stream_index: None,
            subtitle_stream_index: None,
        }
    }

    fn in_progress_state(position_ticks: i64, last_played: Option<DateTime<Utc>>) -> PlaybackState {
        PlaybackState {
            position_ticks,
            played: false,
            play_count: 0,
            last_played,
            audio_stream_index: None,
            subtitle_stream_index: None,
        }
    }

    mod merge_decision_tests {
        use super::*;

        #[test]
        fn test_skips_when_position_and_played_agree() {
            // Timestamps differ, but there is nothing to change.
            let target = in_progress_state(5_000, Some(at_hour(1)));
            let source = in_progress_state(5_000, Some(at_hour(9)));

            let outcome = MergePolicy::merge_decision(&target, &source);
            assert_eq!(outcome, MergeOutcome::Unchanged(SkipReason::AlreadyInSync));
        }

        #[test]
        fn test_skips_when_source_never_played() {
            let target = in_progress_state(5_000, Some(at_hour(1)));
            let source = in_progress_state(9_000, None);

            let outcome = MergePolicy::merge_decision(&target, &source);
            assert_eq!(
                outcome,
                MergeOutcome::Unchanged(SkipReason::SourceNeverPlayed)
            );
        }

        #[test]
        fn test_skips_when_source_is_older() {
            let target = in_progress_state(5_000, Some(at_hour(9)));
            let source = in_progress_state(9_000, Some(at_hour(1)));

            let outcome = MergePolicy::merge_decision(&target, &source);
            assert_eq!(outcome, MergeOutcome::Unchanged(SkipReason::SourceNotNewer));
        }

        #[test]
        fn test_skips_when_timestamps_are_equal() {
            let target = in_progress_state(5_000, Some(at_hour(3)));
            let source = in_progress_state(9_000, Some(at_hour(3)));

            let outcome = MergePolicy::merge_decision(&target, &source);
            assert_eq!(outcome, MergeOutcome::Unchanged(SkipReason::SourceNotNewer));
        }

        #[test]
        fn test_writes_when_source_is_newer() {
            let target = in_progress_state(5_000, Some(at_hour(1)));
            let source = in_progress_state(9_000, Some(at_hour(9)));

            let outcome = MergePolicy::merge_decision(&target, &source);
            let MergeOutcome::Write(next) = outcome else {
                panic!("expected a write");
            };
            assert_eq!(next.position_ticks, 9_000);
            assert!(!next.played);
            assert_eq!(next.last_played, Some(at_hour(9)));
        }

        #[test]
        fn test_writes_when_target_has_no_timestamp() {
            // A target that never played loses to any timestamped source.
            let target = in_progress_state(0, None);
            let source = in_progress_state(9_000, Some(at_hour(1)));

            let outcome = MergePolicy::merge_decision(&target, &source);
            assert!(matches!(outcome, MergeOutcome::Write(_)));
        }

        #[test]
        fn test_played_source_resets_position() {
            let target = in_progress_state(5_000, Some(at_hour(1)));
            let mut source = played_state(1, Some(at_hour(9)));
            source.position_ticks = 7_777;

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            assert_eq!(next.position_ticks, 0);
            assert!(next.played);
        }

        #[test]
        fn test_play_count_increments_on_unplayed_to_played() {
            let target = in_progress_state(5_000, Some(at_hour(1)));
            let source = played_state(4, Some(at_hour(9)));

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            // The target's own count advances by one; the source's count
            // is its own history and is not copied.
            assert_eq!(next.play_count, 1);
        }

        #[test]
        fn test_play_count_unchanged_when_target_already_played() {
            let mut target = played_state(3, Some(at_hour(1)));
            target.position_ticks = 2_000;
            let source = played_state(9, Some(at_hour(9)));

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            assert_eq!(next.play_count, 3);
        }

        #[test]
        fn test_play_count_unchanged_when_unwatching() {
            // Source newer and unplayed: the unwatch propagates but the
            // target's count keeps its history.
            let target = played_state(3, Some(at_hour(1)));
            let source = in_progress_state(4_000, Some(at_hour(9)));

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            assert!(!next.played);
            assert_eq!(next.play_count, 3);
            assert_eq!(next.position_ticks, 4_000);
        }

        #[test]
        fn test_stream_indexes_copied_whole() {
            let mut target = in_progress_state(5_000, Some(at_hour(1)));
            target.audio_stream_index = Some(2);
            target.subtitle_stream_index = Some(4);
            let mut source = in_progress_state(9_000, Some(at_hour(9)));
            source.audio_stream_index = Some(1);
            source.subtitle_stream_index = None;

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            // The source's selections replace the target's, including an
            // absent selection clearing a present one.
            assert_eq!(next.audio_stream_index, Some(1));
            assert_eq!(next.subtitle_stream_index, None);
        }

        #[test]
        fn test_merge_is_idempotent() {
            let target = in_progress_state(5_000, Some(at_hour(1)));
            let source = played_state(2, Some(at_hour(9)));

            let MergeOutcome::Write(merged) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };

            // Re-running against the merged record changes nothing.
            let outcome = MergePolicy::merge_decision(&merged, &source);
            assert!(matches!(outcome, MergeOutcome::Unchanged(_)));
        }

        #[test]
        fn test_scenario_watcher_finishes_episode() {
            // Account A finished an episode; B was halfway through it.
            let target = in_progress_state(18_000_000_000, Some(at_hour(1)));
            let source = played_state(1, Some(at_hour(2)));

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            assert!(next.played);
            assert_eq!(next.position_ticks, 0);
            assert_eq!(next.play_count, 1);
            assert_eq!(next.last_played, Some(at_hour(2)));
        }

        #[test]
        fn test_scenario_resume_point_moves_forward() {
            // Account A watched further into a movie than B.
            let target = in_progress_state(6_000_000_000, Some(at_hour(1)));
            let source = in_progress_state(21_000_000_000, Some(at_hour(2)));

            let MergeOutcome::Write(next) = MergePolicy::merge_decision(&target, &source) else {
                panic!("expected a write");
            };
            assert!(!next.played);
            assert_eq!(next.position_ticks, 21_000_000_000);
        }
    }

    mod apply_play_event_tests {
        use super::*;

        #[test]
        fn test_completion_marks_played_and_resets_position() {
            let state = in_progress_state(5_000, Some(at_hour(1)));

            let next = MergePolicy::apply_play_event(&state, Some(7_000), true, at_hour(9));
            assert_eq!(next.position_ticks, 0);
            assert!(next.played);
            assert_eq!(next.play_count, 1);
            assert_eq!(next.last_played, Some(at_hour(9)));
        }

        #[test]
        fn test_partial_watch_keeps_reported_position() {
            let state = in_progress_state(5_000, Some(at_hour(1)));

            let next = MergePolicy::apply_play_event(&state, Some(7_000), false, at_hour(9));
            assert_eq!(next.position_ticks, 7_000);
            assert!(!next.played);
            assert_eq!(next.play_count, 0);
            assert_eq!(next.last_played, Some(at_hour(9)));
        }

        #[test]
        fn test_missing_position_defaults_to_zero() {
            let state = in_progress_state(5_000, Some(at_hour(1)));

            let next = MergePolicy::apply_play_event(&state, None, false, at_hour(9));
            assert_eq!(next.position_ticks, 0);
            assert!(!next.played);
        }

        #[test]
        fn test_rewatch_completion_does_not_inflate_count() {
            let state = played_state(2, Some(at_hour(1)));

            let next = MergePolicy::apply_play_event(&state, None, true, at_hour(9));
            assert!(next.played);
            assert_eq!(next.play_count, 2);
        }

        #[test]
        fn test_partial_watch_clears_played_flag() {
            // Re-opening a finished item part-way marks it unwatched again.
            let state = played_state(2, Some(at_hour(1)));

            let next = MergePolicy::apply_play_event(&state, Some(3_000), false, at_hour(9));
            assert!(!next.played);
            assert_eq!(next.play_count, 2);
            assert_eq!(next.position_ticks, 3_000);
        }

        #[test]
        fn test_stream_indexes_preserved() {
            let mut state = in_progress_state(5_000, Some(at_hour(1)));
            state.audio_stream_index = Some(1);
            state.subtitle_stream_index = Some(3);

            let next = MergePolicy::apply_play_event(&state, Some(7_000), false, at_hour(9));
            assert_eq!(next.audio_stream_index, Some(1));
            assert_eq!(next.subtitle_stream_index, Some(3));
        }
    }
}
