//! Schedule normalization.
//!
//! The generation service is not reliable at arithmetic: decomposed
//! schedules routinely overshoot, undershoot, or use durations off the
//! five-minute grid. This module reconciles a loosely-specified list of
//! subtasks against an exact target duration by expanding it into a
//! minute-indexed timeline, trimming or padding that timeline, and
//! compressing it back into a compact, gap-free schedule.
//!
//! Everything here is pure and deterministic; there is no I/O and no
//! dependency on the generation service.

use serde::{Deserialize, Serialize};

/// Grid that subtask durations are rounded down to.
pub const DURATION_GRANULARITY_MINUTES: i64 = 5;

/// Default number of trailing minute-slots rewritten on overflow.
pub const DEFAULT_TRAILING_MERGE_WIDTH: usize = 5;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// A single (description, duration) record in a decomposed schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// What the person is doing.
    pub description: String,
    /// Duration in minutes.
    pub duration_minutes: i64,
}

impl Subtask {
    pub fn new(description: impl Into<String>, duration_minutes: i64) -> Self {
        Self {
            description: description.into(),
            duration_minutes,
        }
    }
}

/// Tuning knobs for [`normalize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// Number of trailing minute-slots overwritten with the pre-truncation
    /// final task when the expanded timeline overshoots the target. Clamped
    /// to the target length. This is a smoothing heuristic that keeps the
    /// schedule from ending on a sliver of an unrelated task cut mid-way.
    pub trailing_merge_width: usize,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            trailing_merge_width: DEFAULT_TRAILING_MERGE_WIDTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Reconcile `subtasks` against an exact total of `target_total_minutes`.
///
/// The algorithm:
///
/// 1. Round every duration down to the nearest multiple of five minutes;
///    records rounding to zero are dropped.
/// 2. Expand each surviving record into one slot per minute, tagged with the
///    record's description and original sequence index, in input order.
/// 3. On overflow, truncate to the target and overwrite the trailing slots
///    (up to `options.trailing_merge_width`) with the description that
///    occupied the final kept slot.
/// 4. On underflow, pad with the last slot's description; if every record
///    rounded to zero, synthesize the whole timeline from
///    `fallback_description`.
/// 5. Compress consecutive slots with identical descriptions back into
///    (description, duration) records.
///
/// The output durations always sum to exactly `target_total_minutes`, no two
/// consecutive records share a description, and every duration is at least
/// one minute.
pub fn normalize(
    subtasks: &[Subtask],
    target_total_minutes: i64,
    fallback_description: &str,
    options: &ScheduleOptions,
) -> Vec<Subtask> {
    let target = target_total_minutes.max(0) as usize;
    if target == 0 {
        return Vec::new();
    }

    // Round down to the grid and expand into minute slots.
    let mut slots: Vec<(&str, usize)> = Vec::new();
    for (index, subtask) in subtasks.iter().enumerate() {
        let rounded =
            subtask.duration_minutes - subtask.duration_minutes % DURATION_GRANULARITY_MINUTES;
        if rounded <= 0 {
            continue;
        }
        for _ in 0..rounded {
            slots.push((subtask.description.as_str(), index));
        }
    }

    if slots.is_empty() {
        // Every record rounded to zero: fall back to the un-decomposed task.
        return vec![Subtask::new(fallback_description, target as i64)];
    }

    if slots.len() > target {
        let last = slots[target - 1];
        slots.truncate(target);
        let width = options.trailing_merge_width.min(target);
        for slot in slots[target - width..].iter_mut() {
            *slot = last;
        }
    } else if slots.len() < target {
        let last = *slots.last().expect("timeline is non-empty");
        slots.resize(target, last);
    }

    compress(&slots)
}

/// Merge consecutive slots with identical descriptions, in order.
fn compress(slots: &[(&str, usize)]) -> Vec<Subtask> {
    let mut result: Vec<Subtask> = Vec::new();
    for (description, _origin) in slots {
        match result.last_mut() {
            Some(prev) if prev.description == *description => prev.duration_minutes += 1,
            _ => result.push(Subtask::new(*description, 1)),
        }
    }
    result
}

/// Sum of all durations in a schedule, in minutes.
pub fn total_minutes(subtasks: &[Subtask]) -> i64 {
    subtasks.iter().map(|s| s.duration_minutes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(pairs: &[(&str, i64)]) -> Vec<Subtask> {
        pairs.iter().map(|(d, m)| Subtask::new(*d, *m)).collect()
    }

    #[test]
    fn test_underflow_pads_with_last_task() {
        let input = tasks(&[("wake up", 7), ("shower", 8)]);
        let output = normalize(&input, 15, "morning routine", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("wake up", 5), ("shower", 10)]));
    }

    #[test]
    fn test_overflow_truncates_to_target() {
        let input = tasks(&[("paint", 200)]);
        let output = normalize(&input, 60, "paint", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("paint", 60)]));
    }

    #[test]
    fn test_empty_input_falls_back_to_original_task() {
        let output = normalize(&[], 30, "relax", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("relax", 30)]));
    }

    #[test]
    fn test_all_records_rounding_to_zero_fall_back() {
        let input = tasks(&[("stretch", 3), ("yawn", 4)]);
        let output = normalize(&input, 30, "relax", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("relax", 30)]));
    }

    #[test]
    fn test_exact_match_is_unchanged() {
        let input = tasks(&[("read", 20), ("write", 15), ("rest", 25)]);
        let output = normalize(&input, 60, "work", &ScheduleOptions::default());
        assert_eq!(output, input);
    }

    #[test]
    fn test_exact_match_merges_adjacent_duplicates() {
        let input = tasks(&[("read", 10), ("read", 10), ("rest", 10)]);
        let output = normalize(&input, 30, "work", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("read", 20), ("rest", 10)]));
    }

    #[test]
    fn test_overflow_rewrites_trailing_slots() {
        // 30 minutes of cooking + 30 of eating against a 35-minute target:
        // the final five slots all become "eating" rather than a sliver.
        let input = tasks(&[("cooking", 30), ("eating", 30)]);
        let output = normalize(&input, 35, "dinner", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("cooking", 30), ("eating", 5)]));
    }

    #[test]
    fn test_overflow_trailing_rewrite_crosses_task_boundary() {
        // The cut lands 2 minutes into "eating"; the trailing rewrite widens
        // the final task backwards over the boundary.
        let input = tasks(&[("cooking", 30), ("eating", 30)]);
        let mut opts = ScheduleOptions::default();
        opts.trailing_merge_width = 5;
        let output = normalize(&input, 32, "dinner", &opts);
        assert_eq!(output, tasks(&[("cooking", 27), ("eating", 5)]));
        assert_eq!(total_minutes(&output), 32);
    }

    #[test]
    fn test_trailing_merge_width_is_configurable() {
        let input = tasks(&[("cooking", 30), ("eating", 30)]);
        let opts = ScheduleOptions {
            trailing_merge_width: 10,
        };
        let output = normalize(&input, 32, "dinner", &opts);
        assert_eq!(output, tasks(&[("cooking", 22), ("eating", 10)]));
    }

    #[test]
    fn test_target_smaller_than_merge_width() {
        let input = tasks(&[("wake up", 10), ("shower", 10)]);
        let output = normalize(&input, 3, "morning", &ScheduleOptions::default());
        assert_eq!(output, tasks(&[("wake up", 3)]));
    }

    #[test]
    fn test_zero_target_yields_empty_schedule() {
        let input = tasks(&[("read", 20)]);
        let output = normalize(&input, 0, "read", &ScheduleOptions::default());
        assert!(output.is_empty());
    }

    #[test]
    fn test_negative_target_treated_as_zero() {
        let input = tasks(&[("read", 20)]);
        let output = normalize(&input, -10, "read", &ScheduleOptions::default());
        assert!(output.is_empty());
    }

    #[test]
    fn test_durations_always_sum_to_target() {
        let cases: Vec<(Vec<Subtask>, i64)> = vec![
            (tasks(&[("a", 7), ("b", 8), ("c", 13)]), 45),
            (tasks(&[("a", 120)]), 15),
            (tasks(&[("a", 4)]), 25),
            (tasks(&[("a", 55), ("b", 5)]), 60),
            (tasks(&[("a", 5), ("b", 5), ("a", 5)]), 90),
        ];
        for (input, target) in cases {
            let output = normalize(&input, target, "fallback", &ScheduleOptions::default());
            assert_eq!(
                total_minutes(&output),
                target,
                "input {:?} target {}",
                input,
                target
            );
        }
    }

    #[test]
    fn test_no_consecutive_duplicate_descriptions() {
        let input = tasks(&[("a", 7), ("b", 8), ("b", 12), ("c", 4)]);
        let output = normalize(&input, 40, "fallback", &ScheduleOptions::default());
        for pair in output.windows(2) {
            assert_ne!(pair[0].description, pair[1].description);
        }
        assert!(output.iter().all(|s| s.duration_minutes >= 1));
    }

    #[test]
    fn test_input_order_is_preserved() {
        let input = tasks(&[("first", 10), ("second", 10), ("third", 10)]);
        let output = normalize(&input, 30, "fallback", &ScheduleOptions::default());
        let names: Vec<&str> = output.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
