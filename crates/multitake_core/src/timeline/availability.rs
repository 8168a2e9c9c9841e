//! Availability of a take for a segment of the output timeline.
//!
//! Nothing is stored: the predicate is evaluated per query from the take's
//! offset, the reference duration and the queried segment.

use crate::models::{AlignedTake, Offset};

/// Whether a take with `offset` can serve a segment starting at reference
/// time `t` with duration `d`.
///
/// Both conditions must hold:
/// - `t + start_offset >= 0`
/// - `reference_duration - end_offset - t + d >= 0`
pub fn is_available(offset: &Offset, reference_duration: f64, t: f64, d: f64) -> bool {
    t + offset.start_secs >= 0.0 && reference_duration - offset.end_secs - t + d >= 0.0
}

/// Reference time queried for cut point `cut_point` when output begins at `start`.
pub fn query_time(cut_point: f64, start: f64) -> f64 {
    cut_point + start
}

/// Indices of the takes available for the segment `[cut_point, cut_point + d)`.
///
/// Preserves take order so selection stays deterministic.
pub fn candidates(
    takes: &[AlignedTake],
    reference_duration: f64,
    start: f64,
    cut_point: f64,
    d: f64,
) -> Vec<usize> {
    let t = query_time(cut_point, start);
    takes
        .iter()
        .enumerate()
        .filter(|(_, take)| is_available(&take.offset, reference_duration, t, d))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordingId, VideoInfo};

    fn take(id: &str, start: f64, end: f64) -> AlignedTake {
        AlignedTake::new(
            RecordingId::new(id),
            Offset::new(start, end),
            VideoInfo {
                duration_secs: 20.0,
                fps: 30.0,
                width: 1920,
                height: 1080,
            },
        )
    }

    #[test]
    fn scenario_membership_at_first_cut_point() {
        // Reference 20s, A (-2, 5), B (3, -1), start 0, step 5: first segment is d = 5
        let takes = vec![take("A", -2.0, 5.0), take("B", 3.0, -1.0)];

        // A: 0 + (-2) = -2 < 0 -> unavailable
        assert!(!is_available(&takes[0].offset, 20.0, 0.0, 5.0));
        // B: 0 + 3 >= 0 and 20 - (-1) - 0 + 5 = 26 >= 0 -> available
        assert!(is_available(&takes[1].offset, 20.0, 0.0, 5.0));

        assert_eq!(candidates(&takes, 20.0, 0.0, 0.0, 5.0), vec![1]);
    }

    #[test]
    fn scenario_membership_at_later_cut_points() {
        let takes = vec![take("A", -2.0, 5.0), take("B", 3.0, -1.0)];
        // t = 5: A 3 >= 0 and 20 - 5 - 5 + 5 = 15 >= 0
        assert_eq!(candidates(&takes, 20.0, 0.0, 5.0, 5.0), vec![0, 1]);
    }

    #[test]
    fn start_shifts_query_time() {
        let takes = vec![take("A", -2.0, 5.0)];
        assert!(candidates(&takes, 20.0, 0.0, 0.0, 5.0).is_empty());
        assert_eq!(candidates(&takes, 20.0, 2.0, 0.0, 5.0), vec![0]);
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let offset = Offset::new(-3.0, 0.0);
        assert!(is_available(&offset, 20.0, 3.0, 1.0));
        assert!(!is_available(&offset, 20.0, 2.999, 1.0));
    }

    #[test]
    fn upper_condition_can_exclude() {
        // 10 - 4 - t + 1 >= 0 fails once t > 7
        let offset = Offset::new(0.0, 4.0);
        assert!(is_available(&offset, 10.0, 7.0, 1.0));
        assert!(!is_available(&offset, 10.0, 7.5, 1.0));
    }
}
