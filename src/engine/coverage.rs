use crate::model::*;

// ── Interval coverage ────────────────────────────────────────────

/// Merge sorted overlapping/adjacent periods into disjoint periods.
pub fn merge_overlapping(sorted: &[TimePeriod]) -> Vec<TimePeriod> {
    let mut merged: Vec<TimePeriod> = Vec::new();
    for &period in sorted {
        if let Some(last) = merged.last_mut()
            && period.start_time <= last.end_time
        {
            last.end_time = last.end_time.max(period.end_time);
            continue;
        }
        merged.push(period);
    }
    merged
}

/// True if `candidate` lies entirely inside the union of the windows' time-of-day
/// ranges. Callers pass windows already filtered to the target date.
pub fn is_covered(candidate: &TimePeriod, windows: &[AvailabilityWindow]) -> bool {
    let mut periods: Vec<TimePeriod> = windows
        .iter()
        .map(|w| w.period())
        .filter(|p| p.end_time >= candidate.start_time && p.start_time <= candidate.end_time)
        .collect();
    if periods.is_empty() {
        return false;
    }
    periods.sort_by_key(|p| p.start_time);
    merge_overlapping(&periods)
        .iter()
        .any(|p| p.contains(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn window(start: Ms, end: Ms) -> AvailabilityWindow {
        AvailabilityWindow {
            id: Ulid::new(),
            resource_id: Ulid::nil(),
            start_date: 0,
            end_date: None,
            start_time: start,
            end_time: end,
        }
    }

    /// Case-split recursion over closed ranges; the behavior `is_covered` must match.
    fn covered_recursive(start: Ms, end: Ms, windows: &[AvailabilityWindow]) -> bool {
        for w in windows {
            if w.start_time <= start && end <= w.end_time {
                return true;
            } else if w.start_time <= start && start <= w.end_time {
                return covered_recursive(w.end_time + 1, end, windows);
            } else if w.start_time <= end && end <= w.end_time {
                return covered_recursive(start, w.start_time - 1, windows);
            } else if start < w.start_time && w.end_time < end {
                return covered_recursive(start, w.start_time - 1, windows)
                    && covered_recursive(w.end_time + 1, end, windows);
            }
        }
        false
    }

    #[test]
    fn merge_overlapping_basic() {
        let periods = vec![
            TimePeriod::new(100, 300),
            TimePeriod::new(200, 400),
            TimePeriod::new(500, 600),
        ];
        let merged = merge_overlapping(&periods);
        assert_eq!(merged, vec![TimePeriod::new(100, 400), TimePeriod::new(500, 600)]);
    }

    #[test]
    fn merge_overlapping_adjacent() {
        let periods = vec![TimePeriod::new(100, 200), TimePeriod::new(200, 300)];
        assert_eq!(merge_overlapping(&periods), vec![TimePeriod::new(100, 300)]);
    }

    #[test]
    fn contained_in_single_window() {
        let windows = [window(0, 8 * HOUR)];
        assert!(is_covered(&TimePeriod::new(HOUR, 2 * HOUR), &windows));
        assert!(is_covered(&TimePeriod::new(0, 8 * HOUR), &windows));
        assert!(!is_covered(&TimePeriod::new(8 * HOUR, 9 * HOUR), &windows));
        assert!(!is_covered(&TimePeriod::new(7 * HOUR, 9 * HOUR), &windows));
    }

    #[test]
    fn touching_windows_cover_the_seam() {
        let windows = [window(0, HOUR), window(HOUR, 2 * HOUR)];
        assert!(is_covered(&TimePeriod::new(30 * MINUTE, 90 * MINUTE), &windows));
    }

    #[test]
    fn gap_between_windows_is_not_covered() {
        let windows = [window(0, HOUR), window(HOUR + TIME_BLOCK, 2 * HOUR)];
        assert!(!is_covered(&TimePeriod::new(0, 2 * HOUR), &windows));
        assert!(is_covered(&TimePeriod::new(HOUR + TIME_BLOCK, 2 * HOUR), &windows));
    }

    #[test]
    fn interior_window_needs_both_sides() {
        let windows = [
            window(2 * HOUR, 3 * HOUR),
            window(0, 2 * HOUR),
            window(3 * HOUR, 5 * HOUR),
        ];
        assert!(is_covered(&TimePeriod::new(HOUR, 4 * HOUR), &windows));

        let missing_right = [window(2 * HOUR, 3 * HOUR), window(0, 2 * HOUR)];
        assert!(!is_covered(&TimePeriod::new(HOUR, 4 * HOUR), &missing_right));
    }

    #[test]
    fn no_windows_is_never_covered() {
        assert!(!is_covered(&TimePeriod::new(0, TIME_BLOCK), &[]));
    }

    #[test]
    fn deeply_nested_partial_overlaps() {
        // Staircase of windows each overlapping the next by one block.
        let windows: Vec<_> = (0..400)
            .map(|i| window(i * TIME_BLOCK, (i + 2) * TIME_BLOCK))
            .collect();
        assert!(is_covered(&TimePeriod::new(0, 401 * TIME_BLOCK), &windows));
        assert!(!is_covered(&TimePeriod::new(0, 402 * TIME_BLOCK), &windows));
    }

    #[test]
    fn matches_recursive_case_split_on_aligned_grid() {
        // Every window layout of up to two windows over a 6-block day, against
        // every candidate on the same grid.
        let blocks = 6;
        let mut spans = Vec::new();
        for s in 0..blocks {
            for e in (s + 1)..=blocks {
                spans.push((s * TIME_BLOCK, e * TIME_BLOCK));
            }
        }

        let mut layouts: Vec<Vec<AvailabilityWindow>> = vec![Vec::new()];
        for &(a0, a1) in &spans {
            layouts.push(vec![window(a0, a1)]);
            for &(b0, b1) in &spans {
                layouts.push(vec![window(a0, a1), window(b0, b1)]);
            }
        }

        for layout in &layouts {
            for &(s, e) in &spans {
                let expected = covered_recursive(s, e, layout);
                let actual = is_covered(&TimePeriod::new(s, e), layout);
                assert_eq!(
                    actual,
                    expected,
                    "candidate [{s}, {e}] over {:?}",
                    layout.iter().map(|w| (w.start_time, w.end_time)).collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn matches_recursive_with_three_windows() {
        let layouts = [
            [(0, 2), (3, 4), (2, 3)],
            [(1, 2), (0, 1), (4, 6)],
            [(2, 5), (0, 1), (1, 2)],
            [(0, 6), (1, 2), (3, 4)],
        ];
        for layout in layouts {
            let windows: Vec<_> = layout
                .iter()
                .map(|&(s, e)| window(s * TIME_BLOCK, e * TIME_BLOCK))
                .collect();
            for s in 0..6 {
                for e in (s + 1)..=6 {
                    let (s, e) = (s * TIME_BLOCK, e * TIME_BLOCK);
                    assert_eq!(
                        is_covered(&TimePeriod::new(s, e), &windows),
                        covered_recursive(s, e, &windows),
                        "candidate [{s}, {e}] over {layout:?}"
                    );
                }
            }
        }
    }
}
