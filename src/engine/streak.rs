use crate::model::{Ms, ONE_DAY, PuzzleSubmission};

/// Consecutive days, ending today or yesterday, on which the user completed
/// that day's puzzle.
///
/// `submissions` must be ordered by completion date, newest first. Only
/// puzzles completed on their own day count. If today is not yet completed,
/// a completion yesterday keeps the streak alive (one day of grace).
pub fn current_streak(submissions: &[PuzzleSubmission], today: Ms) -> u32 {
    let yesterday = today - ONE_DAY;
    let mut expected = today;
    let mut completed_today = false;
    let mut streak = 0;

    let completions = submissions
        .iter()
        .filter_map(|s| s.completion_date.filter(|c| *c == s.puzzle_date));

    for completed in completions {
        if completed == today {
            completed_today = true;
        } else if completed == yesterday && !completed_today {
            expected -= ONE_DAY;
        }

        if completed == expected {
            streak += 1;
            expected -= ONE_DAY;
        } else {
            break;
        }
    }
    streak
}
