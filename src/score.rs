//! Scoring and XP formulas.
//!
//! The same formulas apply to live sessions and to single-player attempt
//! checks, so they live here rather than inside the session state machine.

/// Maximum score for a single answer.
pub const MAX_SCORE: u32 = 1000;

/// Answers faster than this earn the full score.
pub const FULL_SCORE_WINDOW_SECS: f64 = 0.5;

/// Flat XP granted to a quiz owner each time another player finishes
/// a live game of their quiz.
pub const OWNER_XP_BONUS: u32 = 250;

/// Time-decayed score for one answer.
///
/// Response time is measured server-side from the question start. Under
/// half a second earns the full 1000; after that the score decays linearly
/// and reaches half at the nominal timer. Late answers keep decaying and
/// are clamped at zero rather than going negative.
pub fn answer_score(response_secs: f64, timer_secs: u32) -> u32 {
    if response_secs < FULL_SCORE_WINDOW_SECS {
        return MAX_SCORE;
    }
    let reduction = 1.0 - (response_secs / f64::from(timer_secs)) / 2.0;
    let score = (f64::from(MAX_SCORE) * reduction).round();
    if score <= 0.0 { 0 } else { score as u32 }
}

/// XP earned for one finished attempt.
///
/// `reduction` is the number of completions of the same quiz in the
/// trailing 30-day window; zero is treated as one so a first attempt is
/// never divided.
pub fn attempt_xp(score: u32, question_count: usize, correct_count: u32, reduction: u32) -> u32 {
    if question_count == 0 {
        return 0;
    }
    let avg = f64::from(score) / question_count as f64;
    let base = avg + 50.0 * f64::from(correct_count);
    let divisor = if reduction == 0 { 1 } else { reduction };
    (base / f64::from(divisor)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_answer_scores_full() {
        assert_eq!(answer_score(0.4, 20), 1000);
        assert_eq!(answer_score(0.0, 20), 1000);
    }

    #[test]
    fn halfway_answer_scores_750() {
        assert_eq!(answer_score(10.0, 20), 750);
    }

    #[test]
    fn answer_at_timer_scores_half() {
        assert_eq!(answer_score(20.0, 20), 500);
    }

    #[test]
    fn very_late_answer_clamps_at_zero() {
        assert_eq!(answer_score(45.0, 20), 0);
        assert_eq!(answer_score(400.0, 20), 0);
    }

    #[test]
    fn xp_for_clean_run() {
        // 4 questions, full score, all correct, first attempt.
        assert_eq!(attempt_xp(4000, 4, 4, 0), 1200);
        assert_eq!(attempt_xp(4000, 4, 4, 1), 1200);
    }

    #[test]
    fn xp_diminishes_with_repetition() {
        assert_eq!(attempt_xp(4000, 4, 4, 2), 600);
        assert_eq!(attempt_xp(4000, 4, 4, 4), 300);
    }

    #[test]
    fn xp_monotonic_in_score_and_correct_count() {
        assert!(attempt_xp(3000, 4, 3, 1) < attempt_xp(4000, 4, 3, 1));
        assert!(attempt_xp(3000, 4, 2, 1) < attempt_xp(3000, 4, 3, 1));
    }

    #[test]
    fn xp_with_no_questions_is_zero() {
        assert_eq!(attempt_xp(0, 0, 0, 1), 0);
    }
}
