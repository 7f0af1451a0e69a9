//! Client-side scoring.
//!
//! Scoring is authoritative for solo rounds and mirrored for multiplayer
//! display until the server reconciles it on the results screen.
//!
//! Points are normalized so each difficulty contributes a comparable maximum
//! regardless of how many questions of that difficulty appear in a round:
//! the base value is `round(84 / count_at_difficulty)`, and a time bonus of
//! up to the same base value rewards fast answers. A perfect instant answer
//! is therefore worth exactly twice the base value.

use crate::protocol::{Difficulty, Question};

/// Normalization cap: the combined base points of all questions at one
/// difficulty stay near this value.
const DIFFICULTY_POINT_POOL: f64 = 84.0;

/// Base points for one question, given how many questions of its difficulty
/// appear in the round. Zero when the round contains none (degenerate input).
pub fn points_per_question(count_at_difficulty: usize) -> u32 {
    if count_at_difficulty == 0 {
        return 0;
    }
    (DIFFICULTY_POINT_POOL / count_at_difficulty as f64).round() as u32
}

/// Time bonus: the fraction of the time limit still remaining, applied to the
/// base points and floored.
pub fn time_bonus(time_left: f64, difficulty: Difficulty, base_points: u32) -> u32 {
    let max_time = difficulty.time_limit_secs();
    if max_time <= 0.0 || time_left <= 0.0 {
        return 0;
    }
    let fraction = (time_left / max_time).min(1.0);
    (fraction * f64::from(base_points)).floor() as u32
}

/// Number of questions in `questions` that share `difficulty`.
pub fn count_at_difficulty(questions: &[Question], difficulty: Difficulty) -> usize {
    questions
        .iter()
        .filter(|q| q.difficulty == difficulty)
        .count()
}

/// Points awarded for one answer: base plus time bonus if correct, zero
/// otherwise.
pub fn score_answer(
    correct: bool,
    time_left: f64,
    difficulty: Difficulty,
    count_at_difficulty: usize,
) -> u32 {
    if !correct {
        return 0;
    }
    let base = points_per_question(count_at_difficulty);
    base + time_bonus(time_left, difficulty, base)
}
