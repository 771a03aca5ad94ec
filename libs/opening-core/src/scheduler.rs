//! SM-2 spaced repetition scheduling for opening lines.
//!
//! Based on SuperMemo 2 with configurable parameters. Today's date and the
//! review timestamp are explicit inputs so callers (and tests) control the
//! clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{OpeningLine, SchedulerState};

/// SM-2 variant with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub maximum_ease: f64,
    /// Interval after a lapse (grade below 3).
    pub lapse_interval: u32,
    /// Interval after the first successful review.
    pub first_interval: u32,
    /// Interval after the second successful review.
    pub second_interval: u32,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            minimum_ease: 1.3,
            maximum_ease: 3.0,
            lapse_interval: 1,
            first_interval: 1,
            second_interval: 6,
        }
    }
}

impl Sm2 {
    /// State for a line that has never been reviewed; due immediately.
    pub fn initial_state(&self, today: NaiveDate) -> SchedulerState {
        SchedulerState {
            ease: self.initial_ease,
            ..SchedulerState::new(today)
        }
    }

    /// Apply a 0..=5 recall grade, producing the next state.
    ///
    /// Grades below 3 are lapses: the interval resets to one day, the
    /// success counter resets, and the lapse counter increments, keeping
    /// the ease penalty already applied. Successful reviews follow the
    /// classic three-stage curve: 1 day, 6 days, then
    /// `round(previous * ease)` floored at one day.
    pub fn apply_grade(
        &self,
        state: &SchedulerState,
        grade: i32,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SchedulerState> {
        if !(0..=5).contains(&grade) {
            return Err(CoreError::InvalidGrade(grade));
        }

        let miss = (5 - grade) as f64;
        let ease = (state.ease + (0.1 - miss * (0.08 + miss * 0.02)))
            .clamp(self.minimum_ease, self.maximum_ease);

        let (interval_days, reps, lapses) = if grade < 3 {
            (self.lapse_interval, 0, state.lapses + 1)
        } else {
            let reps = state.reps + 1;
            let interval = match reps {
                1 => self.first_interval,
                2 => self.second_interval,
                _ => ((state.interval_days as f64 * ease).round() as u32).max(1),
            };
            (interval, reps, state.lapses)
        };

        Ok(SchedulerState {
            ease,
            interval_days,
            reps,
            lapses,
            due_date: today + Duration::days(i64::from(interval_days)),
            last_grade: Some(grade),
            last_reviewed_at: Some(now),
        })
    }
}

/// An opening line joined with its scheduled due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueOpening {
    pub line: OpeningLine,
    pub due_date: NaiveDate,
}

/// Select review candidates: lines due on or before `as_of` first.
///
/// Ordered by (due date ascending, name ascending), capped at `limit`.
/// When nothing is due, falls back to the soonest-due lines in the same
/// order, so a caller always gets candidates as long as any state exists.
/// Callers must ensure scheduler state exists for the lines in scope.
pub fn pick_due(
    mut candidates: Vec<DueOpening>,
    as_of: NaiveDate,
    limit: usize,
) -> Vec<DueOpening> {
    candidates.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.line.name.cmp(&b.line.name))
    });

    let due: Vec<DueOpening> = candidates
        .iter()
        .filter(|c| c.due_date <= as_of)
        .take(limit)
        .cloned()
        .collect();
    if !due.is_empty() {
        return due;
    }

    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn line(id: i64, name: &str) -> OpeningLine {
        OpeningLine {
            id,
            name: name.to_string(),
            moves: "e4 e5".to_string(),
        }
    }

    #[test]
    fn three_perfect_reviews_follow_the_curve() {
        let sm2 = Sm2::default();
        let s0 = sm2.initial_state(today());

        let s1 = sm2.apply_grade(&s0, 5, today(), now()).unwrap();
        assert_eq!(s1.interval_days, 1);
        assert_eq!(s1.reps, 1);
        assert_eq!(s1.due_date, today() + Duration::days(1));

        let s2 = sm2.apply_grade(&s1, 5, today(), now()).unwrap();
        assert_eq!(s2.interval_days, 6);
        assert_eq!(s2.reps, 2);

        let s3 = sm2.apply_grade(&s2, 5, today(), now()).unwrap();
        assert_eq!(s3.interval_days, (6.0 * s3.ease).round() as u32);
        assert_eq!(s3.reps, 3);
        assert_eq!(s3.lapses, 0);
    }

    #[test]
    fn repeated_successes_keep_growing() {
        let sm2 = Sm2::default();
        for grade in 3..=5 {
            let mut state = sm2.initial_state(today());
            let mut prev_reps = 0;
            let mut prev_interval = 0;
            for round in 0..8 {
                state = sm2.apply_grade(&state, grade, today(), now()).unwrap();
                assert_eq!(state.reps, prev_reps + 1, "grade {grade} round {round}");
                if state.reps > 2 {
                    assert!(
                        state.interval_days >= prev_interval,
                        "grade {grade} round {round}"
                    );
                }
                prev_reps = state.reps;
                prev_interval = state.interval_days;
            }
            assert_eq!(state.lapses, 0);
        }
    }

    #[test]
    fn low_grades_are_lapses() {
        let sm2 = Sm2::default();
        let reviewed = SchedulerState {
            ease: 2.5,
            interval_days: 30,
            reps: 4,
            lapses: 0,
            ..SchedulerState::new(today())
        };

        for grade in 0..=2 {
            let next = sm2.apply_grade(&reviewed, grade, today(), now()).unwrap();
            assert_eq!(next.interval_days, 1, "grade {grade}");
            assert_eq!(next.reps, 0, "grade {grade}");
            assert_eq!(next.lapses, 1, "grade {grade}");
            assert!(next.ease < reviewed.ease, "grade {grade}");
        }
    }

    #[test]
    fn grade_five_raises_ease_and_grade_zero_sinks_it_most() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(today());

        let best = sm2.apply_grade(&state, 5, today(), now()).unwrap();
        assert!(best.ease > state.ease);

        let worst = sm2.apply_grade(&state, 0, today(), now()).unwrap();
        let bad = sm2.apply_grade(&state, 1, today(), now()).unwrap();
        assert!(worst.ease < bad.ease);
    }

    #[test]
    fn ease_stays_clamped() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(today());

        for _ in 0..10 {
            state = sm2.apply_grade(&state, 0, today(), now()).unwrap();
            assert!(state.ease >= sm2.minimum_ease);
        }
        for _ in 0..20 {
            state = sm2.apply_grade(&state, 5, today(), now()).unwrap();
            assert!(state.ease <= sm2.maximum_ease);
        }
    }

    #[test]
    fn out_of_range_grades_are_rejected() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(today());

        for grade in [-1, 6] {
            let err = sm2.apply_grade(&state, grade, today(), now()).unwrap_err();
            assert!(matches!(err, CoreError::InvalidGrade(g) if g == grade));
        }
        // No mutation: the input state is untouched by construction, and the
        // caller gets no new state to persist.
        assert_eq!(state.reps, 0);
        assert_eq!(state.due_date, today());
    }

    #[test]
    fn interval_never_drops_below_one_day_on_success() {
        let sm2 = Sm2::default();
        let state = SchedulerState {
            ease: 1.3,
            interval_days: 0,
            reps: 2,
            ..SchedulerState::new(today())
        };
        let next = sm2.apply_grade(&state, 3, today(), now()).unwrap();
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn pick_due_orders_by_date_then_name() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let candidates = vec![
            DueOpening { line: line(1, "Scotch Game: Classical"), due_date: d(1) },
            DueOpening { line: line(2, "Italian Game"), due_date: d(1) },
            DueOpening { line: line(3, "Ponziani"), due_date: d(2) },
        ];

        let picked = pick_due(candidates, d(2), 10);
        let names: Vec<&str> = picked.iter().map(|p| p.line.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Italian Game", "Scotch Game: Classical", "Ponziani"]
        );
    }

    #[test]
    fn pick_due_falls_back_to_soonest_upcoming() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let candidates = vec![
            DueOpening { line: line(1, "A"), due_date: d(20) },
            DueOpening { line: line(2, "B"), due_date: d(10) },
        ];

        let picked = pick_due(candidates, d(1), 1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].line.name, "B");
    }

    #[test]
    fn pick_due_respects_limit() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let candidates = vec![
            DueOpening { line: line(1, "A"), due_date: d(1) },
            DueOpening { line: line(2, "B"), due_date: d(1) },
            DueOpening { line: line(3, "C"), due_date: d(1) },
        ];
        assert_eq!(pick_due(candidates, d(5), 2).len(), 2);
    }
}
