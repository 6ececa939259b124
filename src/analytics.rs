// src/analytics.rs
//
// Analytics over persisted quiz submissions. Reduces history to the best
// attempt per student, then derives per-question statistics from the stored
// autograde detail; submissions are never re-graded here. A corrupt stored
// record contributes nothing but never aborts the computation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::quiz::{AnswerKey, Quiz};
use crate::models::submission::QuizSubmission;

/// Statistics for a single quiz question across all best submissions.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub prompt: String,
    pub correct_count: usize,
    pub total_count: usize,
    pub correct_pct: f64,
    /// Per-option selection tally, in the quiz's option order.
    /// Empty for non-choice kinds.
    pub option_distribution: Vec<OptionCount>,
    pub correct_answer: Option<AnswerKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionCount {
    pub option: String,
    pub count: usize,
}

/// Analytics for one quiz, recomputed on demand and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct QuizAnalytics {
    pub quiz_id: String,
    pub title: String,
    pub total_students: usize,
    pub completed_students: usize,
    /// Point-weighted average over best submissions:
    /// sum(score) / sum(max_score), not a mean of per-student percentages.
    pub avg_score: f64,
    pub question_stats: Vec<QuestionStats>,
}

impl QuizAnalytics {
    pub fn completion_rate(&self) -> f64 {
        if self.total_students == 0 {
            return 0.0;
        }
        self.completed_students as f64 / self.total_students as f64 * 100.0
    }
}

/// Reduces submissions to the best attempt per student.
///
/// Keeps the strictly highest score; on ties the first-encountered
/// submission in input order wins. The result is keyed by student id, so
/// downstream iteration is deterministic.
pub fn best_submissions(submissions: &[QuizSubmission]) -> BTreeMap<String, &QuizSubmission> {
    let mut best: BTreeMap<String, &QuizSubmission> = BTreeMap::new();

    for sub in submissions {
        match best.get(&sub.student_id) {
            Some(current) if sub.score <= current.score => {}
            _ => {
                best.insert(sub.student_id.clone(), sub);
            }
        }
    }

    best
}

/// Computes per-question analytics for a quiz over its submission history.
///
/// `total_students` is the enrolled-student count supplied by the caller and
/// is used only as the completion-rate denominator.
pub fn compute_quiz_analytics(
    quiz: &Quiz,
    submissions: &[QuizSubmission],
    total_students: usize,
) -> QuizAnalytics {
    let best = best_submissions(submissions);
    let completed_students = best.len();

    let avg_score = if completed_students > 0 {
        let total_score: f64 = best.values().map(|s| s.score).sum();
        let total_max: f64 = best.values().map(|s| s.max_score).sum();
        if total_max > 0.0 {
            total_score / total_max * 100.0
        } else {
            0.0
        }
    } else {
        0.0
    };

    // Parse each best submission's stored JSON once, up front. Malformed
    // records degrade to empty objects rather than failing the batch.
    let parsed: Vec<(Value, Value)> = best
        .values()
        .map(|sub| {
            let autograde = parse_stored_json(&sub.autograde_json, "autograde_json", sub);
            let answers = parse_stored_json(&sub.answers_json, "answers_json", sub);
            (autograde, answers)
        })
        .collect();

    let mut question_stats = Vec::with_capacity(quiz.questions.len());

    for question in &quiz.questions {
        let mut correct_count = 0;
        let mut option_tallies: Vec<OptionCount> = if question.kind.is_choice() {
            question
                .choices
                .iter()
                .map(|opt| OptionCount {
                    option: opt.clone(),
                    count: 0,
                })
                .collect()
        } else {
            Vec::new()
        };

        for (autograde, answers) in &parsed {
            if autograde
                .get(&question.id)
                .and_then(|r| r.get("correct"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                correct_count += 1;
            }

            if question.kind.is_choice() {
                tally_selected_options(&mut option_tallies, answers.get(&question.id));
            }
        }

        let correct_pct = if completed_students > 0 {
            correct_count as f64 / completed_students as f64 * 100.0
        } else {
            0.0
        };

        question_stats.push(QuestionStats {
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            correct_count,
            total_count: completed_students,
            correct_pct,
            option_distribution: option_tallies,
            correct_answer: question.answer_key.clone(),
        });
    }

    QuizAnalytics {
        quiz_id: quiz.quiz_id.clone(),
        title: quiz.title.clone(),
        total_students,
        completed_students,
        avg_score,
        question_stats,
    }
}

fn parse_stored_json(raw: &str, field: &str, sub: &QuizSubmission) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(
            student_id = %sub.student_id,
            quiz_id = %sub.quiz_id,
            attempt = sub.attempt,
            field,
            error = %e,
            "skipping malformed stored submission record"
        );
        Value::Object(Default::default())
    })
}

/// Tallies one submission's stored answer into the option counts. Both
/// list-valued and scalar-valued stored answers occur in history; selections
/// that do not match a known option are ignored.
fn tally_selected_options(tallies: &mut [OptionCount], answer: Option<&Value>) {
    let Some(answer) = answer else {
        return;
    };

    match answer {
        Value::String(s) => {
            if let Some(tally) = tallies.iter_mut().find(|t| t.option == *s) {
                tally.count += 1;
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Some(selected) = item.as_str() {
                    if let Some(tally) = tallies.iter_mut().find(|t| t.option == selected) {
                        tally.count += 1;
                    }
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::grading::grade_quiz;
    use crate::models::quiz::{Answer, AnswerKey, Question, QuestionKind, Quiz};

    fn submission(student_id: &str, score: f64, max_score: f64) -> QuizSubmission {
        QuizSubmission {
            submitted_at: chrono::Utc::now(),
            quiz_id: "quiz1".into(),
            attempt: 1,
            student_id: student_id.into(),
            email: format!("{student_id}@example.edu"),
            answers_json: "{}".into(),
            score,
            max_score,
            autograde_json: "{}".into(),
            source: "web".into(),
        }
    }

    fn graded_submission(
        quiz: &Quiz,
        student_id: &str,
        answers: HashMap<String, Answer>,
    ) -> QuizSubmission {
        let result = grade_quiz(quiz, &answers);
        QuizSubmission {
            answers_json: serde_json::to_string(&answers).unwrap(),
            score: f64::from(result.score),
            max_score: f64::from(result.max_score),
            autograde_json: result.autograde_json().unwrap(),
            ..submission(student_id, 0.0, 0.0)
        }
    }

    fn sample_quiz() -> Quiz {
        Quiz::new(
            "quiz1",
            "Sample",
            vec![
                Question {
                    id: "q1".into(),
                    kind: QuestionKind::SingleChoice,
                    prompt: "pick 4".into(),
                    points: 5,
                    choices: vec!["3".into(), "4".into(), "5".into()],
                    answer_key: Some(AnswerKey::Single("4".into())),
                },
                Question {
                    id: "q2".into(),
                    kind: QuestionKind::SingleChoice,
                    prompt: "pick Both".into(),
                    points: 5,
                    choices: vec!["Both".into(), "Neither".into()],
                    answer_key: Some(AnswerKey::Single("Both".into())),
                },
            ],
        )
    }

    #[test]
    fn best_keeps_highest_score() {
        let subs = vec![
            submission("s1", 5.0, 10.0),
            submission("s1", 8.0, 10.0),
            submission("s1", 6.0, 10.0),
        ];

        let best = best_submissions(&subs);

        assert_eq!(best.len(), 1);
        assert_eq!(best["s1"].score, 8.0);
    }

    #[test]
    fn best_tie_keeps_first_encountered() {
        let mut first = submission("s1", 8.0, 10.0);
        first.attempt = 1;
        let mut second = submission("s1", 8.0, 10.0);
        second.attempt = 2;

        let subs = [first, second];
        let best = best_submissions(&subs);

        assert_eq!(best["s1"].attempt, 1);
    }

    #[test]
    fn best_is_per_student() {
        let subs = vec![
            submission("s1", 3.0, 10.0),
            submission("s2", 9.0, 10.0),
            submission("s1", 7.0, 10.0),
        ];

        let best = best_submissions(&subs);

        assert_eq!(best.len(), 2);
        assert_eq!(best["s1"].score, 7.0);
        assert_eq!(best["s2"].score, 9.0);
    }

    #[test]
    fn avg_score_is_point_weighted() {
        let quiz = sample_quiz();
        let subs = vec![submission("s1", 10.0, 10.0), submission("s2", 5.0, 10.0)];

        let analytics = compute_quiz_analytics(&quiz, &subs, 10);

        // Weighted by points: 15/20, not the per-student mean of 100% and 50%.
        assert_eq!(analytics.avg_score, 75.0);
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let quiz = sample_quiz();
        let analytics = compute_quiz_analytics(&quiz, &[], 10);

        assert_eq!(analytics.completed_students, 0);
        assert_eq!(analytics.avg_score, 0.0);
        assert_eq!(analytics.completion_rate(), 0.0);
        assert!(analytics.question_stats.iter().all(|s| s.correct_pct == 0.0));
    }

    #[test]
    fn completion_rate_handles_empty_roster() {
        let quiz = sample_quiz();
        let subs = vec![submission("s1", 5.0, 10.0)];

        let analytics = compute_quiz_analytics(&quiz, &subs, 0);

        assert_eq!(analytics.completed_students, 1);
        assert_eq!(analytics.completion_rate(), 0.0);
    }

    #[test]
    fn corrupt_stored_json_degrades_to_zero_contribution() {
        let quiz = sample_quiz();
        let mut corrupt = graded_submission(
            &quiz,
            "s3",
            HashMap::from([
                ("q1".to_string(), Answer::One("4".into())),
                ("q2".to_string(), Answer::One("Both".into())),
            ]),
        );
        corrupt.answers_json = "not json{".into();
        corrupt.autograde_json = "also not json".into();

        let subs = vec![
            graded_submission(
                &quiz,
                "s1",
                HashMap::from([
                    ("q1".to_string(), Answer::One("4".into())),
                    ("q2".to_string(), Answer::One("Both".into())),
                ]),
            ),
            graded_submission(
                &quiz,
                "s2",
                HashMap::from([
                    ("q1".to_string(), Answer::One("3".into())),
                    ("q2".to_string(), Answer::One("Both".into())),
                ]),
            ),
            corrupt,
        ];

        let analytics = compute_quiz_analytics(&quiz, &subs, 10);

        // The corrupt record still counts as completed but contributes
        // nothing to per-question tallies.
        assert_eq!(analytics.completed_students, 3);
        assert_eq!(analytics.question_stats[0].correct_count, 1);
        assert_eq!(analytics.question_stats[1].correct_count, 2);
    }

    #[test]
    fn end_to_end_two_students() {
        let quiz = sample_quiz();
        let subs = vec![
            graded_submission(
                &quiz,
                "sA",
                HashMap::from([
                    ("q1".to_string(), Answer::One("4".into())),
                    ("q2".to_string(), Answer::One("Both".into())),
                ]),
            ),
            graded_submission(
                &quiz,
                "sB",
                HashMap::from([
                    ("q1".to_string(), Answer::One("3".into())),
                    ("q2".to_string(), Answer::One("Both".into())),
                ]),
            ),
        ];

        let analytics = compute_quiz_analytics(&quiz, &subs, 10);

        assert_eq!(analytics.completed_students, 2);
        assert_eq!(analytics.avg_score, 75.0);
        assert_eq!(analytics.completion_rate(), 20.0);

        let q1 = &analytics.question_stats[0];
        assert_eq!(q1.correct_count, 1);
        assert_eq!(q1.correct_pct, 50.0);

        let q2 = &analytics.question_stats[1];
        assert_eq!(q2.correct_count, 2);
        assert_eq!(q2.correct_pct, 100.0);
    }

    #[test]
    fn option_distribution_preserves_choice_order_and_counts() {
        let quiz = Quiz::new(
            "quiz1",
            "Multi",
            vec![Question {
                id: "q1".into(),
                kind: QuestionKind::MultiChoice,
                prompt: "?".into(),
                points: 3,
                choices: vec!["A".into(), "B".into(), "C".into()],
                answer_key: Some(AnswerKey::Multiple(vec!["A".into(), "C".into()])),
            }],
        );

        let mut list_answer = submission("s1", 3.0, 3.0);
        list_answer.answers_json = r#"{"q1": ["A", "C"]}"#.into();
        list_answer.autograde_json = r#"{"q1": {"correct": true, "points": 3, "max": 3}}"#.into();

        // Older rows stored single selections as bare strings, and may
        // reference options no longer in the quiz.
        let mut scalar_answer = submission("s2", 0.0, 3.0);
        scalar_answer.answers_json = r#"{"q1": "A"}"#.into();
        scalar_answer.autograde_json = r#"{"q1": {"correct": false, "points": 0, "max": 3}}"#.into();

        let mut stale_answer = submission("s3", 0.0, 3.0);
        stale_answer.answers_json = r#"{"q1": ["D"]}"#.into();
        stale_answer.autograde_json = r#"{"q1": {"correct": false, "points": 0, "max": 3}}"#.into();

        let analytics =
            compute_quiz_analytics(&quiz, &[list_answer, scalar_answer, stale_answer], 5);

        let dist = &analytics.question_stats[0].option_distribution;
        let options: Vec<&str> = dist.iter().map(|t| t.option.as_str()).collect();
        assert_eq!(options, vec!["A", "B", "C"]);
        assert_eq!(dist[0].count, 2);
        assert_eq!(dist[1].count, 0);
        assert_eq!(dist[2].count, 1);
    }

    #[test]
    fn analytics_is_deterministic() {
        let quiz = sample_quiz();
        let subs = vec![
            submission("s2", 5.0, 10.0),
            submission("s1", 10.0, 10.0),
            submission("s3", 7.0, 10.0),
        ];

        let a = compute_quiz_analytics(&quiz, &subs, 10);
        let b = compute_quiz_analytics(&quiz, &subs, 10);

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
