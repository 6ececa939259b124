// src/grading.rs
//
// Quiz auto-grading engine. Pure and synchronous: a quiz definition plus a
// student's raw answers map to a per-question and aggregate result. Grading
// is total: every well-formed input produces a storable result, including
// unknown question kinds and absent answer keys.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::quiz::{Answer, AnswerKey, Question, QuestionKind, Quiz};

impl From<AnswerKey> for Answer {
    fn from(key: AnswerKey) -> Self {
        match key {
            AnswerKey::Single(s) => Answer::One(s),
            AnswerKey::Multiple(v) => Answer::Many(v),
        }
    }
}

/// Result of grading a single question.
///
/// `expected` and `got` are populated only when the answer is incorrect, so
/// persisted audit records never echo the answer key for correct responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub correct: bool,
    pub points: u32,
    #[serde(rename = "max")]
    pub max_points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub got: Option<Answer>,
}

impl QuestionResult {
    fn correct_full(points: u32) -> Self {
        Self {
            correct: true,
            points,
            max_points: points,
            expected: None,
            got: None,
        }
    }

    fn incorrect(max_points: u32, expected: Option<Answer>, got: Option<Answer>) -> Self {
        Self {
            correct: false,
            points: 0,
            max_points,
            expected,
            got,
        }
    }
}

/// Result of grading an entire quiz submission.
///
/// The question map is ordered by question id so serialization is
/// deterministic: grading the same input twice yields bit-identical JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub score: u32,
    pub max_score: u32,
    pub questions: std::collections::BTreeMap<String, QuestionResult>,
}

impl GradeResult {
    pub fn percentage(&self) -> f64 {
        if self.max_score == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.max_score) * 100.0
    }

    /// Serializes the per-question detail for storage alongside the
    /// submission. Analytics reads this back instead of re-grading.
    pub fn autograde_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.questions)
    }
}

/// Grades a quiz submission. Questions with no submitted answer are graded
/// as wrong, not skipped; the max score always covers the full quiz.
pub fn grade_quiz(quiz: &Quiz, answers: &HashMap<String, Answer>) -> GradeResult {
    let mut questions = std::collections::BTreeMap::new();
    let mut score = 0;

    for question in &quiz.questions {
        let result = grade_question(question, answers.get(&question.id));
        score += result.points;
        questions.insert(question.id.clone(), result);
    }

    GradeResult {
        score,
        // Explicit total overrides win over the per-question sum.
        max_score: quiz.total_points,
        questions,
    }
}

/// Grades a single question according to its kind.
pub fn grade_question(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    match &question.kind {
        QuestionKind::SingleChoice => grade_single_choice(question, answer),
        QuestionKind::MultiChoice => grade_multi_choice(question, answer),
        QuestionKind::Numeric => grade_numeric(question, answer),
        QuestionKind::ShortText => grade_short_text(question, answer),
        QuestionKind::Unknown(kind) => {
            tracing::warn!(question_id = %question.id, kind = %kind, "unknown question kind");
            QuestionResult::incorrect(
                question.points,
                question.answer_key.clone().map(Answer::from),
                answer.cloned(),
            )
        }
    }
}

/// Exact string equality against the answer key. Choice values are canonical
/// strings matching the option list, so no trimming or case folding applies.
fn grade_single_choice(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let expected = match &question.answer_key {
        Some(AnswerKey::Single(s)) => s,
        // Absent or mis-shaped key: never satisfiable.
        _ => {
            return QuestionResult::incorrect(
                question.points,
                question.answer_key.clone().map(Answer::from),
                answer.cloned(),
            );
        }
    };

    let correct = matches!(answer, Some(Answer::One(given)) if given == expected);
    if correct {
        QuestionResult::correct_full(question.points)
    } else {
        QuestionResult::incorrect(
            question.points,
            Some(Answer::One(expected.clone())),
            answer.cloned(),
        )
    }
}

/// All-or-nothing set equality: every correct option selected and no
/// incorrect ones. A bare scalar answer counts as a one-element set, a
/// missing answer as the empty set.
fn grade_multi_choice(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let expected: BTreeSet<&str> = match &question.answer_key {
        Some(AnswerKey::Multiple(v)) => v.iter().map(String::as_str).collect(),
        Some(AnswerKey::Single(s)) => BTreeSet::from([s.as_str()]),
        None => BTreeSet::new(),
    };

    let given: BTreeSet<&str> = match answer {
        Some(Answer::One(s)) => BTreeSet::from([s.as_str()]),
        Some(Answer::Many(v)) => v.iter().map(String::as_str).collect(),
        None => BTreeSet::new(),
    };

    // An empty key is legal but never satisfiable.
    let correct = !expected.is_empty() && given == expected;
    if correct {
        QuestionResult::correct_full(question.points)
    } else {
        let sorted = |set: &BTreeSet<&str>| {
            Answer::Many(set.iter().map(|s| s.to_string()).collect())
        };
        QuestionResult::incorrect(question.points, Some(sorted(&expected)), Some(sorted(&given)))
    }
}

/// Numeric comparison when both sides parse as f64 (so "8" matches "8.0"),
/// falling back to exact string equality on the trimmed values otherwise.
fn grade_numeric(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let expected_raw = match &question.answer_key {
        Some(AnswerKey::Single(s)) if !s.trim().is_empty() => s,
        _ => {
            return QuestionResult::incorrect(
                question.points,
                question.answer_key.clone().map(Answer::from),
                answer.cloned(),
            );
        }
    };
    let expected = expected_raw.trim();

    let given_raw = match answer {
        Some(Answer::One(s)) => s.as_str(),
        // A list answer to a single-valued question is always wrong.
        Some(Answer::Many(_)) | None => "",
    };
    let given = given_raw.trim();

    let correct = match (expected.parse::<f64>(), given.parse::<f64>()) {
        (Ok(e), Ok(g)) => e == g,
        _ => given == expected,
    };

    if correct {
        QuestionResult::correct_full(question.points)
    } else {
        QuestionResult::incorrect(
            question.points,
            Some(Answer::One(expected.to_string())),
            answer.cloned(),
        )
    }
}

/// Case-insensitive, whitespace-trimmed equality. No fuzzy matching.
fn grade_short_text(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let expected_raw = match &question.answer_key {
        Some(AnswerKey::Single(s)) if !s.trim().is_empty() => s,
        _ => {
            return QuestionResult::incorrect(
                question.points,
                question.answer_key.clone().map(Answer::from),
                answer.cloned(),
            );
        }
    };
    let expected = expected_raw.trim().to_lowercase();

    let given = match answer {
        Some(Answer::One(s)) => s.trim().to_lowercase(),
        Some(Answer::Many(_)) | None => String::new(),
    };

    if given == expected {
        QuestionResult::correct_full(question.points)
    } else {
        QuestionResult::incorrect(
            question.points,
            Some(Answer::One(expected_raw.clone())),
            answer.cloned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{Answer, AnswerKey, Question, QuestionKind, Quiz};

    fn question(kind: QuestionKind, points: u32, key: Option<AnswerKey>) -> Question {
        Question {
            id: "q1".to_string(),
            kind,
            prompt: "?".to_string(),
            points,
            choices: Vec::new(),
            answer_key: key,
        }
    }

    fn one(s: &str) -> Answer {
        Answer::One(s.to_string())
    }

    fn many(items: &[&str]) -> Answer {
        Answer::Many(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn single_choice_correct() {
        let q = question(
            QuestionKind::SingleChoice,
            2,
            Some(AnswerKey::Single("B".into())),
        );
        let result = grade_question(&q, Some(&one("B")));

        assert!(result.correct);
        assert_eq!(result.points, 2);
        assert_eq!(result.max_points, 2);
        assert_eq!(result.expected, None);
        assert_eq!(result.got, None);
    }

    #[test]
    fn single_choice_incorrect_records_expected_and_got() {
        let q = question(
            QuestionKind::SingleChoice,
            2,
            Some(AnswerKey::Single("B".into())),
        );
        let result = grade_question(&q, Some(&one("A")));

        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert_eq!(result.expected, Some(one("B")));
        assert_eq!(result.got, Some(one("A")));
    }

    #[test]
    fn single_choice_no_answer() {
        let q = question(
            QuestionKind::SingleChoice,
            2,
            Some(AnswerKey::Single("B".into())),
        );
        let result = grade_question(&q, None);

        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert_eq!(result.got, None);
    }

    #[test]
    fn single_choice_no_trimming_or_case_folding() {
        let q = question(
            QuestionKind::SingleChoice,
            2,
            Some(AnswerKey::Single("B".into())),
        );
        assert!(!grade_question(&q, Some(&one(" B "))).correct);
        assert!(!grade_question(&q, Some(&one("b"))).correct);
    }

    #[test]
    fn multi_choice_all_correct() {
        let q = question(
            QuestionKind::MultiChoice,
            3,
            Some(AnswerKey::Multiple(vec!["A".into(), "C".into()])),
        );
        let result = grade_question(&q, Some(&many(&["C", "A"])));

        assert!(result.correct);
        assert_eq!(result.points, 3);
    }

    #[test]
    fn multi_choice_partial_selection_scores_zero() {
        let q = question(
            QuestionKind::MultiChoice,
            3,
            Some(AnswerKey::Multiple(vec!["A".into(), "C".into()])),
        );
        let result = grade_question(&q, Some(&many(&["A"])));

        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert_eq!(result.expected, Some(many(&["A", "C"])));
    }

    #[test]
    fn multi_choice_extra_selection_scores_zero() {
        let q = question(
            QuestionKind::MultiChoice,
            3,
            Some(AnswerKey::Multiple(vec!["A".into(), "C".into()])),
        );
        let result = grade_question(&q, Some(&many(&["A", "B", "C"])));

        assert!(!result.correct);
        assert_eq!(result.points, 0);
    }

    #[test]
    fn multi_choice_scalar_answer_is_one_element_set() {
        let q = question(
            QuestionKind::MultiChoice,
            3,
            Some(AnswerKey::Multiple(vec!["A".into()])),
        );
        assert!(grade_question(&q, Some(&one("A"))).correct);
    }

    #[test]
    fn multi_choice_no_answer() {
        let q = question(
            QuestionKind::MultiChoice,
            3,
            Some(AnswerKey::Multiple(vec!["A".into(), "C".into()])),
        );
        let result = grade_question(&q, None);

        assert!(!result.correct);
        assert_eq!(result.points, 0);
    }

    #[test]
    fn numeric_exact_match() {
        let q = question(QuestionKind::Numeric, 1, Some(AnswerKey::Single("8".into())));
        assert!(grade_question(&q, Some(&one("8"))).correct);
    }

    #[test]
    fn numeric_coerces_integer_and_float_forms() {
        let q = question(QuestionKind::Numeric, 1, Some(AnswerKey::Single("42".into())));
        assert!(grade_question(&q, Some(&one("42.0"))).correct);
    }

    #[test]
    fn numeric_incorrect() {
        let q = question(QuestionKind::Numeric, 1, Some(AnswerKey::Single("8".into())));
        let result = grade_question(&q, Some(&one("7")));

        assert!(!result.correct);
        assert_eq!(result.points, 0);
    }

    #[test]
    fn numeric_falls_back_to_string_comparison() {
        let q = question(
            QuestionKind::Numeric,
            1,
            Some(AnswerKey::Single("n/a".into())),
        );
        assert!(grade_question(&q, Some(&one(" n/a "))).correct);
        assert!(!grade_question(&q, Some(&one("none"))).correct);
    }

    #[test]
    fn short_text_case_insensitive_and_trimmed() {
        let q = question(
            QuestionKind::ShortText,
            2,
            Some(AnswerKey::Single("ls".into())),
        );
        assert!(grade_question(&q, Some(&one("ls"))).correct);
        assert!(grade_question(&q, Some(&one("  LS  "))).correct);
        assert!(!grade_question(&q, Some(&one("dir"))).correct);
    }

    #[test]
    fn unknown_kind_yields_zero_credit_sentinel() {
        let q = question(
            QuestionKind::Unknown("essay".into()),
            5,
            Some(AnswerKey::Single("anything".into())),
        );
        let result = grade_question(&q, Some(&one("my essay")));

        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert_eq!(result.max_points, 5);
        assert_eq!(result.expected, Some(one("anything")));
        assert_eq!(result.got, Some(one("my essay")));
    }

    #[test]
    fn absent_answer_key_is_never_satisfiable() {
        for kind in [
            QuestionKind::SingleChoice,
            QuestionKind::MultiChoice,
            QuestionKind::Numeric,
            QuestionKind::ShortText,
        ] {
            let q = question(kind, 2, None);
            let result = grade_question(&q, Some(&one("")));
            assert!(!result.correct);
            assert_eq!(result.points, 0);
            assert_eq!(result.max_points, 2);
        }
    }

    fn two_question_quiz() -> Quiz {
        Quiz::new(
            "q001",
            "Test",
            vec![
                Question {
                    id: "q1".into(),
                    kind: QuestionKind::SingleChoice,
                    prompt: "?".into(),
                    points: 2,
                    choices: vec!["A".into(), "B".into()],
                    answer_key: Some(AnswerKey::Single("A".into())),
                },
                Question {
                    id: "q2".into(),
                    kind: QuestionKind::Numeric,
                    prompt: "?".into(),
                    points: 1,
                    choices: Vec::new(),
                    answer_key: Some(AnswerKey::Single("8".into())),
                },
            ],
        )
    }

    #[test]
    fn grade_quiz_all_correct() {
        let quiz = two_question_quiz();
        let answers = HashMap::from([
            ("q1".to_string(), one("A")),
            ("q2".to_string(), one("8")),
        ]);

        let result = grade_quiz(&quiz, &answers);

        assert_eq!(result.score, 3);
        assert_eq!(result.max_score, 3);
        assert_eq!(result.percentage(), 100.0);
        assert!(result.questions["q1"].correct);
        assert!(result.questions["q2"].correct);
    }

    #[test]
    fn grade_quiz_partial() {
        let quiz = two_question_quiz();
        let answers = HashMap::from([
            ("q1".to_string(), one("A")),
            ("q2".to_string(), one("7")),
        ]);

        let result = grade_quiz(&quiz, &answers);

        assert_eq!(result.score, 2);
        assert_eq!(result.max_score, 3);
        assert!(result.questions["q1"].correct);
        assert!(!result.questions["q2"].correct);
    }

    #[test]
    fn grade_quiz_missing_answers_count_against_max() {
        let quiz = two_question_quiz();
        let answers = HashMap::from([("q1".to_string(), one("A"))]);

        let result = grade_quiz(&quiz, &answers);

        assert_eq!(result.score, 2);
        assert_eq!(result.max_score, 3);
        assert!(!result.questions["q2"].correct);
    }

    #[test]
    fn grade_quiz_zero_max_percentage_is_zero() {
        let quiz = Quiz::new("q001", "Empty", Vec::new());
        let result = grade_quiz(&quiz, &HashMap::new());

        assert_eq!(result.max_score, 0);
        assert_eq!(result.percentage(), 0.0);
    }

    #[test]
    fn explicit_total_override_wins() {
        let mut quiz = two_question_quiz();
        quiz.total_points = 10;
        let answers = HashMap::from([
            ("q1".to_string(), one("A")),
            ("q2".to_string(), one("8")),
        ]);

        let result = grade_quiz(&quiz, &answers);

        assert_eq!(result.score, 3);
        assert_eq!(result.max_score, 10);
    }

    #[test]
    fn grading_is_idempotent() {
        let quiz = two_question_quiz();
        let answers = HashMap::from([
            ("q1".to_string(), one("B")),
            ("q2".to_string(), one("8")),
        ]);

        let first = grade_quiz(&quiz, &answers);
        let second = grade_quiz(&quiz, &answers);

        assert_eq!(first, second);
        assert_eq!(
            first.autograde_json().unwrap(),
            second.autograde_json().unwrap()
        );
    }

    #[test]
    fn autograde_json_round_trips() {
        let quiz = two_question_quiz();
        let answers = HashMap::from([("q1".to_string(), one("B"))]);

        let result = grade_quiz(&quiz, &answers);
        let json = result.autograde_json().unwrap();
        let parsed: std::collections::BTreeMap<String, QuestionResult> =
            serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, result.questions);
        assert!(!parsed["q1"].correct);
        assert_eq!(parsed["q1"].expected, Some(one("A")));
    }
}
