// src/quiz_parser.rs
//
// Parses quiz markdown documents into `Quiz` definitions.
//
// Document shape:
//   - optional front matter block with a `title:` entry
//   - question headers: `## Q1 [single_choice, 5 pts]`
//   - choice options as checklist items, `- [x]` marking the answer key
//   - `answer:` line supplying the key for numeric/short_text questions

use std::sync::LazyLock;

use regex::Regex;

use crate::models::quiz::{AnswerKey, Question, QuestionKind, Quiz};

static FRONTMATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A---\s*\n(?s)(.*?)\n---\s*\n").unwrap());

static QUESTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s+Q(\d+)\s*\[([^,\]]+),\s*(\d+)\s*pts?\]").unwrap());

static MCQ_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s*\[([ xX])\]\s*(.+)$").unwrap());

static ANSWER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^answer:\s*(.+)$").unwrap());

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^title:\s*(.+)$").unwrap());

/// Parses quiz markdown content into a `Quiz`.
///
/// Questions that fail to parse are skipped with a warning; the rest of the
/// document still loads.
pub fn parse_quiz_content(content: &str, quiz_id: &str) -> Quiz {
    let mut title = "Untitled Quiz".to_string();
    if let Some(frontmatter) = FRONTMATTER.captures(content) {
        if let Some(m) = TITLE_LINE.captures(&frontmatter[1]) {
            title = m[1].trim().trim_matches('"').to_string();
        }
    }

    let headers: Vec<_> = QUESTION_HEADER.captures_iter(content).collect();
    let mut questions = Vec::with_capacity(headers.len());

    for (i, header) in headers.iter().enumerate() {
        let number = &header[1];
        let kind = QuestionKind::from(header[2].trim().to_lowercase());
        let points: u32 = match header[3].parse() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(question = %number, "invalid point value, skipping question");
                continue;
            }
        };

        // Question body runs from this header to the next one (or EOF).
        let start = header.get(0).map(|m| m.end()).unwrap_or(0);
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());
        let body = content[start..end].trim();

        if let Some(question) = parse_question(&format!("q{number}"), kind, points, body) {
            questions.push(question);
        }
    }

    Quiz::new(quiz_id, title, questions)
}

fn parse_question(id: &str, kind: QuestionKind, points: u32, body: &str) -> Option<Question> {
    match kind {
        QuestionKind::SingleChoice | QuestionKind::MultiChoice => {
            let mut prompt_lines = Vec::new();
            let mut choices = Vec::new();
            let mut correct = Vec::new();
            let mut in_options = false;

            for line in body.lines() {
                if let Some(option) = MCQ_OPTION.captures(line) {
                    in_options = true;
                    let text = option[2].trim().to_string();
                    if option[1].eq_ignore_ascii_case("x") {
                        correct.push(text.clone());
                    }
                    choices.push(text);
                } else if !in_options {
                    prompt_lines.push(line);
                }
            }

            let answer_key = match kind {
                QuestionKind::SingleChoice => correct.into_iter().next().map(AnswerKey::Single),
                _ => {
                    if correct.is_empty() {
                        None
                    } else {
                        Some(AnswerKey::Multiple(correct))
                    }
                }
            };
            if answer_key.is_none() {
                tracing::warn!(question = id, "no checked option, question is unscoreable");
            }

            Some(Question {
                id: id.to_string(),
                kind,
                prompt: prompt_lines.join("\n").trim().to_string(),
                points,
                choices,
                answer_key,
            })
        }
        QuestionKind::Numeric | QuestionKind::ShortText => {
            let (prompt, answer_key) = match ANSWER_LINE.captures(body) {
                Some(m) => {
                    let answer = m[1].trim().to_string();
                    let prompt = body[..m.get(0).map(|w| w.start()).unwrap_or(0)]
                        .trim()
                        .to_string();
                    (prompt, Some(AnswerKey::Single(answer)))
                }
                None => {
                    tracing::warn!(question = id, "no answer line found");
                    (body.to_string(), None)
                }
            };

            Some(Question {
                id: id.to_string(),
                kind,
                prompt,
                points,
                choices: Vec::new(),
                answer_key,
            })
        }
        QuestionKind::Unknown(ref unknown) => {
            tracing::warn!(question = id, kind = %unknown, "unknown question kind, skipping");
            None
        }
    }
}
