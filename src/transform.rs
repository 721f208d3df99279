//! Turns raw upstream questions into the shape served to callers
//!
//! Decodes HTML entities, applies the local search filter and fixes a
//! shuffled answer order for each question.

use html_escape::decode_html_entities;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::{Question, RawQuestion};

/// Decodes, filters and shuffles a raw upstream batch
///
/// # Arguments
/// * `raw` - Questions as returned by upstream
/// * `search` - Optional case-insensitive substring matched against the decoded question text
/// * `rng` - Random source for the answer order
///
/// # Returns
/// The questions that match `search`, in upstream order
pub fn transform<R: Rng + ?Sized>(
    raw: Vec<RawQuestion>,
    search: Option<&str>,
    rng: &mut R,
) -> Vec<Question> {
    let needle = search.filter(|s| !s.is_empty()).map(str::to_lowercase);

    raw.into_iter()
        .map(decode)
        .filter(|q| match &needle {
            Some(needle) => q.question.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .map(|mut q| {
            q.answers.shuffle(rng);
            q
        })
        .collect()
}

/// Decodes every text field, with answers in canonical (unshuffled) order
fn decode(raw: RawQuestion) -> Question {
    let incorrect_answers: Vec<String> = raw
        .incorrect_answers
        .iter()
        .map(|a| decode_html_entities(a).into_owned())
        .collect();
    let correct_answer = decode_html_entities(&raw.correct_answer).into_owned();

    let mut answers = incorrect_answers.clone();
    answers.push(correct_answer.clone());

    Question {
        category: decode_html_entities(&raw.category).into_owned(),
        kind: raw.kind,
        difficulty: raw.difficulty,
        question: decode_html_entities(&raw.question).into_owned(),
        correct_answer,
        incorrect_answers,
        answers,
    }
}
