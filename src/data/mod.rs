//! Core data models for the trivia proxy
//!
//! This module contains the question types served to callers, the raw
//! upstream shapes, and the filter set that identifies a cached batch.

pub mod opentdb;

pub use opentdb::{OpenTdbClient, TriviaSource, UpstreamError, UpstreamResponse};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Difficulty levels supported by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parses a query parameter value into a Difficulty
    ///
    /// Matching is case-insensitive. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Returns the wire value used by the upstream API
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Answer format of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Multiple choice (one correct, three incorrect answers)
    Multiple,
    /// True / False
    Boolean,
}

impl QuestionType {
    /// Parses a query parameter value into a QuestionType
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "multiple" => Some(QuestionType::Multiple),
            "boolean" => Some(QuestionType::Boolean),
            _ => None,
        }
    }

    /// Returns the wire value used by the upstream API
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Multiple => "multiple",
            QuestionType::Boolean => "boolean",
        }
    }
}

/// A question exactly as returned by the upstream API
///
/// Text fields are still HTML-entity encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuestion {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub difficulty: Difficulty,
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

/// A decoded question ready to be served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Category name (e.g. "Science: Computers")
    pub category: String,
    /// Answer format
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Difficulty level
    pub difficulty: Difficulty,
    /// Decoded question text
    pub question: String,
    /// Decoded correct answer
    pub correct_answer: String,
    /// Decoded incorrect answers, in upstream order
    pub incorrect_answers: Vec<String>,
    /// All answers in a randomized order, fixed when the batch was fetched
    pub answers: Vec<String>,
}

/// Filters accepted by the inbound query operation
///
/// Use [`QueryFilters::normalized`] before comparing or keying on a filter set:
/// empty strings and absent values mean the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryFilters {
    /// Upstream category id (e.g. "9" for General Knowledge)
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub kind: Option<QuestionType>,
    /// Case-insensitive substring matched against the decoded question text
    pub search: Option<String>,
}

impl QueryFilters {
    /// Returns a copy with empty strings collapsed to `None`
    pub fn normalized(&self) -> Self {
        Self {
            category: non_empty(self.category.as_deref()),
            difficulty: self.difficulty,
            kind: self.kind,
            search: non_empty(self.search.as_deref()),
        }
    }

    /// Computes the cache key for this filter set
    pub fn signature(&self) -> QuerySignature {
        QuerySignature(self.normalized())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Normalized filter set used as the cache key
///
/// Page number and page size are deliberately absent: every page of a query
/// is sliced from the same cached batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(QueryFilters);

impl QuerySignature {
    /// The normalized filters this signature was built from
    pub fn filters(&self) -> &QueryFilters {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters = &self.0;
        write!(
            f,
            "questions:{{category={},difficulty={},type={},search={}}}",
            filters.category.as_deref().unwrap_or("-"),
            filters.difficulty.map(|d| d.as_str()).unwrap_or("-"),
            filters.kind.map(|k| k.as_str()).unwrap_or("-"),
            filters.search.as_deref().unwrap_or("-"),
        )
    }
}
