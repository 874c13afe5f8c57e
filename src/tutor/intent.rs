// SPDX-License-Identifier: MIT

//! Intent classification
//!
//! Each graph variant has its own closed intent enum. Classification lower-cases
//! the question and walks an ordered keyword table; the first hit wins and
//! anything else falls back to the variant's default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// A closed set of routable intents
pub trait Intent:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every variant, in declaration order
    const ALL: &'static [Self];

    /// Map raw question text to an intent. Total and deterministic.
    fn classify(question: &str) -> Self;

    /// Stable snake_case label
    fn as_str(&self) -> &'static str;
}

/// Ordered keyword lookup shared by both variants
fn first_match<I: Copy>(question: &str, table: &[(&str, I)], default: I) -> I {
    let lowered = question.to_lowercase();
    table
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, intent)| *intent)
        .unwrap_or(default)
}

/// Intents of the tutoring graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorIntent {
    Explain,
    Quiz,
    Flashcards,
    StudyPlan,
}

const TUTOR_KEYWORDS: &[(&str, TutorIntent)] = &[
    ("quiz", TutorIntent::Quiz),
    ("flashcard", TutorIntent::Flashcards),
    ("plan", TutorIntent::StudyPlan),
];

impl Intent for TutorIntent {
    const ALL: &'static [Self] = &[
        TutorIntent::Explain,
        TutorIntent::Quiz,
        TutorIntent::Flashcards,
        TutorIntent::StudyPlan,
    ];

    fn classify(question: &str) -> Self {
        first_match(question, TUTOR_KEYWORDS, TutorIntent::Explain)
    }

    fn as_str(&self) -> &'static str {
        match self {
            TutorIntent::Explain => "explain",
            TutorIntent::Quiz => "quiz",
            TutorIntent::Flashcards => "flashcards",
            TutorIntent::StudyPlan => "study_plan",
        }
    }
}

/// Intents of the memory graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryIntent {
    Chat,
    SaveMemory,
}

const MEMORY_KEYWORDS: &[(&str, MemoryIntent)] = &[
    ("save", MemoryIntent::SaveMemory),
    ("remember", MemoryIntent::SaveMemory),
    ("my name is", MemoryIntent::SaveMemory),
];

impl Intent for MemoryIntent {
    const ALL: &'static [Self] = &[MemoryIntent::Chat, MemoryIntent::SaveMemory];

    fn classify(question: &str) -> Self {
        first_match(question, MEMORY_KEYWORDS, MemoryIntent::Chat)
    }

    fn as_str(&self) -> &'static str {
        match self {
            MemoryIntent::Chat => "chat",
            MemoryIntent::SaveMemory => "save_memory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tutor_default_is_explain() {
        assert_eq!(TutorIntent::classify("What is LangGraph?"), TutorIntent::Explain);
        assert_eq!(TutorIntent::classify(""), TutorIntent::Explain);
    }

    #[test]
    fn test_quiz_any_case() {
        for q in ["quiz me", "Generate a QUIZ", "What is a Quiz?", "pop-quiz time"] {
            assert_eq!(TutorIntent::classify(q), TutorIntent::Quiz, "{}", q);
        }
    }

    #[test]
    fn test_quiz_wins_over_flashcard() {
        assert_eq!(
            TutorIntent::classify("Make flashcards and a quiz"),
            TutorIntent::Quiz
        );
    }

    #[test]
    fn test_flashcard_wins_over_plan() {
        assert_eq!(
            TutorIntent::classify("Plan some flashcards"),
            TutorIntent::Flashcards
        );
    }

    #[test]
    fn test_plan_substring() {
        assert_eq!(
            TutorIntent::classify("Create a study plan for learning AI"),
            TutorIntent::StudyPlan
        );
        // Substring match, so "planet" counts too
        assert_eq!(TutorIntent::classify("Explain planets"), TutorIntent::StudyPlan);
    }

    #[test]
    fn test_memory_classification() {
        assert_eq!(
            MemoryIntent::classify("Please remember that my name is Sam"),
            MemoryIntent::SaveMemory
        );
        assert_eq!(MemoryIntent::classify("save this fact"), MemoryIntent::SaveMemory);
        assert_eq!(MemoryIntent::classify("My Name Is Ada"), MemoryIntent::SaveMemory);
        assert_eq!(MemoryIntent::classify("Who am I?"), MemoryIntent::Chat);
    }

    #[test]
    fn test_labels_and_serde_agree() {
        for intent in TutorIntent::ALL {
            let json = serde_json::to_string(intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
        for intent in MemoryIntent::ALL {
            let json = serde_json::to_string(intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
    }
}
