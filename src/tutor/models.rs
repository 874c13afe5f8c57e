// SPDX-License-Identifier: MIT

//! Structured outputs requested from the model
//!
//! Field docs become schema descriptions, so they are written for the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuizQuestion {
    /// The question text
    pub question: String,
    /// List of 4 possible answers (A, B, C, D)
    pub options: Vec<String>,
    /// The correct answer (must be one of the options)
    pub correct_answer: String,
    /// Explanation of why the answer is correct
    pub explanation: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, choice: &str) -> bool {
        self.correct_answer.trim() == choice.trim()
    }
}

/// A generated quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quiz {
    /// The topic of the quiz
    pub topic: String,
    /// List of questions in the quiz
    pub questions: Vec<QuizQuestion>,
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quiz: {}", self.topic)?;
        for (i, q) in self.questions.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "Q{}: {}", i + 1, q.question)?;
            for option in &q.options {
                writeln!(f, "   {}", option)?;
            }
            writeln!(f, "   Answer: {}", q.correct_answer)?;
            writeln!(f, "   Explanation: {}", q.explanation)?;
        }
        Ok(())
    }
}

/// A single flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Flashcard {
    /// The term, concept, or question on the front of the card
    pub front: String,
    /// The definition, explanation, or answer on the back of the card
    pub back: String,
}

/// A set of flashcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlashcardSet {
    /// The topic of the flashcards
    pub topic: String,
    /// List of flashcards
    pub cards: Vec<Flashcard>,
}

impl fmt::Display for FlashcardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Flashcards: {}", self.topic)?;
        for card in &self.cards {
            writeln!(f, "Front: {} | Back: {}", card.front, card.back)?;
        }
        Ok(())
    }
}

/// A specific topic or activity within a study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StudyItem {
    /// The specific activity (e.g., 'Read section on X', 'Review Flashcards')
    pub activity: String,
    /// Estimated duration in minutes
    pub duration_minutes: u32,
    /// List of relevant resources or sections to focus on
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A block of study time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StudySession {
    /// The main goal of this session
    pub goal: String,
    /// List of specific activities for this session
    pub items: Vec<StudyItem>,
    /// Total duration of the session in minutes
    pub total_duration_minutes: u32,
}

impl StudySession {
    /// Sum of the item durations, which may disagree with the model's total
    pub fn items_minutes(&self) -> u32 {
        self.items.iter().map(|i| i.duration_minutes).sum()
    }
}

/// The overall study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StudyPlan {
    /// The main topic of the study plan
    pub topic: String,
    /// The overall learning objective
    pub goal: String,
    /// List of study sessions
    pub sessions: Vec<StudySession>,
}

impl fmt::Display for StudyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study plan: {}", self.topic)?;
        writeln!(f, "Goal: {}", self.goal)?;
        for (i, session) in self.sessions.iter().enumerate() {
            writeln!(f)?;
            writeln!(
                f,
                "Session {}: {} ({} mins)",
                i + 1,
                session.goal,
                session.total_duration_minutes
            )?;
            for item in &session.items {
                writeln!(f, "- {} ({}m)", item.activity, item.duration_minutes)?;
            }
        }
        Ok(())
    }
}

/// A judge's verdict on a generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationScore {
    /// Score from 1 to 5
    pub score: u8,
    /// Reasoning for the score
    pub reasoning: String,
}
