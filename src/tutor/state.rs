// SPDX-License-Identifier: MIT

//! Run state threaded through the graph
//!
//! Stages never mutate [`RunState`] directly. Each returns a [`StateUpdate`]
//! delta which the executor folds in with [`RunState::apply`], following the
//! per-field policy in [`StateField::reducer`].

use serde::{Deserialize, Serialize};

use super::intent::Intent;

/// Step labels recorded in [`RunState::steps`]
pub mod labels {
    pub const PLANNED: &str = "Planned";
    pub const RETRIEVED: &str = "Retrieved";
    pub const VALIDATED: &str = "Validated";
    pub const EXPLAINED: &str = "Explained";
    pub const GENERATED_QUIZ: &str = "Generated Quiz";
    pub const GENERATED_FLASHCARDS: &str = "Generated Flashcards";
    pub const GENERATED_PLAN: &str = "Generated Plan";
    pub const CHATTED: &str = "Chatted";
    pub const SAVED_MEMORY: &str = "Saved Memory";
}

/// How a field combines with an incoming value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Replace the value
    Overwrite,
    /// Concatenate onto the existing list
    Append,
}

/// Every field of [`RunState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    Question,
    Intent,
    Context,
    Answer,
    Content,
    Memories,
    Steps,
}

impl StateField {
    pub const ALL: [StateField; 7] = [
        StateField::Question,
        StateField::Intent,
        StateField::Context,
        StateField::Answer,
        StateField::Content,
        StateField::Memories,
        StateField::Steps,
    ];

    pub fn reducer(self) -> Reducer {
        match self {
            StateField::Steps => Reducer::Append,
            StateField::Question
            | StateField::Intent
            | StateField::Context
            | StateField::Answer
            | StateField::Content
            | StateField::Memories => Reducer::Overwrite,
        }
    }
}

/// The single content slot a handler fills
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Content {
    Explanation(String),
    Quiz(String),
    Flashcards(String),
    StudyPlan(String),
    Reply(String),
    SavedFact(String),
}

impl Content {
    pub fn body(&self) -> &str {
        match self {
            Content::Explanation(s)
            | Content::Quiz(s)
            | Content::Flashcards(s)
            | Content::StudyPlan(s)
            | Content::Reply(s)
            | Content::SavedFact(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Content::Explanation(_) => "explanation",
            Content::Quiz(_) => "quiz",
            Content::Flashcards(_) => "flashcards",
            Content::StudyPlan(_) => "study_plan",
            Content::Reply(_) => "reply",
            Content::SavedFact(_) => "saved_fact",
        }
    }
}

/// State of one run through a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: Intent")]
pub struct RunState<I: Intent> {
    pub question: String,
    pub intent: Option<I>,
    pub context: Option<String>,
    pub answer: Option<String>,
    pub content: Option<Content>,
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl<I: Intent> RunState<I> {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            intent: None,
            context: None,
            answer: None,
            content: None,
            memories: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Start a new run on top of a resumed state: the new question replaces
    /// the old one, while the previous run's trace and per-run fields are
    /// cleared.
    pub fn resume(previous: &RunState<I>, question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            intent: None,
            context: None,
            answer: previous.answer.clone(),
            content: None,
            memories: previous.memories.clone(),
            steps: Vec::new(),
        }
    }

    /// Fold a stage's delta into the state
    pub fn apply(&mut self, update: StateUpdate<I>) {
        let StateUpdate {
            question,
            intent,
            context,
            answer,
            content,
            memories,
            steps,
        } = update;

        overwrite(&mut self.question, question);
        overwrite(&mut self.intent, intent.map(Some));
        overwrite(&mut self.context, context.map(Some));
        overwrite(&mut self.answer, answer.map(Some));
        overwrite(&mut self.content, content.map(Some));
        merge_list(StateField::Memories.reducer(), &mut self.memories, memories);
        merge_list(StateField::Steps.reducer(), &mut self.steps, Some(steps));
    }

    /// Read-only view handed to handlers
    pub fn handler_input(&self) -> HandlerInput<'_> {
        HandlerInput {
            question: &self.question,
            context: self.context.as_deref(),
            memories: &self.memories,
        }
    }
}

fn overwrite<T>(slot: &mut T, incoming: Option<T>) {
    if let Some(value) = incoming {
        *slot = value;
    }
}

fn merge_list<T>(reducer: Reducer, slot: &mut Vec<T>, incoming: Option<Vec<T>>) {
    let Some(mut values) = incoming else {
        return;
    };
    match reducer {
        Reducer::Overwrite => *slot = values,
        Reducer::Append => slot.append(&mut values),
    }
}

/// Delta returned by a stage
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate<I: Intent> {
    pub question: Option<String>,
    pub intent: Option<I>,
    pub context: Option<String>,
    pub answer: Option<String>,
    pub content: Option<Content>,
    pub memories: Option<Vec<String>>,
    pub steps: Vec<String>,
}

impl<I: Intent> Default for StateUpdate<I> {
    fn default() -> Self {
        Self {
            question: None,
            intent: None,
            context: None,
            answer: None,
            content: None,
            memories: None,
            steps: Vec::new(),
        }
    }
}

impl<I: Intent> StateUpdate<I> {
    /// An update that only records a step label
    pub fn step(label: impl Into<String>) -> Self {
        Self {
            steps: vec![label.into()],
            ..Default::default()
        }
    }

    pub fn with_intent(mut self, intent: I) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_memories(mut self, memories: Vec<String>) -> Self {
        self.memories = Some(memories);
        self
    }
}

/// The fields a handler is allowed to read
#[derive(Debug, Clone, Copy)]
pub struct HandlerInput<'a> {
    pub question: &'a str,
    pub context: Option<&'a str>,
    pub memories: &'a [String],
}

/// What a handler returns: its answer, its content, its step label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutput {
    pub answer: String,
    pub content: Content,
    pub step: &'static str,
}

impl HandlerOutput {
    pub fn into_update<I: Intent>(self) -> StateUpdate<I> {
        StateUpdate {
            answer: Some(self.answer),
            content: Some(self.content),
            steps: vec![self.step.to_string()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::intent::TutorIntent;

    #[test]
    fn test_merge_policy_is_total() {
        for field in StateField::ALL {
            let expected = if field == StateField::Steps {
                Reducer::Append
            } else {
                Reducer::Overwrite
            };
            assert_eq!(field.reducer(), expected, "{:?}", field);
        }
    }

    #[test]
    fn test_merge_list_follows_reducer() {
        let mut list = vec![1, 2];
        merge_list(Reducer::Append, &mut list, Some(vec![3]));
        assert_eq!(list, vec![1, 2, 3]);

        merge_list(Reducer::Overwrite, &mut list, Some(vec![9]));
        assert_eq!(list, vec![9]);

        merge_list(Reducer::Overwrite, &mut list, None);
        assert_eq!(list, vec![9]);
    }

    #[test]
    fn test_apply_memories_replace_steps_accumulate() {
        let mut state: RunState<TutorIntent> = RunState::new("q");
        state.apply(StateUpdate::step("Planned").with_memories(vec!["a".to_string()]));
        state.apply(StateUpdate::step("Chatted").with_memories(vec!["b".to_string()]));

        assert_eq!(state.memories, vec!["b"]);
        assert_eq!(state.steps, vec!["Planned", "Chatted"]);
    }

    #[test]
    fn test_steps_append() {
        let mut state: RunState<TutorIntent> = RunState::new("q");
        state.apply(StateUpdate::step("Planned"));
        state.apply(StateUpdate::step("Retrieved"));
        assert_eq!(state.steps, vec!["Planned", "Retrieved"]);
    }

    #[test]
    fn test_scalars_overwrite() {
        let mut state: RunState<TutorIntent> = RunState::new("q");
        state.apply(StateUpdate::step("Planned").with_intent(TutorIntent::Quiz));
        state.apply(StateUpdate::step("Again").with_intent(TutorIntent::Explain));
        assert_eq!(state.intent, Some(TutorIntent::Explain));
    }

    #[test]
    fn test_absent_fields_untouched() {
        let mut state: RunState<TutorIntent> =
            RunState::new("q").with_context(Some("ctx".to_string()));
        state.memories = vec!["fact".to_string()];
        state.apply(StateUpdate::step("Noop"));

        assert_eq!(state.question, "q");
        assert_eq!(state.context.as_deref(), Some("ctx"));
        assert_eq!(state.memories, vec!["fact"]);
        assert!(state.answer.is_none());
    }

    #[test]
    fn test_handler_output_into_update() {
        let output = HandlerOutput {
            answer: "Here is your generated quiz...".to_string(),
            content: Content::Quiz("Question 1: ...".to_string()),
            step: "Generated Quiz",
        };
        let mut state: RunState<TutorIntent> = RunState::new("quiz me");
        state.apply(output.into_update());

        assert_eq!(state.answer.as_deref(), Some("Here is your generated quiz..."));
        assert_eq!(state.content.as_ref().map(Content::kind), Some("quiz"));
        assert_eq!(state.steps, vec!["Generated Quiz"]);
    }

    #[test]
    fn test_resume_clears_per_run_fields() {
        let mut previous: RunState<TutorIntent> = RunState::new("first");
        previous.intent = Some(TutorIntent::Quiz);
        previous.answer = Some("old answer".to_string());
        previous.content = Some(Content::Quiz("q".to_string()));
        previous.steps = vec!["Planned".to_string()];

        let next = RunState::resume(&previous, "second");
        assert_eq!(next.question, "second");
        assert!(next.intent.is_none());
        assert!(next.content.is_none());
        assert!(next.steps.is_empty());
        assert_eq!(next.answer.as_deref(), Some("old answer"));
    }

    #[test]
    fn test_state_serde() {
        let mut state: RunState<TutorIntent> = RunState::new("q");
        state.intent = Some(TutorIntent::StudyPlan);
        state.content = Some(Content::StudyPlan("Week 1: ...".to_string()));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["intent"], "study_plan");
        assert_eq!(json["content"]["kind"], "study_plan");
        assert_eq!(json["content"]["body"], "Week 1: ...");

        let back: RunState<TutorIntent> = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
