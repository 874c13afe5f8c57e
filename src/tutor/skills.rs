// SPDX-License-Identifier: MIT

//! Content generation behind the handlers
//!
//! [`Tutor`] is what a handler calls to produce its answer and content.
//! [`ScriptedTutor`] returns fixed text and needs nothing; [`LlmTutor`] asks a
//! [`Model`], using the retrieved context and structured output where the
//! result has a shape.
//!
//! [`StudyGenerator`] exposes the same generation directly, for the standalone
//! quiz, flashcard and plan commands.

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::error::Result;
use crate::adk::model::{generate_structured, generate_text, Content, GenerationConfig, Model};
use crate::adk::retriever::{join_context, Retriever};
use crate::tutor::models::{FlashcardSet, Quiz, StudyPlan};
use crate::tutor::state::{labels, Content as RunContent, HandlerInput, HandlerOutput};

/// Produces the output of each content handler
#[async_trait]
pub trait Tutor: Send + Sync {
    async fn explain(&self, input: HandlerInput<'_>) -> Result<HandlerOutput>;
    async fn quiz(&self, input: HandlerInput<'_>) -> Result<HandlerOutput>;
    async fn flashcards(&self, input: HandlerInput<'_>) -> Result<HandlerOutput>;
    async fn study_plan(&self, input: HandlerInput<'_>) -> Result<HandlerOutput>;
    async fn chat(&self, input: HandlerInput<'_>) -> Result<HandlerOutput>;
}

/// Fixed outputs, no model required
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedTutor;

#[async_trait]
impl Tutor for ScriptedTutor {
    async fn explain(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let answer = format!("Here is a simple explanation for: {}", input.question);
        Ok(HandlerOutput {
            content: RunContent::Explanation(answer.clone()),
            answer,
            step: labels::EXPLAINED,
        })
    }

    async fn quiz(&self, _input: HandlerInput<'_>) -> Result<HandlerOutput> {
        Ok(HandlerOutput {
            answer: "Here is your generated quiz...".to_string(),
            content: RunContent::Quiz("Question 1: ...".to_string()),
            step: labels::GENERATED_QUIZ,
        })
    }

    async fn flashcards(&self, _input: HandlerInput<'_>) -> Result<HandlerOutput> {
        Ok(HandlerOutput {
            answer: "Here are your flashcards...".to_string(),
            content: RunContent::Flashcards("Front: ... Back: ...".to_string()),
            step: labels::GENERATED_FLASHCARDS,
        })
    }

    async fn study_plan(&self, _input: HandlerInput<'_>) -> Result<HandlerOutput> {
        Ok(HandlerOutput {
            answer: "Here is your study plan...".to_string(),
            content: RunContent::StudyPlan("Week 1: ...".to_string()),
            step: labels::GENERATED_PLAN,
        })
    }

    async fn chat(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let mut answer = if input.memories.is_empty() {
            format!(
                "I don't know much about you yet. Responding to: {}",
                input.question
            )
        } else {
            format!(
                "Based on what I know about you:\n{}\n\nResponding to: {}",
                bullet_list(input.memories),
                input.question
            )
        };
        if let Some(context) = input.context {
            answer.push_str(&format!("\n\nContext:\n{}", context));
        }

        Ok(HandlerOutput {
            content: RunContent::Reply(answer.clone()),
            answer,
            step: labels::CHATTED,
        })
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|m| format!("- {}", m))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Model-backed generation of explanations, quizzes, flashcards and plans
pub struct StudyGenerator {
    model: Arc<dyn Model>,
}

impl StudyGenerator {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }

    /// Plain-language explanation grounded in `context`
    pub async fn explain(&self, question: &str, context: &str) -> Result<String> {
        let prompt = format!(
            "Context:\n{}\n\nQuestion: {}\n\n\
             Use the context above to answer the question. Explain it to someone \
             meeting the topic for the first time, in simple language. Briefly define \
             any technical term you use. Be concise but complete.\n\nAnswer:",
            context, question
        );
        let history = [
            Content::system("You are a helpful teacher explaining complex topics in simple terms."),
            Content::user(prompt),
        ];
        generate_text(
            self.model.as_ref(),
            &history,
            Some(&GenerationConfig::deterministic()),
        )
        .await
    }

    /// Three multiple-choice questions with four options each
    pub async fn quiz(&self, topic: &str, context: &str) -> Result<Quiz> {
        log::info!("Generating quiz for topic: {}", topic);
        let prompt = format!(
            "Context:\n{}\n\nTopic: {}\n\n\
             Create a quiz with 3 multiple-choice questions based on the context. \
             Each question has exactly 4 options and one correct answer, which must be \
             one of the options. Test understanding rather than memorization and explain \
             each correct answer.",
            context, topic
        );
        self.structured(
            "You are an expert teacher creating a quiz to test student understanding.",
            prompt,
        )
        .await
    }

    /// Five flashcards covering the key concepts
    pub async fn flashcards(&self, topic: &str, context: &str) -> Result<FlashcardSet> {
        log::info!("Generating flashcards for topic: {}", topic);
        let prompt = format!(
            "Context:\n{}\n\nTopic: {}\n\n\
             Create 5 flashcards based on the context. The front is a specific term, \
             concept or short question; the back is a clear, concise definition or answer. \
             Focus on the concepts that matter most for understanding.",
            context, topic
        );
        self.structured("You are an expert teacher creating study flashcards.", prompt)
            .await
    }

    /// Sessions of concrete activities fitting into `duration`
    pub async fn study_plan(&self, topic: &str, duration: &str, context: &str) -> Result<StudyPlan> {
        log::info!("Generating study plan for topic: {} ({})", topic, duration);
        let prompt = format!(
            "Context:\n{}\n\nTopic: {}\nAvailable Time: {}\n\n\
             Create a realistic, actionable study plan for the available time. Split it \
             into sessions if the time allows, and give every session specific reading, \
             reviewing or practice activities with durations.",
            context, topic, duration
        );
        self.structured(
            "You are an expert study planner helping a student master a topic.",
            prompt,
        )
        .await
    }

    /// Conversational reply that uses what is known about the user
    pub async fn chat(&self, question: &str, memories: &[String], context: Option<&str>) -> Result<String> {
        let mut system = String::from("You are a friendly learning assistant.");
        if !memories.is_empty() {
            system.push_str("\n\nWhat you know about the user:\n");
            system.push_str(&bullet_list(memories));
        }
        if let Some(context) = context {
            system.push_str("\n\nDocument context:\n");
            system.push_str(context);
        }
        let history = [Content::system(system), Content::user(question)];
        generate_text(self.model.as_ref(), &history, None).await
    }

    async fn structured<T>(&self, system: &str, prompt: String) -> Result<T>
    where
        T: schemars::JsonSchema + serde::de::DeserializeOwned,
    {
        let history = [Content::system(system), Content::user(prompt)];
        generate_structured(
            self.model.as_ref(),
            &history,
            Some(&GenerationConfig::deterministic()),
        )
        .await
    }
}

/// Fetch and join context for `query`, or empty when there is no retriever
pub async fn gather_context(retriever: Option<&dyn Retriever>, query: &str) -> Result<String> {
    match retriever {
        Some(r) => Ok(join_context(&r.retrieve(query).await?)),
        None => {
            log::info!("No retriever configured, relying on model knowledge");
            Ok(String::new())
        }
    }
}

/// Handler outputs generated by a model
pub struct LlmTutor {
    generator: StudyGenerator,
}

impl LlmTutor {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            generator: StudyGenerator::new(model),
        }
    }
}

#[async_trait]
impl Tutor for LlmTutor {
    async fn explain(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let text = self
            .generator
            .explain(input.question, input.context.unwrap_or_default())
            .await?;
        Ok(HandlerOutput {
            content: RunContent::Explanation(text.clone()),
            answer: text,
            step: labels::EXPLAINED,
        })
    }

    async fn quiz(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let quiz = self
            .generator
            .quiz(input.question, input.context.unwrap_or_default())
            .await?;
        Ok(HandlerOutput {
            answer: format!("Here is your quiz on {}.", quiz.topic),
            content: RunContent::Quiz(quiz.to_string()),
            step: labels::GENERATED_QUIZ,
        })
    }

    async fn flashcards(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let set = self
            .generator
            .flashcards(input.question, input.context.unwrap_or_default())
            .await?;
        Ok(HandlerOutput {
            answer: format!("Here are {} flashcards on {}.", set.cards.len(), set.topic),
            content: RunContent::Flashcards(set.to_string()),
            step: labels::GENERATED_FLASHCARDS,
        })
    }

    async fn study_plan(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let plan = self
            .generator
            .study_plan(
                input.question,
                "unspecified",
                input.context.unwrap_or_default(),
            )
            .await?;
        Ok(HandlerOutput {
            answer: format!("Here is your study plan: {}", plan.goal),
            content: RunContent::StudyPlan(plan.to_string()),
            step: labels::GENERATED_PLAN,
        })
    }

    async fn chat(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
        let reply = self
            .generator
            .chat(input.question, input.memories, input.context)
            .await?;
        Ok(HandlerOutput {
            content: RunContent::Reply(reply.clone()),
            answer: reply,
            step: labels::CHATTED,
        })
    }
}
