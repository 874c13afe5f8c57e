// SPDX-License-Identifier: MIT

//! Tutoring graph
//!
//! `Start -> Planner -> Retriever -(intent)-> Handle(i) -> Validate -> End`

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::error::{GraphError, Result, TutorError};
use crate::adk::retriever::{join_context, Retriever};
use crate::tutor::graph::{CompiledGraph, Stage, StageRunner, StateGraph};
use crate::tutor::intent::{Intent, TutorIntent};
use crate::tutor::skills::Tutor;
use crate::tutor::state::{labels, RunState, StateUpdate};

/// Build and compile the tutoring graph
pub fn tutoring_graph() -> std::result::Result<CompiledGraph<TutorIntent>, GraphError> {
    let mut graph = StateGraph::new();
    graph
        .add_edge(Stage::Start, Stage::Planner)?
        .add_edge(Stage::Planner, Stage::Retriever)?
        .add_conditional_edges(
            Stage::Retriever,
            TutorIntent::ALL.iter().map(|i| (*i, Stage::Handle(*i))),
        )?;
    for intent in TutorIntent::ALL {
        graph.add_edge(Stage::Handle(*intent), Stage::Validate)?;
    }
    graph.add_edge(Stage::Validate, Stage::End)?;
    graph.compile()
}

/// Check that a handler left a usable answer behind
pub fn validate<I: Intent>(state: &RunState<I>) -> Result<StateUpdate<I>> {
    if state.answer.as_deref().map_or(true, str::is_empty) {
        return Err(TutorError::Validation(
            "handler produced no answer".to_string(),
        ));
    }
    if state.content.is_none() {
        return Err(TutorError::Validation(
            "handler produced no content".to_string(),
        ));
    }
    log::info!("Validator: output accepted");
    Ok(StateUpdate::step(labels::VALIDATED))
}

/// Runs the stages of the tutoring graph
pub struct TutoringAgent {
    tutor: Arc<dyn Tutor>,
    retriever: Option<Arc<dyn Retriever>>,
}

impl TutoringAgent {
    pub fn new(tutor: Arc<dyn Tutor>) -> Self {
        Self {
            tutor,
            retriever: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    fn plan(&self, state: &RunState<TutorIntent>) -> StateUpdate<TutorIntent> {
        let intent = TutorIntent::classify(&state.question);
        log::info!("Planner: intent -> {}", intent.as_str());
        StateUpdate::step(labels::PLANNED).with_intent(intent)
    }

    async fn retrieve(&self, state: &RunState<TutorIntent>) -> Result<StateUpdate<TutorIntent>> {
        let update = StateUpdate::step(labels::RETRIEVED);
        match &self.retriever {
            Some(retriever) => {
                let chunks = retriever.retrieve(&state.question).await?;
                log::info!("Retriever: {} chunks", chunks.len());
                Ok(update.with_context(join_context(&chunks)))
            }
            None => {
                log::info!("Retriever: no documents loaded");
                Ok(update)
            }
        }
    }

    async fn handle(
        &self,
        intent: TutorIntent,
        state: &RunState<TutorIntent>,
    ) -> Result<StateUpdate<TutorIntent>> {
        let input = state.handler_input();
        let output = match intent {
            TutorIntent::Explain => self.tutor.explain(input).await?,
            TutorIntent::Quiz => self.tutor.quiz(input).await?,
            TutorIntent::Flashcards => self.tutor.flashcards(input).await?,
            TutorIntent::StudyPlan => self.tutor.study_plan(input).await?,
        };
        log::info!("Handler {}: {}", intent.as_str(), output.step);
        Ok(output.into_update())
    }
}

#[async_trait]
impl StageRunner<TutorIntent> for TutoringAgent {
    async fn run_stage(
        &self,
        stage: Stage<TutorIntent>,
        state: &RunState<TutorIntent>,
    ) -> Result<StateUpdate<TutorIntent>> {
        match stage {
            Stage::Planner => Ok(self.plan(state)),
            Stage::Retriever => self.retrieve(state).await,
            Stage::Handle(intent) => self.handle(intent, state).await,
            Stage::Validate => validate(state),
            Stage::Start | Stage::End => Err(GraphError::InvalidEdge(format!(
                "stage '{}' cannot be executed",
                stage
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::retriever::{Chunk, KeywordRetriever};
    use crate::tutor::skills::ScriptedTutor;
    use crate::tutor::state::{Content, HandlerInput, HandlerOutput};

    async fn run(agent: &TutoringAgent, question: &str) -> Result<RunState<TutorIntent>> {
        tutoring_graph()?.invoke(agent, RunState::new(question)).await
    }

    fn scripted() -> TutoringAgent {
        TutoringAgent::new(Arc::new(ScriptedTutor))
    }

    #[tokio::test]
    async fn test_quiz_path() {
        let state = run(&scripted(), "What is a quiz?").await.unwrap();

        assert_eq!(
            state.steps,
            vec!["Planned", "Retrieved", "Generated Quiz", "Validated"]
        );
        assert_eq!(state.intent, Some(TutorIntent::Quiz));
        assert_eq!(state.answer.as_deref(), Some("Here is your generated quiz..."));
        assert_eq!(state.content, Some(Content::Quiz("Question 1: ...".to_string())));
    }

    #[tokio::test]
    async fn test_every_intent_takes_four_steps() {
        let cases = [
            ("Explain recursion", "Explained"),
            ("Make flashcards on Rust", "Generated Flashcards"),
            ("I need a study plan", "Generated Plan"),
            ("Quiz me", "Generated Quiz"),
        ];
        for (question, label) in cases {
            let state = run(&scripted(), question).await.unwrap();
            assert_eq!(state.steps.len(), 4, "{}", question);
            assert_eq!(state.steps[2], label);
        }
    }

    #[tokio::test]
    async fn test_default_explain_echoes_question() {
        let state = run(&scripted(), "What is LangGraph?").await.unwrap();
        assert_eq!(
            state.answer.as_deref(),
            Some("Here is a simple explanation for: What is LangGraph?")
        );
        assert!(matches!(state.content, Some(Content::Explanation(_))));
    }

    #[tokio::test]
    async fn test_retriever_sets_context() {
        let retriever = KeywordRetriever::new(vec![
            Chunk::new("Borrowing lends a reference", "book.md"),
            Chunk::new("Unrelated paragraph", "book.md"),
        ]);
        let agent = scripted().with_retriever(Arc::new(retriever));

        let state = run(&agent, "Explain borrowing").await.unwrap();
        assert!(state
            .context
            .as_deref()
            .unwrap()
            .contains("Borrowing lends a reference"));
    }

    /// Answers with an empty string for every intent
    struct SilentTutor;

    #[async_trait]
    impl Tutor for SilentTutor {
        async fn explain(&self, _input: HandlerInput<'_>) -> Result<HandlerOutput> {
            Ok(HandlerOutput {
                answer: String::new(),
                content: Content::Explanation(String::new()),
                step: labels::EXPLAINED,
            })
        }
        async fn quiz(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
            self.explain(input).await
        }
        async fn flashcards(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
            self.explain(input).await
        }
        async fn study_plan(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
            self.explain(input).await
        }
        async fn chat(&self, input: HandlerInput<'_>) -> Result<HandlerOutput> {
            self.explain(input).await
        }
    }

    #[tokio::test]
    async fn test_empty_answer_fails_validation() {
        let agent = TutoringAgent::new(Arc::new(SilentTutor));
        let err = run(&agent, "Explain this").await.unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
    }

    #[test]
    fn test_validate_requires_content() {
        let mut state: RunState<TutorIntent> = RunState::new("q");
        state.answer = Some("a".to_string());
        assert!(validate(&state).is_err());

        state.content = Some(Content::Explanation("a".to_string()));
        assert_eq!(validate(&state).unwrap().steps, vec!["Validated"]);
    }
}
