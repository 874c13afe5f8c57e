// SPDX-License-Identifier: MIT

//! Memory graph
//!
//! `Start -> Planner -(intent)-> Handle(i) -> End`
//!
//! The planner reads what the fact store knows about the user before
//! classifying, so the chat handler can use it. `save_memory` writes to the
//! same store.

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::error::{GraphError, Result};
use crate::tutor::facts::{extract_fact, FactStore};
use crate::tutor::graph::{CompiledGraph, Stage, StageRunner, StateGraph};
use crate::tutor::intent::{Intent, MemoryIntent};
use crate::tutor::skills::Tutor;
use crate::tutor::state::{labels, Content, HandlerOutput, RunState, StateUpdate};

/// Build and compile the memory graph
pub fn memory_graph() -> std::result::Result<CompiledGraph<MemoryIntent>, GraphError> {
    let mut graph = StateGraph::new();
    graph.add_edge(Stage::Start, Stage::Planner)?.add_conditional_edges(
        Stage::Planner,
        MemoryIntent::ALL.iter().map(|i| (*i, Stage::Handle(*i))),
    )?;
    for intent in MemoryIntent::ALL {
        graph.add_edge(Stage::Handle(*intent), Stage::End)?;
    }
    graph.compile()
}

/// Runs the stages of the memory graph
pub struct MemoryAgent {
    tutor: Arc<dyn Tutor>,
    facts: Arc<FactStore>,
}

impl MemoryAgent {
    pub fn new(tutor: Arc<dyn Tutor>, facts: Arc<FactStore>) -> Self {
        Self { tutor, facts }
    }

    async fn plan(&self, state: &RunState<MemoryIntent>) -> StateUpdate<MemoryIntent> {
        let memories = self.facts.relevant_facts(&state.question).await;
        let intent = MemoryIntent::classify(&state.question);
        log::info!(
            "Planner: intent -> {} | memories: {}",
            intent.as_str(),
            memories.len()
        );
        StateUpdate::step(labels::PLANNED)
            .with_intent(intent)
            .with_memories(memories)
    }

    async fn save_memory(&self, state: &RunState<MemoryIntent>) -> Result<HandlerOutput> {
        let fact = extract_fact(&state.question);
        self.facts.save_fact(&fact).await?;
        Ok(HandlerOutput {
            answer: format!("I've remembered that: {}", fact),
            content: Content::SavedFact(fact),
            step: labels::SAVED_MEMORY,
        })
    }
}

#[async_trait]
impl StageRunner<MemoryIntent> for MemoryAgent {
    async fn run_stage(
        &self,
        stage: Stage<MemoryIntent>,
        state: &RunState<MemoryIntent>,
    ) -> Result<StateUpdate<MemoryIntent>> {
        let output = match stage {
            Stage::Planner => return Ok(self.plan(state).await),
            Stage::Handle(MemoryIntent::Chat) => self.tutor.chat(state.handler_input()).await?,
            Stage::Handle(MemoryIntent::SaveMemory) => self.save_memory(state).await?,
            Stage::Start | Stage::End | Stage::Retriever | Stage::Validate => {
                return Err(GraphError::InvalidEdge(format!(
                    "stage '{}' is not part of the memory graph",
                    stage
                ))
                .into())
            }
        };
        log::info!("Handler {}: {}", stage, output.step);
        Ok(output.into_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::skills::ScriptedTutor;

    async fn agent(dir: &tempfile::TempDir) -> MemoryAgent {
        let facts = FactStore::open(dir.path().join("profile.json")).await.unwrap();
        MemoryAgent::new(Arc::new(ScriptedTutor), Arc::new(facts))
    }

    async fn run(agent: &MemoryAgent, question: &str) -> RunState<MemoryIntent> {
        memory_graph()
            .unwrap()
            .invoke(agent, RunState::new(question))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_chat_path_without_memories() {
        let dir = tempfile::tempdir().unwrap();
        let state = run(&agent(&dir).await, "Hello there").await;

        assert_eq!(state.steps, vec!["Planned", "Chatted"]);
        assert_eq!(
            state.answer.as_deref(),
            Some("I don't know much about you yet. Responding to: Hello there")
        );
    }

    #[tokio::test]
    async fn test_save_then_chat() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir).await;

        let saved = run(&agent, "Please remember that I like Rust").await;
        assert_eq!(saved.steps, vec!["Planned", "Saved Memory"]);
        assert_eq!(
            saved.answer.as_deref(),
            Some("I've remembered that: I like Rust")
        );
        assert_eq!(saved.content, Some(Content::SavedFact("I like Rust".to_string())));

        let chatted = run(&agent, "What should I learn next?").await;
        assert_eq!(chatted.memories, vec!["I like Rust"]);
        assert_eq!(
            chatted.answer.as_deref(),
            Some("Based on what I know about you:\n- I like Rust\n\nResponding to: What should I learn next?")
        );
    }

    #[tokio::test]
    async fn test_my_name_is_saved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir).await;

        let state = run(&agent, "My name is Ada").await;
        assert_eq!(state.intent, Some(MemoryIntent::SaveMemory));
        assert_eq!(agent.facts.facts().await, vec!["My name is Ada"]);
    }

    #[tokio::test]
    async fn test_retriever_stage_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(&dir).await;
        let state = RunState::new("hi");
        assert!(agent.run_stage(Stage::Retriever, &state).await.is_err());
    }
}
