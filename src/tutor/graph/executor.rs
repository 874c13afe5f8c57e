// SPDX-License-Identifier: MIT

//! Graph executor
//!
//! Walks a compiled graph from start to end, one stage at a time, folding each
//! stage's [`StateUpdate`] into the run state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

use super::types::{Edge, Stage};
use crate::adk::error::{GraphError, Result};
use crate::tutor::intent::Intent;
use crate::tutor::state::{RunState, StateUpdate};

/// Progress events emitted while a run executes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// The session this run is checkpointed under; sent first
    Session { session_id: String },
    /// A stage finished; `steps` is the trace so far
    StageCompleted { stage: String, steps: Vec<String> },
    /// The run finished
    Answer { answer: String, steps: Vec<String> },
    /// The run failed
    Error { message: String },
}

/// Executes the stages of one graph variant
#[async_trait]
pub trait StageRunner<I: Intent>: Send + Sync {
    /// Run `stage` against the accumulated state and return its delta.
    /// Never called with [`Stage::Start`] or [`Stage::End`].
    async fn run_stage(&self, stage: Stage<I>, state: &RunState<I>) -> Result<StateUpdate<I>>;
}

/// A validated graph, ready to run
#[derive(Debug, Clone)]
pub struct CompiledGraph<I: Intent> {
    edges: HashMap<Stage<I>, Edge<I>>,
    max_steps: usize,
}

impl<I: Intent> CompiledGraph<I> {
    pub(super) fn new(edges: HashMap<Stage<I>, Edge<I>>, max_steps: usize) -> Self {
        Self { edges, max_steps }
    }

    /// Pick the stage after `from`
    pub fn next(&self, from: Stage<I>, state: &RunState<I>) -> Result<Stage<I>> {
        let edge = self.edges.get(&from).ok_or_else(|| {
            GraphError::InvalidEdge(format!("stage '{}' has no outgoing edges", from))
        })?;

        match edge {
            Edge::To(to) => Ok(*to),
            Edge::ByIntent(branches) => {
                let intent = state
                    .intent
                    .ok_or_else(|| GraphError::IntentUnset(from.to_string()))?;
                branches.get(&intent).copied().ok_or_else(|| {
                    GraphError::NoBranch {
                        from: from.to_string(),
                        intent: intent.as_str().to_string(),
                    }
                    .into()
                })
            }
        }
    }

    /// Run to completion
    pub async fn invoke(
        &self,
        runner: &dyn StageRunner<I>,
        state: RunState<I>,
    ) -> Result<RunState<I>> {
        self.invoke_with_events(runner, state, None).await
    }

    /// Run to completion, reporting each finished stage on `events`
    pub async fn invoke_with_events(
        &self,
        runner: &dyn StageRunner<I>,
        mut state: RunState<I>,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunState<I>> {
        let mut current = Stage::Start;
        let mut visited = 0;

        loop {
            let next = self.next(current, &state)?;
            if next == Stage::End {
                break;
            }

            visited += 1;
            if visited > self.max_steps {
                log::error!("Graph execution exceeded {} steps", self.max_steps);
                return Err(GraphError::StepLimit(self.max_steps).into());
            }

            log::info!("Executing stage: {}", next);
            let update = runner.run_stage(next, &state).await.map_err(|e| {
                log::error!("Stage {} failed: {}", next, e);
                e
            })?;
            state.apply(update);

            if let Some(tx) = events {
                // A dropped receiver must not abort the run
                let _ = tx
                    .send(RunEvent::StageCompleted {
                        stage: next.to_string(),
                        steps: state.steps.clone(),
                    })
                    .await;
            }

            current = next;
        }

        log::info!("Run finished after {} stages: {:?}", visited, state.steps);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::TutorError;
    use crate::tutor::graph::builder::StateGraph;
    use crate::tutor::intent::MemoryIntent;
    use std::sync::Mutex;

    /// Records every stage it is asked to run
    struct RecordingRunner {
        intent: MemoryIntent,
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingRunner {
        fn new(intent: MemoryIntent) -> Self {
            Self {
                intent,
                seen: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl StageRunner<MemoryIntent> for RecordingRunner {
        async fn run_stage(
            &self,
            stage: Stage<MemoryIntent>,
            _state: &RunState<MemoryIntent>,
        ) -> Result<StateUpdate<MemoryIntent>> {
            self.seen.lock().unwrap().push(stage.to_string());
            if self.fail_on == Some(stage.name()) {
                return Err(TutorError::other("boom"));
            }
            let update = StateUpdate::step(stage.name());
            Ok(match stage {
                Stage::Planner => update.with_intent(self.intent),
                _ => update,
            })
        }
    }

    fn graph() -> CompiledGraph<MemoryIntent> {
        let mut graph = StateGraph::new();
        graph
            .add_edge(Stage::Start, Stage::Planner)
            .unwrap()
            .add_conditional_edges(
                Stage::Planner,
                MemoryIntent::ALL.iter().map(|i| (*i, Stage::Handle(*i))),
            )
            .unwrap()
            .add_edge(Stage::Handle(MemoryIntent::Chat), Stage::Validate)
            .unwrap()
            .add_edge(Stage::Handle(MemoryIntent::SaveMemory), Stage::Validate)
            .unwrap()
            .add_edge(Stage::Validate, Stage::End)
            .unwrap();
        graph.compile().unwrap()
    }

    #[tokio::test]
    async fn test_routes_by_intent() {
        let runner = RecordingRunner::new(MemoryIntent::SaveMemory);
        let state = graph()
            .invoke(&runner, RunState::new("save this"))
            .await
            .unwrap();

        assert_eq!(state.steps, vec!["planner", "save_memory", "validate"]);
        assert_eq!(*runner.seen.lock().unwrap(), state.steps);
    }

    #[tokio::test]
    async fn test_failed_stage_aborts_run() {
        let mut runner = RecordingRunner::new(MemoryIntent::Chat);
        runner.fail_on = Some("chat");

        let result = graph().invoke(&runner, RunState::new("hi")).await;
        assert!(result.is_err());
        // Validation never ran
        assert_eq!(*runner.seen.lock().unwrap(), vec!["planner", "chat"]);
    }

    #[tokio::test]
    async fn test_events_emitted_per_stage() {
        let runner = RecordingRunner::new(MemoryIntent::Chat);
        let (tx, mut rx) = mpsc::channel(16);

        graph()
            .invoke_with_events(&runner, RunState::new("hi"), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut stages = Vec::new();
        while let Some(event) = rx.recv().await {
            if let RunEvent::StageCompleted { stage, steps } = event {
                assert_eq!(steps.last(), Some(&stage));
                stages.push(stage);
            }
        }
        assert_eq!(stages, vec!["planner", "chat", "validate"]);
    }

    #[test]
    fn test_next_without_intent() {
        let state: RunState<MemoryIntent> = RunState::new("hi");
        let err = graph().next(Stage::Planner, &state).unwrap_err();
        assert!(matches!(
            err,
            TutorError::Graph(GraphError::IntentUnset(ref s)) if s == "planner"
        ));
    }

    #[test]
    fn test_next_missing_branch_is_error() {
        let mut edges = HashMap::new();
        edges.insert(Stage::Start, Edge::To(Stage::Planner));
        edges.insert(Stage::Planner, Edge::ByIntent(HashMap::new()));
        let graph = CompiledGraph::new(edges, 4);

        let mut state: RunState<MemoryIntent> = RunState::new("hi");
        state.intent = Some(MemoryIntent::Chat);
        let err = graph.next(Stage::Planner, &state).unwrap_err();
        assert!(matches!(err, TutorError::Graph(GraphError::NoBranch { .. })));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let mut edges = HashMap::new();
        edges.insert(Stage::Start, Edge::To(Stage::Planner));
        edges.insert(Stage::Planner, Edge::To(Stage::Planner));
        let graph = CompiledGraph::new(edges, 3);

        let runner = RecordingRunner::new(MemoryIntent::Chat);
        let err = graph
            .invoke(&runner, RunState::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Graph(GraphError::StepLimit(3))));
    }
}
