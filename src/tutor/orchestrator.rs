// SPDX-License-Identifier: MIT

//! Orchestrator
//!
//! Drives one request through a compiled graph. With a session id and a
//! checkpoint store, the run holds the session lock, resumes from the last
//! snapshot and records a new turn once it succeeds. A failed run leaves the
//! checkpoint untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::adk::error::{Result, TutorError};
use crate::tutor::checkpoint::{
    load_snapshot, save_snapshot, CheckpointStore, SessionLocks, SessionSnapshot,
};
use crate::tutor::graph::{CompiledGraph, RunEvent, StageRunner};
use crate::tutor::intent::Intent;
use crate::tutor::state::RunState;

/// A user request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub question: String,
    /// Document text retrieved by the caller
    #[serde(default)]
    pub context: Option<String>,
}

impl Request {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// What a run hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: Intent")]
pub struct RunOutput<I: Intent> {
    pub answer: String,
    pub steps: Vec<String>,
    pub intent: I,
}

impl<I: Intent> RunOutput<I> {
    fn from_state(state: &RunState<I>) -> Result<Self> {
        let answer = state
            .answer
            .clone()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| TutorError::Validation("run finished without an answer".to_string()))?;
        let intent = state
            .intent
            .ok_or_else(|| TutorError::Validation("run finished without an intent".to_string()))?;
        Ok(Self {
            answer,
            steps: state.steps.clone(),
            intent,
        })
    }
}

struct Sessions {
    store: Arc<dyn CheckpointStore>,
    locks: Arc<SessionLocks>,
}

/// Runs requests through one graph variant
pub struct Orchestrator<I: Intent> {
    graph: CompiledGraph<I>,
    runner: Arc<dyn StageRunner<I>>,
    sessions: Option<Sessions>,
}

impl<I: Intent> Orchestrator<I> {
    pub fn new(graph: CompiledGraph<I>, runner: Arc<dyn StageRunner<I>>) -> Self {
        Self {
            graph,
            runner,
            sessions: None,
        }
    }

    /// Persist runs that carry a session id
    pub fn with_checkpoints(
        mut self,
        store: Arc<dyn CheckpointStore>,
        locks: Arc<SessionLocks>,
    ) -> Self {
        self.sessions = Some(Sessions { store, locks });
        self
    }

    pub async fn run(&self, request: Request, session_id: Option<&str>) -> Result<RunOutput<I>> {
        self.execute(request, session_id, None).await
    }

    /// Like [`Orchestrator::run`], reporting progress on `tx` and finishing
    /// with an `Answer` or `Error` event. A checkpointed run opens with a
    /// `Session` event.
    pub async fn run_stream(
        &self,
        request: Request,
        session_id: Option<&str>,
        tx: mpsc::Sender<RunEvent>,
    ) -> Result<RunOutput<I>> {
        if let (Some(session_id), Some(_)) = (session_id, &self.sessions) {
            let _ = tx
                .send(RunEvent::Session {
                    session_id: session_id.to_string(),
                })
                .await;
        }
        let result = self.execute(request, session_id, Some(&tx)).await;
        let event = match &result {
            Ok(output) => RunEvent::Answer {
                answer: output.answer.clone(),
                steps: output.steps.clone(),
            },
            Err(e) => RunEvent::Error {
                message: e.to_string(),
            },
        };
        let _ = tx.send(event).await;
        result
    }

    /// The stored snapshot for `session_id`, if any
    pub async fn session(&self, session_id: &str) -> Result<Option<SessionSnapshot<I>>> {
        match &self.sessions {
            Some(sessions) => load_snapshot(sessions.store.as_ref(), session_id).await,
            None => Ok(None),
        }
    }

    async fn execute(
        &self,
        request: Request,
        session_id: Option<&str>,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunOutput<I>> {
        let (Some(session_id), Some(sessions)) = (session_id, &self.sessions) else {
            let state = RunState::new(request.question).with_context(request.context);
            let state = self
                .graph
                .invoke_with_events(self.runner.as_ref(), state, events)
                .await?;
            return RunOutput::from_state(&state);
        };

        let _guard = sessions.locks.lock(session_id).await;
        let previous: Option<SessionSnapshot<I>> =
            load_snapshot(sessions.store.as_ref(), session_id).await?;
        log::info!(
            "Session {}: {} previous turns",
            session_id,
            previous.as_ref().map_or(0, |p| p.turns.len())
        );

        let state = match &previous {
            Some(snapshot) => RunState::resume(&snapshot.state, request.question),
            None => RunState::new(request.question),
        }
        .with_context(request.context);

        let state = self
            .graph
            .invoke_with_events(self.runner.as_ref(), state, events)
            .await?;
        let output = RunOutput::from_state(&state)?;

        let snapshot = SessionSnapshot::record(previous, session_id, state);
        save_snapshot(sessions.store.as_ref(), &snapshot).await?;
        Ok(output)
    }
}
