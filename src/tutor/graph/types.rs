// SPDX-License-Identifier: MIT

//! Graph type definitions

use std::collections::HashMap;
use std::fmt;

use crate::tutor::intent::Intent;

/// A stage of the routing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage<I: Intent> {
    /// Virtual entry point, never executed
    Start,
    /// Classifies the question (and loads memories in the memory graph)
    Planner,
    /// Fetches document context for the question
    Retriever,
    /// The handler for one intent
    Handle(I),
    /// Checks the handler's output
    Validate,
    /// Virtual exit point, never executed
    End,
}

impl<I: Intent> Stage<I> {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Planner => "planner",
            Stage::Retriever => "retriever",
            Stage::Handle(intent) => intent.as_str(),
            Stage::Validate => "validate",
            Stage::End => "end",
        }
    }

    /// Whether the executor runs this stage (start and end are markers)
    pub fn is_executable(&self) -> bool {
        !matches!(self, Stage::Start | Stage::End)
    }
}

impl<I: Intent> fmt::Display for Stage<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outgoing edges of a stage
#[derive(Debug, Clone, PartialEq)]
pub enum Edge<I: Intent> {
    /// Unconditional transition
    To(Stage<I>),
    /// Branch on the classified intent
    ByIntent(HashMap<I, Stage<I>>),
}

impl<I: Intent> Edge<I> {
    /// Every stage this edge can lead to
    pub fn targets(&self) -> Vec<Stage<I>> {
        match self {
            Edge::To(stage) => vec![*stage],
            Edge::ByIntent(branches) => {
                // Follow ALL order so traversal is deterministic
                I::ALL
                    .iter()
                    .filter_map(|intent| branches.get(intent).copied())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::intent::{MemoryIntent, TutorIntent};

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::<TutorIntent>::Planner.name(), "planner");
        assert_eq!(Stage::Handle(TutorIntent::StudyPlan).name(), "study_plan");
        assert_eq!(Stage::Handle(MemoryIntent::SaveMemory).to_string(), "save_memory");
    }

    #[test]
    fn test_executable() {
        assert!(!Stage::<MemoryIntent>::Start.is_executable());
        assert!(!Stage::<MemoryIntent>::End.is_executable());
        assert!(Stage::<MemoryIntent>::Planner.is_executable());
    }

    #[test]
    fn test_edge_targets_in_intent_order() {
        let branches: HashMap<_, _> = [
            (MemoryIntent::SaveMemory, Stage::Handle(MemoryIntent::SaveMemory)),
            (MemoryIntent::Chat, Stage::Handle(MemoryIntent::Chat)),
        ]
        .into_iter()
        .collect();
        let edge = Edge::ByIntent(branches);
        assert_eq!(
            edge.targets(),
            vec![
                Stage::Handle(MemoryIntent::Chat),
                Stage::Handle(MemoryIntent::SaveMemory)
            ]
        );
        assert_eq!(Edge::<MemoryIntent>::To(Stage::End).targets(), vec![Stage::End]);
    }
}
