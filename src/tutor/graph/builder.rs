// SPDX-License-Identifier: MIT

//! Graph builder
//!
//! Edges are declared one stage at a time and checked as a whole by
//! [`StateGraph::compile`], which rejects graphs that could fail at run time:
//! no entry, uncovered intents, dead ends, cycles, unreachable stages.

use std::collections::{HashMap, HashSet};

use super::executor::CompiledGraph;
use super::types::{Edge, Stage};
use crate::adk::error::GraphError;
use crate::tutor::intent::Intent;

/// Graph under construction
pub struct StateGraph<I: Intent> {
    edges: HashMap<Stage<I>, Edge<I>>,
    /// Declaration order, for deterministic checks and error messages
    order: Vec<Stage<I>>,
}

impl<I: Intent> StateGraph<I> {
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Unconditional transition `from -> to`
    pub fn add_edge(&mut self, from: Stage<I>, to: Stage<I>) -> Result<&mut Self, GraphError> {
        self.insert(from, Edge::To(to))?;
        Ok(self)
    }

    /// Branch out of `from` on the classified intent
    pub fn add_conditional_edges(
        &mut self,
        from: Stage<I>,
        branches: impl IntoIterator<Item = (I, Stage<I>)>,
    ) -> Result<&mut Self, GraphError> {
        self.insert(from, Edge::ByIntent(branches.into_iter().collect()))?;
        Ok(self)
    }

    fn insert(&mut self, from: Stage<I>, edge: Edge<I>) -> Result<(), GraphError> {
        if from == Stage::End {
            return Err(GraphError::InvalidEdge("end has no outgoing edges".to_string()));
        }
        if edge.targets().contains(&Stage::Start) {
            return Err(GraphError::InvalidEdge(format!(
                "edge from '{}' into start",
                from
            )));
        }
        if self.edges.contains_key(&from) {
            return Err(GraphError::DuplicateEdge(from.to_string()));
        }
        self.edges.insert(from, edge);
        self.order.push(from);
        Ok(())
    }

    /// Validate the graph and freeze it for execution
    pub fn compile(self) -> Result<CompiledGraph<I>, GraphError> {
        if !self.edges.contains_key(&Stage::Start) {
            return Err(GraphError::MissingEntry);
        }

        for from in &self.order {
            let edge = &self.edges[from];

            if let Edge::ByIntent(branches) = edge {
                if let Some(intent) = I::ALL.iter().find(|i| !branches.contains_key(*i)) {
                    return Err(GraphError::MissingBranch {
                        from: from.to_string(),
                        intent: intent.as_str().to_string(),
                    });
                }
            }

            for target in edge.targets() {
                if target != Stage::End && !self.edges.contains_key(&target) {
                    return Err(GraphError::InvalidEdge(format!(
                        "stage '{}' has no outgoing edges",
                        target
                    )));
                }
            }
        }

        let mut visited = HashSet::new();
        let mut path = Vec::new();
        self.visit(Stage::Start, &mut visited, &mut path)?;

        if let Some(orphan) = self.order.iter().find(|s| !visited.contains(*s)) {
            return Err(GraphError::Unreachable(orphan.to_string()));
        }

        // Every path is acyclic, so no run can visit more stages than exist
        let max_steps = self.order.len();
        Ok(CompiledGraph::new(self.edges, max_steps))
    }

    /// Depth-first walk from `stage`, failing on a back edge
    fn visit(
        &self,
        stage: Stage<I>,
        visited: &mut HashSet<Stage<I>>,
        path: &mut Vec<Stage<I>>,
    ) -> Result<(), GraphError> {
        if let Some(pos) = path.iter().position(|s| *s == stage) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
            cycle.push(stage.to_string());
            return Err(GraphError::CircularDependency(cycle));
        }
        if !visited.insert(stage) {
            return Ok(());
        }

        let Some(edge) = self.edges.get(&stage) else {
            return Ok(());
        };

        path.push(stage);
        for target in edge.targets() {
            self.visit(target, visited, path)?;
        }
        path.pop();
        Ok(())
    }
}

impl<I: Intent> Default for StateGraph<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::intent::{MemoryIntent, TutorIntent};

    fn memory_graph() -> StateGraph<MemoryIntent> {
        let mut graph = StateGraph::new();
        graph
            .add_edge(Stage::Start, Stage::Planner)
            .unwrap()
            .add_conditional_edges(
                Stage::Planner,
                MemoryIntent::ALL.iter().map(|i| (*i, Stage::Handle(*i))),
            )
            .unwrap()
            .add_edge(Stage::Handle(MemoryIntent::Chat), Stage::End)
            .unwrap()
            .add_edge(Stage::Handle(MemoryIntent::SaveMemory), Stage::End)
            .unwrap();
        graph
    }

    #[test]
    fn test_compile_valid_graph() {
        assert!(memory_graph().compile().is_ok());
    }

    #[test]
    fn test_missing_entry() {
        let mut graph: StateGraph<MemoryIntent> = StateGraph::new();
        graph.add_edge(Stage::Planner, Stage::End).unwrap();
        assert_eq!(graph.compile().err(), Some(GraphError::MissingEntry));
    }

    #[test]
    fn test_duplicate_edge() {
        let mut graph = memory_graph();
        let err = graph.add_edge(Stage::Planner, Stage::End).err();
        assert_eq!(err, Some(GraphError::DuplicateEdge("planner".to_string())));
    }

    #[test]
    fn test_edges_into_start_or_out_of_end_rejected() {
        let mut graph: StateGraph<MemoryIntent> = StateGraph::new();
        assert!(matches!(
            graph.add_edge(Stage::Planner, Stage::Start),
            Err(GraphError::InvalidEdge(_))
        ));
        assert!(matches!(
            graph.add_edge(Stage::End, Stage::Planner),
            Err(GraphError::InvalidEdge(_))
        ));
    }

    #[test]
    fn test_uncovered_intent_rejected() {
        let mut graph: StateGraph<TutorIntent> = StateGraph::new();
        graph
            .add_edge(Stage::Start, Stage::Planner)
            .unwrap()
            .add_conditional_edges(
                Stage::Planner,
                [
                    (TutorIntent::Explain, Stage::Handle(TutorIntent::Explain)),
                    (TutorIntent::Quiz, Stage::Handle(TutorIntent::Quiz)),
                ],
            )
            .unwrap()
            .add_edge(Stage::Handle(TutorIntent::Explain), Stage::End)
            .unwrap()
            .add_edge(Stage::Handle(TutorIntent::Quiz), Stage::End)
            .unwrap();

        assert_eq!(
            graph.compile().err(),
            Some(GraphError::MissingBranch {
                from: "planner".to_string(),
                intent: "flashcards".to_string(),
            })
        );
    }

    #[test]
    fn test_dead_end_rejected() {
        let mut graph: StateGraph<MemoryIntent> = StateGraph::new();
        graph.add_edge(Stage::Start, Stage::Planner).unwrap();
        assert!(matches!(graph.compile(), Err(GraphError::InvalidEdge(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph: StateGraph<MemoryIntent> = StateGraph::new();
        graph
            .add_edge(Stage::Start, Stage::Planner)
            .unwrap()
            .add_edge(Stage::Planner, Stage::Validate)
            .unwrap()
            .add_edge(Stage::Validate, Stage::Planner)
            .unwrap();

        assert_eq!(
            graph.compile().err(),
            Some(GraphError::CircularDependency(vec![
                "planner".to_string(),
                "validate".to_string(),
                "planner".to_string(),
            ]))
        );
    }

    #[test]
    fn test_unreachable_rejected() {
        let mut graph = memory_graph();
        graph.add_edge(Stage::Retriever, Stage::End).unwrap();
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::Unreachable("retriever".to_string()))
        );
    }
}
