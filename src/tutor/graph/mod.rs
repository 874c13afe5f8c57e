// SPDX-License-Identifier: MIT

//! Routing graph
//!
//! This module provides the directed graph that routes a request through
//! planner, optional retriever, one intent handler and the exit stage.

mod builder;
pub mod executor;
pub mod types;

pub use builder::StateGraph;
pub use executor::{CompiledGraph, RunEvent, StageRunner};
pub use types::{Edge, Stage};
