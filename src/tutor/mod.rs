// SPDX-License-Identifier: MIT

//! The learning assistant
//!
//! A question is classified into an intent, optionally enriched with context,
//! handled by exactly one handler and converged to the end of the graph.
//! [`tutoring`] and [`memory`] are the two graph variants; [`orchestrator`]
//! runs them.

pub mod app;
pub mod checkpoint;
pub mod config;
pub mod evaluation;
pub mod facts;
pub mod graph;
pub mod intent;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod skills;
pub mod state;
pub mod tutoring;

pub use app::AppContext;
pub use intent::{Intent, MemoryIntent, TutorIntent};
pub use orchestrator::{Orchestrator, Request, RunOutput};
