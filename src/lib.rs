// SPDX-License-Identifier: MIT

//! tutor-rs: a learning assistant built on a small routing graph
//!
//! - [`adk`]: errors, models, document loading and retrieval
//! - [`tutor`]: intents, run state, graphs, handlers, stores and orchestration
//! - [`server`]: HTTP API over the orchestrators

pub mod adk;
pub mod server;
pub mod tutor;

pub use adk::error::{Result, TutorError};
