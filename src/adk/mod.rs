// SPDX-License-Identifier: MIT

pub mod error;
pub mod loader;
pub mod model;
pub mod retriever;
