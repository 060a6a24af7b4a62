// SPDX-License-Identifier: Apache-2.0

// polyseed - sample data for a federated PostgreSQL + MongoDB setup
// Core library

pub mod config;
pub mod engine;
pub mod federation;
pub mod fixtures;
pub mod observability;
pub mod seed;
pub mod verify;

pub use engine::{DataEngine, EngineError, EngineResult};
