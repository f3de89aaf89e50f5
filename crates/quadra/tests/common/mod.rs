//! Shared test utilities for quadra integration tests.
//!
//! This module provides:
//! - `TestHarness` with an isolated store and orchestrator
//! - Builders for the documents the pipeline ingests

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
