//! Deterministic, pure logic of the convention engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! manifests and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod namespace;
pub mod plan;
pub mod report;
pub mod rules;
pub mod types;
