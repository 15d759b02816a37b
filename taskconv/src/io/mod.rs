//! Side-effecting operations: filesystem, configuration, and the task engine.
//!
//! Everything that touches the outside world lives here so the `core` modules
//! stay pure and orchestration can be tested with fakes.

pub mod config;
pub mod discover;
pub mod manifest_store;
pub mod process;
pub mod resolver;
pub mod task_runner;
