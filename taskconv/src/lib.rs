//! Convention engine for Taskfile build-automation manifests.
//!
//! Manifests are classified into structural archetypes, checked against lint
//! and format rules, and tested by running archetype-specific task phases
//! through the external task engine. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, classification, rules,
//!   namespaces, test plans). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, configuration, process
//!   execution). Isolated to enable fakes in tests.
//!
//! Orchestration modules ([`lint`], [`format`], [`orchestrate`], [`info`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod format;
pub mod info;
pub mod io;
pub mod lint;
pub mod logging;
pub mod orchestrate;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
