// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the external tools of the
//! pipeline, using `tokio::process::Command`, and reporting back to the
//! orchestration runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the main executor loop which spawns one Tokio
//!   task per dispatched node.
//! - [`task_runner`] runs a single [`crate::adapters::Invocation`] and checks
//!   its inputs, exit status, stderr and outputs.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use task_runner::execute_invocation;
