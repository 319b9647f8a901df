// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledNode;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::{CoreRuntime, RunReport};
use super::{CoreCommand, RuntimeEvent};

/// Drives a [`CoreRuntime`] in response to `RuntimeEvent`s, and delegates
/// actual process execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around the core, which contains all the runtime
/// semantics. The same shell (and event channel) can drive several graphs one
/// after the other.
pub struct Runtime<E: ExecutorBackend> {
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self { event_rx, executor }
    }

    /// Main event loop for one graph.
    ///
    /// - Starts the core and dispatches the first ready nodes.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them to the core.
    /// - Executes commands returned by the core until it reports that every
    ///   node is terminal.
    pub async fn run(&mut self, mut core: CoreRuntime) -> Result<RunReport> {
        info!("pipeline runtime started");

        let step = core.start();
        for command in step.commands {
            self.execute_command(command).await?;
        }
        let mut keep_running = step.keep_running;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }
            keep_running = step.keep_running;
        }

        info!("runtime exiting");
        core.into_report()
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchNodes(nodes) => {
                self.spawn_ready(nodes).await?;
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, nodes: Vec<ScheduledNode>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        debug!(?names, "spawning ready nodes");

        self.executor.spawn_ready_nodes(nodes).await
    }
}
