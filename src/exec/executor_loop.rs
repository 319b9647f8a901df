// src/exec/executor_loop.rs

//! Main executor loop that manages running node processes.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::ScheduledNode;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_node;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledNode>` is what `RealExecutorBackend`
/// sends dispatched nodes to. Each node runs in its own Tokio task; how many
/// run at once is decided upstream by the core runtime.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ScheduledNode> {
    let (tx, mut rx) = mpsc::channel::<ScheduledNode>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<String, JoinHandle<()>> = HashMap::new();

        while let Some(node) = rx.recv().await {
            active.retain(|_, handle| !handle.is_finished());

            if active.contains_key(&node.name) {
                warn!(node = %node.name, "node dispatched while already running; ignoring");
                continue;
            }

            let name = node.name.clone();
            let rt_tx = runtime_tx.clone();
            let handle = tokio::spawn(async move {
                let spawn_name = node.name.clone();
                run_node(node, rt_tx).await;
                debug!(node = %spawn_name, "node runner future finished");
            });
            active.insert(name, handle);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
