use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use petbrainprep::dag::ScheduledNode;
use petbrainprep::engine::RuntimeEvent;
use petbrainprep::errors::{FailureReason, Result, ToolFailure};
use petbrainprep::exec::ExecutorBackend;

/// What a [`FakeExecutor`] saw, shared with the test body.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    dispatched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ExecutionLog {
    /// Node names in dispatch order.
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    /// Highest number of nodes that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// A fake executor that:
/// - records which nodes were dispatched, and how many overlapped
/// - completes each node after a short delay, without running the tool
/// - optionally creates the declared output files, so artifacts can be
///   delivered afterwards
/// - fails the nodes it was told to fail with a non-zero exit.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    log: Arc<ExecutionLog>,
    failing: HashSet<String>,
    touch_outputs: bool,
    delay: Duration,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            log: Arc::new(ExecutionLog::default()),
            failing: HashSet::new(),
            touch_outputs: false,
            delay: Duration::from_millis(5),
        }
    }

    pub fn failing(mut self, node: &str) -> Self {
        self.failing.insert(node.to_string());
        self
    }

    pub fn touching_outputs(mut self) -> Self {
        self.touch_outputs = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn log(&self) -> Arc<ExecutionLog> {
        Arc::clone(&self.log)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_nodes(
        &mut self,
        nodes: Vec<ScheduledNode>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for node in nodes {
                self.log.dispatched.lock().unwrap().push(node.name.clone());
                let now = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.log.max_in_flight.fetch_max(now, Ordering::SeqCst);

                let tx = self.runtime_tx.clone();
                let log = Arc::clone(&self.log);
                let fail = self.failing.contains(&node.name);
                let touch = self.touch_outputs;
                let delay = self.delay;

                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;

                    let result = if fail {
                        Err(ToolFailure::new(
                            &node.invocation.program,
                            node.invocation.command_line(),
                            FailureReason::NonZeroExit(1),
                        ))
                    } else {
                        if touch {
                            for path in node.invocation.outputs.values() {
                                if let Some(parent) = path.parent() {
                                    std::fs::create_dir_all(parent).unwrap();
                                }
                                std::fs::write(path, b"fake").unwrap();
                            }
                        }
                        Ok(node.invocation.outputs.clone())
                    };

                    log.in_flight.fetch_sub(1, Ordering::SeqCst);
                    let _ = tx
                        .send(RuntimeEvent::NodeCompleted {
                            node: node.name,
                            result,
                        })
                        .await;
                });
            }
            Ok(())
        })
    }
}
