// src/exec/task_runner.rs

//! Individual node process runner.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::adapters::{Invocation, StderrPolicy};
use crate::dag::ScheduledNode;
use crate::engine::RuntimeEvent;
use crate::errors::{FailureReason, ToolFailure};

/// Run a dispatched node and report its `NodeCompleted` event.
pub async fn run_node(node: ScheduledNode, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let result = execute_invocation(&node.name, &node.invocation).await;

    if runtime_tx
        .send(RuntimeEvent::NodeCompleted {
            node: node.name.clone(),
            result,
        })
        .await
        .is_err()
    {
        error!(node = %node.name, "runtime channel closed; completion lost");
    }
}

/// Run one external tool invocation to completion.
///
/// Fails, with the captured output attached, when:
/// - a required input does not exist (the process is never spawned)
/// - the process cannot be spawned, exits non-zero or is killed
/// - it wrote to stderr and the invocation's policy is [`StderrPolicy::Fail`]
/// - a declared output is missing afterwards
///
/// On success returns the declared outputs.
pub async fn execute_invocation(
    node: &str,
    inv: &Invocation,
) -> Result<BTreeMap<String, PathBuf>, ToolFailure> {
    let command_line = inv.command_line();
    let fail = |reason: FailureReason| ToolFailure::new(&inv.program, &command_line, reason);

    for input in &inv.inputs {
        if !input.exists() {
            return Err(fail(FailureReason::MissingInput(input.clone())));
        }
    }

    tokio::fs::create_dir_all(&inv.working_dir)
        .await
        .map_err(|e| {
            fail(FailureReason::Spawn(format!(
                "creating working directory {}: {e}",
                inv.working_dir.display()
            )))
        })?;

    info!(node = %node, cmd = %command_line, "starting tool process");

    let mut cmd = Command::new(&inv.program);
    cmd.args(&inv.args)
        .envs(inv.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&inv.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| fail(FailureReason::Spawn(format!("spawning {}: {e}", inv.program))))?;

    // Always consume both streams so buffers don't fill; log at debug.
    let stdout = child.stdout.take().map(|s| collect_lines(s, node.to_string(), "stdout"));
    let stderr = child.stderr.take().map(|s| collect_lines(s, node.to_string(), "stderr"));

    let status = child.wait().await;

    let stdout = join_output(stdout).await;
    let stderr = join_output(stderr).await;

    let status = status.map_err(|e| {
        fail(FailureReason::Spawn(format!("waiting for {}: {e}", inv.program)))
            .with_output(stdout.clone(), stderr.clone())
    })?;

    info!(
        node = %node,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "tool process exited"
    );

    if !status.success() {
        let reason = match status.code() {
            Some(code) => FailureReason::NonZeroExit(code),
            None => FailureReason::Terminated,
        };
        return Err(fail(reason).with_output(stdout, stderr));
    }

    if inv.stderr_policy == StderrPolicy::Fail && !stderr.is_empty() {
        return Err(fail(FailureReason::StderrNotEmpty).with_output(stdout, stderr));
    }

    for (slot, path) in &inv.outputs {
        if !path.exists() {
            return Err(fail(FailureReason::MissingOutput {
                slot: slot.clone(),
                path: path.clone(),
            })
            .with_output(stdout, stderr));
        }
    }

    Ok(inv.outputs.clone())
}

fn collect_lines<R>(stream: R, node: String, label: &'static str) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut captured = Vec::new();
        let mut line = Vec::new();

        // Raw bytes until EOF: tools may print non-UTF-8 diagnostics.
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    debug!(node = %node, "{label}: {}", text.trim_end());
                    captured.extend_from_slice(&line);
                }
                Err(e) => {
                    debug!(node = %node, error = %e, "{label}: read failed");
                    break;
                }
            }
        }

        String::from_utf8_lossy(&captured).into_owned()
    })
}

async fn join_output(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(h) => h.await.unwrap_or_default(),
        None => String::new(),
    }
}
