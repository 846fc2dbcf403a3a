//! Per-session supervision loop
//!
//! One task per session: spawns the worker, streams its merged output
//! line-by-line through the classifier, mutates the owning session and emits
//! one distribution event per state change. Cancellation deterministically
//! terminates the child and still performs the terminal state transition.

use chrono::Utc;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::classifier::DETECTED_VULNERABILITY_TITLE;
use crate::types::{
    Agent, AgentStatus, ScanEvent, ScanStatus, Severity, ToolExecution, ToolStatus, Vulnerability,
};

use super::command::{build_worker_command, resolve_worker};
use super::RunContext;

/// Display name of the root agent for every scan
const ROOT_AGENT_NAME: &str = "Strix Agent";

/// Task description of the root agent
const ROOT_AGENT_TASK: &str = "Security Scan";

/// Argument snapshots keep at most this many characters of a line
const ARG_SNIPPET_CHARS: usize = 200;

/// How a supervision attempt ended short of a clean worker exit
enum End {
    Cancelled,
    Failed(String),
}

/// Drive one session from `running` to a terminal state
pub(super) async fn run_scan(ctx: RunContext) {
    let Some(session) = ctx.registry.get(&ctx.scan_id).await else {
        return;
    };

    ctx.registry
        .update(&ctx.scan_id, |s| s.status = ScanStatus::Running)
        .await;
    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::scan_started(&ctx.scan_id, &session.config),
    );

    match supervise(&ctx).await {
        Ok((exit_code, agent_id)) => finish(&ctx, exit_code, &agent_id).await,
        Err(End::Cancelled) => {
            log::info!("[{}] scan cancelled", ctx.scan_id);
            let now = Utc::now();
            ctx.registry
                .update(&ctx.scan_id, |s| {
                    s.status = ScanStatus::Stopped;
                    if s.completed_at.is_none() {
                        s.completed_at = Some(now);
                    }
                })
                .await;
            ctx.distributor.publish(
                &ctx.scan_id,
                ScanEvent::scan_completed(&ctx.scan_id, false, "Scan cancelled"),
            );
        }
        Err(End::Failed(message)) => {
            log::error!("[{}] scan failed: {message}", ctx.scan_id);
            fail(&ctx, &message).await;
        }
    }
}

/// Resolve, spawn and stream the worker; returns its exit code and the root
/// agent id
async fn supervise(ctx: &RunContext) -> Result<(i32, String), End> {
    let session = ctx
        .registry
        .get(&ctx.scan_id)
        .await
        .ok_or_else(|| End::Failed(format!("Scan not found: {}", ctx.scan_id)))?;

    let worker = match &ctx.worker_path {
        Some(path) => path.clone(),
        None => resolve_worker().map_err(|e| End::Failed(e.to_string()))?,
    };
    let mut cmd = build_worker_command(&worker, &session.config, &ctx.workdir);

    // Root agent exists before the worker so its id is available for every
    // classified line.
    let agent_id = format!("agent-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let mut agent = Agent::new(&agent_id, ROOT_AGENT_NAME, ROOT_AGENT_TASK);
    agent.status = AgentStatus::Running;
    ctx.registry
        .update(&ctx.scan_id, |s| {
            s.agents.insert(agent_id.clone(), agent);
            s.stats.agents = s.agents.len() as u32;
        })
        .await;
    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::agent_created(&agent_id, ROOT_AGENT_NAME, ROOT_AGENT_TASK, None),
    );

    let mut child = cmd
        .spawn()
        .map_err(|e| End::Failed(format!("Failed to spawn scan worker: {e}")))?;

    // stderr is folded into the same line stream as stdout; the worker's
    // output format does not distinguish them.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(End::Cancelled);
            }
            line = line_rx.recv() => {
                match line {
                    Some(line) => process_line(ctx, &agent_id, &line).await,
                    None => break,
                }
            }
        }
    }

    let status = tokio::select! {
        _ = ctx.cancel.cancelled() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(End::Cancelled);
        }
        status = child.wait() => {
            status.map_err(|e| End::Failed(format!("Failed to await scan worker: {e}")))?
        }
    };

    Ok((status.code().unwrap_or(-1), agent_id))
}

/// Forward one output stream into the merged line channel
fn spawn_line_reader<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

/// Classify one line and fold it into session state and the event stream
async fn process_line(ctx: &RunContext, agent_id: &str, raw: &str) {
    let line = raw.trim();
    if line.is_empty() {
        return;
    }

    let execution_id = ctx.registry.next_execution_id(&ctx.scan_id).await;
    let tool_name = ctx.classifier.classify(line);
    let snippet: String = line.chars().take(ARG_SNIPPET_CHARS).collect();
    let now = Utc::now();

    let execution = ToolExecution {
        id: execution_id,
        agent_id: agent_id.to_string(),
        tool_name,
        args: json!({ "command": snippet }),
        status: ToolStatus::Completed,
        result: Some(line.to_string()),
        started_at: now,
        completed_at: Some(now),
    };
    let stats = ctx
        .registry
        .update(&ctx.scan_id, |s| {
            s.tool_executions.insert(execution_id, execution);
            s.stats.tools = s.tool_executions.len() as u32;
            s.stats.clone()
        })
        .await;

    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::tool_execution_start(
            execution_id,
            agent_id,
            tool_name,
            json!({ "output": snippet }),
        ),
    );
    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::tool_execution_complete(execution_id, "completed", line),
    );
    if let Some(stats) = stats {
        ctx.distributor
            .publish(&ctx.scan_id, ScanEvent::stats_update(&stats));
    }

    if ctx.classifier.is_vulnerability_signal(line) {
        let vuln_id = format!("vuln-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let vulnerability = Vulnerability {
            id: vuln_id.clone(),
            title: DETECTED_VULNERABILITY_TITLE.to_string(),
            content: line.to_string(),
            severity: Severity::Medium,
            timestamp: Utc::now(),
        };
        ctx.registry
            .update(&ctx.scan_id, |s| s.vulnerabilities.push(vulnerability))
            .await;
        ctx.distributor.publish(
            &ctx.scan_id,
            ScanEvent::vulnerability_found(
                &vuln_id,
                DETECTED_VULNERABILITY_TITLE,
                Severity::Medium,
                line,
            ),
        );
    }
}

/// Terminal handling for a worker that exited on its own
async fn finish(ctx: &RunContext, exit_code: i32, agent_id: &str) {
    // Attribute the newest artifact directory to this session. Unsound when
    // several workers run concurrently; see latest_run_name.
    if let Some(run_name) = ctx.reports.latest_run_name() {
        ctx.registry
            .update(&ctx.scan_id, |s| s.run_name = Some(run_name.clone()))
            .await;
        ctx.mappings.add(&ctx.scan_id, &run_name, None);
    }

    ctx.registry
        .update(&ctx.scan_id, |s| {
            if let Some(agent) = s.agents.get_mut(agent_id) {
                agent.status = AgentStatus::Completed;
                agent.updated_at = Utc::now();
            }
        })
        .await;
    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::agent_status_changed(agent_id, "completed", None),
    );

    let success = exit_code == 0;
    ctx.registry
        .update(&ctx.scan_id, |s| {
            s.status = if success {
                ScanStatus::Completed
            } else {
                ScanStatus::Failed
            };
            s.completed_at = Some(Utc::now());
        })
        .await;
    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::scan_completed(&ctx.scan_id, success, &format!("Exit code: {exit_code}")),
    );
}

/// Terminal handling for spawn or stream errors
///
/// Agents flip to failed before the terminal event so nothing is delivered
/// after session completion.
async fn fail(ctx: &RunContext, message: &str) {
    let flipped = ctx
        .registry
        .update(&ctx.scan_id, |s| {
            let mut flipped = Vec::new();
            for (id, agent) in &mut s.agents {
                if agent.status == AgentStatus::Running {
                    agent.status = AgentStatus::Failed;
                    agent.error_message = Some(message.to_string());
                    agent.updated_at = Utc::now();
                    flipped.push(id.clone());
                }
            }
            flipped
        })
        .await
        .unwrap_or_default();
    for agent_id in flipped {
        ctx.distributor.publish(
            &ctx.scan_id,
            ScanEvent::agent_status_changed(&agent_id, "failed", Some(message)),
        );
    }

    ctx.registry
        .update(&ctx.scan_id, |s| {
            s.status = ScanStatus::Failed;
            s.completed_at = Some(Utc::now());
        })
        .await;
    ctx.distributor.publish(
        &ctx.scan_id,
        ScanEvent::scan_completed(&ctx.scan_id, false, message),
    );
}
