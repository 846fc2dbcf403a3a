//! Distribution events delivered live to session subscribers
//!
//! Events are the only channel through which subscribers learn of state
//! changes. They are never persisted, only fanned out while the session is
//! being observed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::session::{LiveStats, ScanConfig, ScanSession, Severity, ToolKind};

/// Tag identifying the payload shape of a [`ScanEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScanStarted,
    ScanCompleted,
    AgentCreated,
    AgentStatusChanged,
    ToolExecutionStart,
    ToolExecutionComplete,
    ChatMessage,
    VulnerabilityFound,
    StatsUpdate,
    /// Synthetic full-state snapshot sent once to each new subscriber
    InitialState,
}

/// A tagged notification of one session state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    fn new(event_type: EventType, data: Value) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Scan began supervision
    #[must_use]
    pub fn scan_started(scan_id: &str, config: &ScanConfig) -> Self {
        Self::new(
            EventType::ScanStarted,
            json!({
                "scan_id": scan_id,
                "config": serde_json::to_value(config).unwrap_or(Value::Null),
            }),
        )
    }

    /// Scan reached a terminal state
    #[must_use]
    pub fn scan_completed(scan_id: &str, success: bool, result: &str) -> Self {
        Self::new(
            EventType::ScanCompleted,
            json!({
                "scan_id": scan_id,
                "success": success,
                "result": result,
            }),
        )
    }

    /// A new agent joined the session
    #[must_use]
    pub fn agent_created(agent_id: &str, name: &str, task: &str, parent_id: Option<&str>) -> Self {
        Self::new(
            EventType::AgentCreated,
            json!({
                "agent_id": agent_id,
                "name": name,
                "task": task,
                "parent_id": parent_id,
            }),
        )
    }

    /// An agent changed status
    #[must_use]
    pub fn agent_status_changed(
        agent_id: &str,
        status: &str,
        error_message: Option<&str>,
    ) -> Self {
        Self::new(
            EventType::AgentStatusChanged,
            json!({
                "agent_id": agent_id,
                "status": status,
                "error_message": error_message,
            }),
        )
    }

    /// A tool execution was observed
    #[must_use]
    pub fn tool_execution_start(
        execution_id: u64,
        agent_id: &str,
        tool_name: ToolKind,
        args: Value,
    ) -> Self {
        Self::new(
            EventType::ToolExecutionStart,
            json!({
                "execution_id": execution_id,
                "agent_id": agent_id,
                "tool_name": tool_name.as_str(),
                "args": args,
            }),
        )
    }

    /// A tool execution finished
    #[must_use]
    pub fn tool_execution_complete(execution_id: u64, status: &str, result: &str) -> Self {
        Self::new(
            EventType::ToolExecutionComplete,
            json!({
                "execution_id": execution_id,
                "status": status,
                "result": result,
            }),
        )
    }

    /// A chat message was appended to the session
    #[must_use]
    pub fn chat_message(
        message_id: u64,
        content: &str,
        role: &str,
        agent_id: Option<&str>,
    ) -> Self {
        Self::new(
            EventType::ChatMessage,
            json!({
                "message_id": message_id,
                "content": content,
                "role": role,
                "agent_id": agent_id,
            }),
        )
    }

    /// A vulnerability was detected in the output stream
    #[must_use]
    pub fn vulnerability_found(
        vuln_id: &str,
        title: &str,
        severity: Severity,
        content: &str,
    ) -> Self {
        Self::new(
            EventType::VulnerabilityFound,
            json!({
                "id": vuln_id,
                "title": title,
                "severity": severity.as_str(),
                "content": content,
            }),
        )
    }

    /// Rolling counters changed
    #[must_use]
    pub fn stats_update(stats: &LiveStats) -> Self {
        Self::new(
            EventType::StatsUpdate,
            json!({
                "agents": stats.agents,
                "tools": stats.tools,
                "tokens": stats.tokens,
                "cost": stats.cost,
            }),
        )
    }

    /// Full current-state snapshot for a subscriber that just joined
    #[must_use]
    pub fn initial_state(session: &ScanSession) -> Self {
        Self::new(
            EventType::InitialState,
            json!({
                "id": session.id,
                "status": session.status,
                "agents": serde_json::to_value(&session.agents).unwrap_or(Value::Null),
                "tool_executions":
                    serde_json::to_value(&session.tool_executions).unwrap_or(Value::Null),
                "vulnerabilities":
                    serde_json::to_value(&session.vulnerabilities).unwrap_or(Value::Null),
                "stats": serde_json::to_value(&session.stats).unwrap_or(Value::Null),
            }),
        )
    }
}
