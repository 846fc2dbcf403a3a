//! Session state structures
//!
//! Defines the data structures for one scan attempt and everything it
//! accumulates: agents, tool executions, chat messages, vulnerabilities
//! and rolling statistics.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Kind of asset a scan points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Repository,
    LocalCode,
    WebApplication,
    IpAddress,
}

impl Default for TargetType {
    fn default() -> Self {
        Self::LocalCode
    }
}

/// One scan target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Asset kind
    #[serde(rename = "type", default)]
    pub kind: TargetType,
    /// Target value (URL, path, address, ...)
    #[serde(default)]
    pub value: String,
    /// Optional subdirectory within the scan workspace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_subdir: Option<String>,
}

/// Configuration for one scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Targets handed to the worker, one `--target` flag each
    pub targets: Vec<Target>,
    /// Free-text instructions forwarded via `--instruction`
    #[serde(default)]
    pub user_instructions: String,
    /// Model selector injected into the worker environment
    #[serde(default = "ScanConfig::default_llm_model")]
    pub llm_model: String,
    /// Iteration cap passed through to the worker
    #[serde(default = "ScanConfig::default_max_iterations")]
    pub max_iterations: u32,
}

impl ScanConfig {
    pub(crate) fn default_llm_model() -> String {
        "openai/gpt-4o".to_string()
    }

    pub(crate) fn default_max_iterations() -> u32 {
        300
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            user_instructions: String::new(),
            llm_model: Self::default_llm_model(),
            max_iterations: Self::default_max_iterations(),
        }
    }
}

// ============================================================================
// Status enums
// ============================================================================

/// Lifecycle status of a scan session
///
/// Transitions are monotone along pending -> running -> terminal; a session
/// never re-enters `running` after reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl ScanStatus {
    /// Whether the status is terminal (no further transitions)
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Status of an agent within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Failed,
    WaitingForUser,
}

/// Status of one tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Completed,
    Failed,
}

/// Severity of a reported vulnerability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Lowercase wire representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "info" => Ok(Self::Info),
            _ => Err(()),
        }
    }
}

/// Tool category a worker output line is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Terminal,
    Browser,
    Python,
    Reporting,
    Thinking,
}

impl ToolKind {
    /// Lowercase wire representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Browser => "browser",
            Self::Python => "python",
            Self::Reporting => "reporting",
            Self::Thinking => "thinking",
        }
    }
}

// ============================================================================
// Session records
// ============================================================================

/// A unit of work inside a session
///
/// Currently always a single root agent per session; the id/parent-id scheme
/// supports a tree. Mutated only by the supervisor task that owns the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub task: String,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Agent {
    /// Create a new agent in the given status
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, task: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            task: task.into(),
            status: AgentStatus::Pending,
            parent_id: None,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }
}

/// One classified line of worker output
///
/// Ids form a per-session sequence starting at 1. The worker's granularity is
/// one already-finished observation per line, so executions are recorded
/// completed immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub id: u64,
    pub agent_id: String,
    pub tool_name: ToolKind,
    pub args: serde_json::Value,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One chat message in a session, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub content: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A finding synthesized from worker output, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub title: String,
    pub content: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Rolling counters for a session, monotonically non-decreasing within a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveStats {
    pub agents: u32,
    pub tools: u32,
    pub tokens: u64,
    pub cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One scan attempt and its accumulated state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub config: ScanConfig,
    pub status: ScanStatus,
    pub agents: HashMap<String, Agent>,
    /// Keyed by execution id; BTreeMap keeps snapshots ordered
    pub tool_executions: BTreeMap<u64, ToolExecution>,
    pub chat_messages: Vec<ChatMessage>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub stats: LiveStats,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Durable run identifier: the worker's artifact directory name,
    /// absent until the worker's output location is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
    /// True only for sessions synthesized from pre-existing artifacts
    #[serde(default)]
    pub is_historical: bool,
}

impl ScanSession {
    /// Create a fresh pending session
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>, config: ScanConfig) -> Self {
        Self {
            id: id.into(),
            name,
            config,
            status: ScanStatus::Pending,
            agents: HashMap::new(),
            tool_executions: BTreeMap::new(),
            chat_messages: Vec::new(),
            vulnerabilities: Vec::new(),
            stats: LiveStats::default(),
            started_at: Utc::now(),
            completed_at: None,
            run_name: None,
            is_historical: false,
        }
    }
}
