//! Domain model for scan sessions and the live event stream

pub mod events;
pub mod session;

pub use events::{EventType, ScanEvent};
pub use session::{
    Agent, AgentStatus, ChatMessage, LiveStats, ScanConfig, ScanSession, ScanStatus, Severity,
    Target, TargetType, ToolExecution, ToolKind, ToolStatus, Vulnerability,
};
