//! Output classification for raw worker lines
//!
//! The worker speaks free-form text, not a structured protocol. Classification
//! is a coarse first-match substring heuristic, kept behind a trait so it can
//! be swapped for a structured decoder without touching supervision logic.

use crate::types::ToolKind;

/// Title used for every vulnerability synthesized from an output line.
/// The classifier does not attempt to extract a precise title from free text.
pub const DETECTED_VULNERABILITY_TITLE: &str = "Potential Vulnerability Detected";

/// Strategy for mapping one line of worker output to a tool category and
/// an optional vulnerability signal
pub trait OutputClassifier: Send + Sync {
    /// Classify one line into a tool category, first match wins
    fn classify(&self, line: &str) -> ToolKind;

    /// Whether the line should produce a vulnerability record
    fn is_vulnerability_signal(&self, line: &str) -> bool;
}

/// Default case-insensitive substring classifier
///
/// Priority: browser terms, then interpreter terms, then vulnerability/CVE
/// terms, then reasoning terms, with `terminal` as the fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternClassifier;

impl OutputClassifier for PatternClassifier {
    fn classify(&self, line: &str) -> ToolKind {
        let lower = line.to_lowercase();
        if lower.contains("browser") || lower.contains("http") {
            ToolKind::Browser
        } else if lower.contains("python") {
            ToolKind::Python
        } else if lower.contains("vulnerability") || lower.contains("vuln") || lower.contains("cve-")
        {
            ToolKind::Reporting
        } else if lower.contains("thinking") || lower.contains("analyzing") {
            ToolKind::Thinking
        } else {
            ToolKind::Terminal
        }
    }

    fn is_vulnerability_signal(&self, line: &str) -> bool {
        line.to_uppercase().contains("VULNERABILITY") || line.contains("CVE-")
    }
}
