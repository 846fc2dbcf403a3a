//! Report store: filesystem access to worker run artifacts
//!
//! Each completed worker run leaves a directory under the runs root
//! containing a markdown report, a findings CSV and per-vulnerability
//! markdown files. The store is read-only for the orchestration core.

use std::collections::HashMap;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::{Result, ScanError};
use crate::types::Severity;

/// Markdown report artifact written by the worker
pub const REPORT_FILE: &str = "penetration_test_report.md";

/// Findings CSV artifact written by the worker
pub const VULNERABILITIES_CSV: &str = "vulnerabilities.csv";

/// Subdirectory holding per-vulnerability markdown files
pub const VULNERABILITIES_DIR: &str = "vulnerabilities";

/// Marker line inside the report carrying the generation timestamp
const GENERATED_MARKER: &str = "**Generated:**";

/// Supported report export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    /// MIME type for the exported payload
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }

    /// File extension used in the suggested download filename
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            other => Err(ScanError::InvalidExportFormat(other.to_string())),
        }
    }
}

/// An exported report ready to hand to the transport layer
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Detail record for a single vulnerability report
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityReport {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub timestamp: String,
    pub markdown: String,
}

/// Read access to scan run artifacts on disk
pub struct ReportStore {
    runs_dir: PathBuf,
}

impl ReportStore {
    /// Create a store rooted at the runs directory
    #[must_use]
    pub fn new(runs_dir: impl Into<PathBuf>) -> Self {
        let runs_dir = runs_dir.into();
        if !runs_dir.exists() {
            log::warn!("Runs directory not found at {}", runs_dir.display());
        }
        Self { runs_dir }
    }

    /// Root directory holding one subdirectory per run
    #[must_use]
    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Full markdown report for a run
    ///
    /// # Errors
    /// [`ScanError::ReportNotFound`] if the artifact is missing.
    pub fn report_content(&self, run_name: &str) -> Result<String> {
        let path = self.runs_dir.join(run_name).join(REPORT_FILE);
        if !path.exists() {
            return Err(ScanError::report_not_found(run_name));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Whether a run directory carries the markdown report artifact
    #[must_use]
    pub fn has_report(&self, run_name: &str) -> bool {
        self.runs_dir.join(run_name).join(REPORT_FILE).exists()
    }

    /// All findings for a run, one string map per CSV row
    ///
    /// Missing or unreadable CSVs yield an empty list.
    #[must_use]
    pub fn list_vulnerabilities(&self, run_name: &str) -> Vec<HashMap<String, String>> {
        let path = self.runs_dir.join(run_name).join(VULNERABILITIES_CSV);
        let Ok(mut reader) = csv::Reader::from_path(&path) else {
            return Vec::new();
        };
        reader
            .deserialize::<HashMap<String, String>>()
            .filter_map(|row| match row {
                Ok(row) => Some(row),
                Err(e) => {
                    log::warn!("Skipping malformed CSV row in {}: {e}", path.display());
                    None
                }
            })
            .collect()
    }

    /// Number of findings recorded in the run's CSV
    #[must_use]
    pub fn finding_count(&self, run_name: &str) -> usize {
        self.list_vulnerabilities(run_name).len()
    }

    /// Detail record for one vulnerability, parsed from its markdown file
    ///
    /// # Errors
    /// [`ScanError::VulnerabilityNotFound`] if the artifact is missing.
    pub fn vulnerability_report(&self, run_name: &str, vuln_id: &str) -> Result<VulnerabilityReport> {
        let path = self
            .runs_dir
            .join(run_name)
            .join(VULNERABILITIES_DIR)
            .join(format!("{vuln_id}.md"));
        if !path.exists() {
            return Err(ScanError::vulnerability_not_found(run_name, vuln_id));
        }
        let markdown = fs::read_to_string(path)?;

        let mut title = String::new();
        let mut severity = Severity::Info;
        let mut timestamp = String::new();
        for line in markdown.lines() {
            if title.is_empty()
                && let Some(rest) = line.strip_prefix("# ")
            {
                title = rest.trim().to_string();
            } else if let Some(rest) = line.split("**Severity:**").nth(1) {
                severity = Severity::from_str(rest).unwrap_or(Severity::Info);
            } else if let Some(rest) = line.split("**Found:**").nth(1) {
                timestamp = rest.trim().to_string();
            }
        }

        Ok(VulnerabilityReport {
            id: vuln_id.to_string(),
            title,
            severity,
            timestamp,
            markdown,
        })
    }

    /// Newest-by-modification-time run subdirectory
    ///
    /// Used to attribute a just-exited worker to its artifact directory.
    /// Correct only while at most one worker is active; concurrent sessions
    /// racing this heuristic can attribute the wrong run.
    #[must_use]
    pub fn latest_run_name(&self) -> Option<String> {
        let entries = fs::read_dir(&self.runs_dir).ok()?;
        let mut newest: Option<(SystemTime, String)> = None;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            match &newest {
                Some((best, _)) if *best >= mtime => {}
                _ => newest = Some((mtime, name)),
            }
        }
        newest.map(|(_, name)| name)
    }

    /// Generation timestamp parsed from the report's marker line
    #[must_use]
    pub fn generated_at(content: &str) -> Option<DateTime<Utc>> {
        let raw = content
            .lines()
            .find_map(|line| line.split(GENERATED_MARKER).nth(1))?
            .trim();
        parse_report_timestamp(raw)
    }

    /// Export a run's report in the requested format
    ///
    /// # Errors
    /// Not-found when the backing artifact is missing; export errors when
    /// rendering fails.
    pub fn export(&self, run_name: &str, format: ExportFormat) -> Result<ExportPayload> {
        let bytes = match format {
            ExportFormat::Markdown => self.report_content(run_name)?.into_bytes(),
            ExportFormat::Json => {
                let report = self.report_content(run_name)?;
                let vulnerabilities = self.list_vulnerabilities(run_name);
                let data = json!({
                    "run_name": run_name,
                    "report": report,
                    "vulnerabilities": vulnerabilities,
                    "exported_at": Utc::now(),
                });
                serde_json::to_vec_pretty(&data)?
            }
            ExportFormat::Csv => {
                let path = self.runs_dir.join(run_name).join(VULNERABILITIES_CSV);
                if !path.exists() {
                    return Err(ScanError::report_not_found(run_name));
                }
                fs::read(path)?
            }
            ExportFormat::Pdf => {
                let report = self.report_content(run_name)?;
                render_pdf(run_name, &report)?
            }
        };

        Ok(ExportPayload {
            bytes,
            content_type: format.content_type(),
            filename: format!("{run_name}.{}", format.extension()),
        })
    }
}

/// Parse the free-text generation timestamp the worker writes
///
/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS UTC` form.
fn parse_report_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let trimmed = raw.trim_end_matches(" UTC");
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render the markdown report as a plain-text PDF with a built-in font
fn render_pdf(run_name: &str, report: &str) -> Result<Vec<u8>> {
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    const PAGE_WIDTH: f64 = 210.0;
    const PAGE_HEIGHT: f64 = 297.0;
    const MARGIN: f64 = 14.0;
    const LINE_HEIGHT: f64 = 5.0;
    const WRAP_COLUMNS: usize = 96;

    let (doc, page, layer) = PdfDocument::new(run_name, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "report");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ScanError::export(e.to_string()))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in report.lines().flat_map(|l| wrap_line(l, WRAP_COLUMNS)) {
        if y < MARGIN {
            let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "report");
            current = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT - MARGIN;
        }
        current.use_text(line, 10.0, Mm(MARGIN), Mm(y), &font);
        y -= LINE_HEIGHT;
    }

    let mut bytes = Vec::new();
    {
        let mut writer = BufWriter::new(&mut bytes);
        doc.save(&mut writer)
            .map_err(|e| ScanError::export(e.to_string()))?;
    }
    Ok(bytes)
}

/// Break a line into column-bounded chunks on char boundaries
fn wrap_line(line: &str, columns: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(columns)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
