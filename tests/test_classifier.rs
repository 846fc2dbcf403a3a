use strix_dashboard::{DETECTED_VULNERABILITY_TITLE, OutputClassifier, PatternClassifier, ToolKind};

#[test]
fn test_browser_terms_win_first() {
    let classifier = PatternClassifier;
    assert_eq!(classifier.classify("Opening browser session"), ToolKind::Browser);
    assert_eq!(classifier.classify("GET http://example.com/login"), ToolKind::Browser);
    // Browser terms outrank later categories on the same line
    assert_eq!(
        classifier.classify("browser found a vulnerability"),
        ToolKind::Browser
    );
}

#[test]
fn test_interpreter_terms() {
    let classifier = PatternClassifier;
    assert_eq!(classifier.classify("Running python exploit.py"), ToolKind::Python);
    assert_eq!(classifier.classify("PYTHON traceback follows"), ToolKind::Python);
}

#[test]
fn test_vulnerability_terms() {
    let classifier = PatternClassifier;
    assert_eq!(classifier.classify("Vulnerability confirmed"), ToolKind::Reporting);
    assert_eq!(classifier.classify("found a vuln in the login form"), ToolKind::Reporting);
}

#[test]
fn test_reasoning_terms() {
    let classifier = PatternClassifier;
    assert_eq!(classifier.classify("Thinking about next step"), ToolKind::Thinking);
    assert_eq!(classifier.classify("analyzing response headers"), ToolKind::Thinking);
}

#[test]
fn test_fallback_is_terminal() {
    let classifier = PatternClassifier;
    assert_eq!(classifier.classify("ls -la /tmp"), ToolKind::Terminal);
    assert_eq!(classifier.classify(""), ToolKind::Terminal);
}

#[test]
fn test_cve_line_is_reporting_and_signals() {
    let classifier = PatternClassifier;
    let line = "Confirmed CVE-2023-12345 in target";
    assert_eq!(classifier.classify(line), ToolKind::Reporting);
    assert!(classifier.is_vulnerability_signal(line));
}

#[test]
fn test_vulnerability_signal_detection() {
    let classifier = PatternClassifier;
    assert!(classifier.is_vulnerability_signal("VULNERABILITY: SQL injection"));
    assert!(classifier.is_vulnerability_signal("vulnerability found in login"));
    assert!(classifier.is_vulnerability_signal("see CVE-2021-44228"));
    assert!(!classifier.is_vulnerability_signal("scanning directory"));
    // Lowercase "cve-" is not the CVE- pattern
    assert!(!classifier.is_vulnerability_signal("cve-like identifier"));
}

#[test]
fn test_detected_title_is_generic() {
    // The classifier never extracts a title from free text
    assert_eq!(DETECTED_VULNERABILITY_TITLE, "Potential Vulnerability Detected");
}
