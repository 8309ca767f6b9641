use serde::Deserialize;

/// Subset of the semgrep JSON report this service consumes. Unknown
/// fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemgrepReport {
    #[serde(default)]
    pub results: Vec<Finding>,
}

/// One static-analysis result item.
#[derive(Debug, Clone, Deserialize)]
pub struct Finding {
    pub check_id: String,
    pub path: String,
    pub start: Position,
    pub end: Position,
    #[serde(default)]
    pub extra: FindingExtra,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub line: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindingExtra {
    #[serde(default)]
    pub message: String,
}

impl SemgrepReport {
    /// Parse semgrep stdout. Some failure modes emit the bare results
    /// array instead of the full report object; accept both.
    pub fn parse(stdout: &str) -> Result<Self, serde_json::Error> {
        let trimmed = stdout.trim_start();
        if trimmed.starts_with('[') {
            let results = serde_json::from_str(trimmed)?;
            return Ok(Self { results });
        }
        serde_json::from_str(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_object() {
        let report = SemgrepReport::parse(
            r#"{"results":[{"path":"a.py","start":{"line":1},"end":{"line":2},"check_id":"r1","extra":{"message":"m"}}],"errors":[]}"#,
        )
        .unwrap();
        assert_eq!(report.results.len(), 1);
        let finding = &report.results[0];
        assert_eq!(finding.check_id, "r1");
        assert_eq!(finding.path, "a.py");
        assert_eq!(finding.start.line, 1);
        assert_eq!(finding.end.line, 2);
        assert_eq!(finding.extra.message, "m");
    }

    #[test]
    fn test_parse_bare_results_array() {
        let report = SemgrepReport::parse(
            r#"[{"path":"a.py","start":{"line":1},"end":{"line":1},"check_id":"r1","extra":{"message":"m"}}]"#,
        )
        .unwrap();
        assert_eq!(report.results.len(), 1);
    }

    #[test]
    fn test_parse_empty_results() {
        let report = SemgrepReport::parse(r#"{"results":[]}"#).unwrap();
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_parse_missing_results_field() {
        let report = SemgrepReport::parse(r#"{"errors":[]}"#).unwrap();
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(SemgrepReport::parse("{not json").is_err());
        assert!(SemgrepReport::parse("").is_err());
    }
}
