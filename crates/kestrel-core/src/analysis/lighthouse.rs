use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The subset of a Lighthouse JSON report Kestrel reads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseReport {
    #[serde(default)]
    pub lighthouse_version: Option<String>,
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub runtime_error: Option<RuntimeError>,
    #[serde(default)]
    pub audits: HashMap<String, AuditResult>,
    #[serde(default)]
    pub categories: HashMap<String, CategoryResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    #[serde(default)]
    pub numeric_value: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryResult {
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl LighthouseReport {
    /// Parse a report from the JSON Lighthouse writes with `--output=json`
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let report: LighthouseReport = serde_json::from_str(content)?;

        tracing::debug!(
            "Parsed Lighthouse {} report with {} audits",
            report.lighthouse_version.as_deref().unwrap_or("unknown"),
            report.audits.len()
        );

        Ok(report)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// `numericValue` of an audit, failing if Lighthouse did not produce it
    pub fn numeric_value(&self, audit_id: &str) -> Result<f64> {
        self.audits
            .get(audit_id)
            .and_then(|audit| audit.numeric_value)
            .ok_or_else(|| self.missing(format!("audit '{}' has no numeric value", audit_id)))
    }

    /// Score of a category, failing if it was not scored
    pub fn category_score(&self, category: &str) -> Result<f64> {
        self.categories
            .get(category)
            .and_then(|c| c.score)
            .ok_or_else(|| self.missing(format!("category '{}' has no score", category)))
    }

    fn missing(&self, what: String) -> Error {
        match &self.runtime_error {
            Some(err) => Error::AuditUnavailable(format!(
                "{} (Lighthouse runtime error {}: {})",
                what, err.code, err.message
            )),
            None => Error::AuditUnavailable(what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn test_parse_fixture_report() {
        let report = LighthouseReport::from_file(&fixture("lighthouse-report.json")).unwrap();

        assert_eq!(report.lighthouse_version.as_deref(), Some("12.2.1"));
        assert_eq!(
            report.numeric_value("first-contentful-paint").unwrap(),
            812.4395
        );
        assert_eq!(report.category_score("best-practices").unwrap(), 0.96);
    }

    #[test]
    fn test_null_score_is_missing() {
        let report = LighthouseReport::from_str(
            r#"{"audits": {}, "categories": {"performance": {"score": null}}}"#,
        )
        .unwrap();

        assert!(report.category_score("performance").is_err());
    }

    #[test]
    fn test_runtime_error_is_reported() {
        let report = LighthouseReport::from_str(
            r#"{
                "runtimeError": {"code": "NO_FCP", "message": "The page did not paint any content."},
                "audits": {"first-contentful-paint": {"numericValue": null}}
            }"#,
        )
        .unwrap();

        let err = report.numeric_value("first-contentful-paint").unwrap_err();
        assert!(err.to_string().contains("NO_FCP"));
    }
}
