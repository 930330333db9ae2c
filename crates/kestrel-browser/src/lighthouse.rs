use crate::launcher::{ChromeLauncher, STARTUP_TIMEOUT};
use crate::{ChromeFinder, Error, ProfileManager, Result};
use async_trait::async_trait;
use kestrel_core::analysis::{PerformanceAnalyzer, UrlAuditor};
use kestrel_core::model::PerformanceReport;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Lighthouse categories every audit is restricted to
pub const AUDIT_CATEGORIES: [&str; 4] = ["performance", "accessibility", "best-practices", "seo"];

#[derive(Debug, Clone)]
pub struct LighthouseOptions {
    /// Lighthouse CLI binary; looked up on `PATH` when unset
    pub lighthouse_path: Option<PathBuf>,
    pub chrome_path: Option<PathBuf>,
    pub sandbox: bool,
    /// Upper bound for a single Lighthouse run
    pub timeout: Duration,
}

impl Default for LighthouseOptions {
    fn default() -> Self {
        Self {
            lighthouse_path: None,
            chrome_path: None,
            sandbox: true,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Runs the Lighthouse CLI against a URL using a dedicated headless Chrome.
///
/// Each audit starts its own Chrome on a fresh debugging port and profile,
/// and tears both down before returning.
pub struct LighthouseRunner {
    options: LighthouseOptions,
}

impl LighthouseRunner {
    pub fn new(options: LighthouseOptions) -> Self {
        Self { options }
    }

    fn locate_lighthouse(&self) -> Result<PathBuf> {
        match &self.options.lighthouse_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(Error::Lighthouse(format!(
                "Lighthouse not found at: {}",
                path.display()
            ))),
            None => which::which("lighthouse").map_err(|_| {
                Error::Lighthouse(
                    "lighthouse command not found. Install it with `npm install -g lighthouse` or pass --lighthouse-path."
                        .to_string(),
                )
            }),
        }
    }

    /// Build Lighthouse command-line arguments
    fn build_args(url: &str, port: u16) -> Vec<String> {
        vec![
            url.to_string(),
            "--output=json".to_string(),
            "--output-path=stdout".to_string(),
            format!("--only-categories={}", AUDIT_CATEGORIES.join(",")),
            format!("--port={}", port),
            "--quiet".to_string(),
        ]
    }

    /// Run Lighthouse and return its raw JSON report
    pub async fn run(&self, url: &str) -> Result<String> {
        let lighthouse = self.locate_lighthouse()?;
        let chrome_path = ChromeFinder::new(self.options.chrome_path.clone()).find()?;
        let profile = ProfileManager::temporary()?;

        let mut chrome = ChromeLauncher::new(chrome_path, profile.path().to_path_buf())
            .with_sandbox(self.options.sandbox)
            .launch()?;

        // Chrome is killed when `chrome` drops, so early returns below still clean up
        let port = chrome.wait_until_ready(STARTUP_TIMEOUT).await?;

        tracing::info!("Running Lighthouse against {} (Chrome port {})", url, port);
        let output = tokio::time::timeout(
            self.options.timeout,
            Command::new(&lighthouse)
                .args(Self::build_args(url, port))
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        if let Err(e) = chrome.shutdown().await {
            tracing::debug!("Failed to stop audit Chrome cleanly: {}", e);
        }
        drop(profile);

        let output = output.map_err(|_| {
            Error::Timeout(self.options.timeout, format!("Lighthouse run against {}", url))
        })??;

        if !output.status.success() {
            return Err(Error::Lighthouse(format!(
                "lighthouse exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let report = String::from_utf8_lossy(&output.stdout).into_owned();
        if report.trim().is_empty() {
            return Err(Error::Lighthouse("lighthouse produced no report".to_string()));
        }

        Ok(report)
    }
}

#[async_trait]
impl UrlAuditor for LighthouseRunner {
    async fn audit_url(&self, url: &str) -> kestrel_core::Result<PerformanceReport> {
        let report = self
            .run(url)
            .await
            .map_err(|e| kestrel_core::Error::AuditUnavailable(e.to_string()))?;
        PerformanceAnalyzer::analyze_json(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::analysis::{PerformanceAuditor, SessionAuditor};
    use kestrel_core::model::AnalysisInput;
    use kestrel_core::session::SessionRegistry;

    #[test]
    fn test_lighthouse_builds_args() {
        let args = LighthouseRunner::build_args("http://127.0.0.1:4000/__session-exposure/abc", 9444);

        assert_eq!(args[0], "http://127.0.0.1:4000/__session-exposure/abc");
        assert!(args.contains(&"--output=json".to_string()));
        assert!(args.contains(&"--output-path=stdout".to_string()));
        assert!(args.contains(
            &"--only-categories=performance,accessibility,best-practices,seo".to_string()
        ));
        assert!(args.contains(&"--port=9444".to_string()));
    }

    #[test]
    fn test_missing_custom_lighthouse_path() {
        let runner = LighthouseRunner::new(LighthouseOptions {
            lighthouse_path: Some(PathBuf::from("/nonexistent/lighthouse")),
            ..LighthouseOptions::default()
        });

        let err = runner.locate_lighthouse().unwrap_err();
        assert!(err.to_string().contains("Lighthouse not found"));
    }

    #[tokio::test]
    async fn test_unavailable_tool_leaves_no_session_behind() {
        let registry = SessionRegistry::new();
        let runner = LighthouseRunner::new(LighthouseOptions {
            lighthouse_path: Some(PathBuf::from("/nonexistent/lighthouse")),
            chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
            ..LighthouseOptions::default()
        });
        let auditor = SessionAuditor::new(registry.clone(), "http://127.0.0.1:1", runner);

        let result = auditor
            .audit(&AnalysisInput::Html("<html></html>".to_string()))
            .await;

        assert!(matches!(result, Err(kestrel_core::Error::AuditUnavailable(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires Chrome, the lighthouse CLI and network access"]
    async fn test_audit_live_url() {
        let runner = LighthouseRunner::new(LighthouseOptions {
            sandbox: false,
            ..LighthouseOptions::default()
        });

        let report = runner.audit_url("https://example.com").await.unwrap();

        assert!((0.0..=1.0).contains(&report.category_scores.performance));
        assert_eq!(report.metrics.iter().count(), 5);
    }
}
