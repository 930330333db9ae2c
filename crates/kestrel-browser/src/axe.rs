use crate::{Error, Result};
use kestrel_core::model::{AccessibilityViolation, ViolationNode};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Published axe-core build loaded when no local script is configured
pub const DEFAULT_AXE_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs/axe-core/4.10.2/axe.min.js";

/// Runs the engine in-page and hands back only the violations
pub const AXE_RUN_SCRIPT: &str =
    "axe.run(document, { resultTypes: ['violations'] }).then(results => results.violations)";

/// Checks the injected engine actually defined `axe.run`
pub const AXE_READY_SCRIPT: &str =
    "typeof window.axe === 'object' && typeof window.axe.run === 'function'";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the axe-core runtime is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxeSource {
    /// A local copy of `axe.min.js`
    File(PathBuf),
    /// A published build, downloaded by Kestrel itself
    Url(String),
}

impl Default for AxeSource {
    fn default() -> Self {
        AxeSource::Url(DEFAULT_AXE_URL.to_string())
    }
}

/// The axe-core runtime source, loaded once and shared by every scan.
///
/// The text is evaluated through `Runtime.evaluate`, which the page's
/// Content-Security-Policy does not apply to, so the audited page never
/// loads a third-party script itself.
pub struct AxeEngine {
    source: AxeSource,
    client: reqwest::Client,
    script: OnceCell<Arc<str>>,
}

impl AxeEngine {
    pub fn new(source: AxeSource) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            source,
            client,
            script: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &AxeSource {
        &self.source
    }

    /// Engine source text. Loaded on first use; a failed load is retried next time.
    pub async fn script(&self) -> Result<Arc<str>> {
        self.script
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    async fn load(&self) -> Result<Arc<str>> {
        let text = match &self.source {
            AxeSource::File(path) => {
                tracing::debug!("Reading axe-core from {}", path.display());
                tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::Axe(format!("Failed to read {}: {}", path.display(), e))
                })?
            }
            AxeSource::Url(url) => {
                tracing::info!("Downloading axe-core from {}", url);
                self.fetch(url).await?
            }
        };

        if text.trim().is_empty() {
            return Err(Error::Axe("axe-core source is empty".to_string()));
        }
        Ok(Arc::from(text))
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Axe(format!("Failed to download {}: {}", url, e)))?;

        let response = response
            .error_for_status()
            .map_err(|e| Error::Axe(format!("Failed to download {}: {}", url, e)))?;

        response
            .text()
            .await
            .map_err(|e| Error::Axe(format!("Failed to read body of {}: {}", url, e)))
    }
}

/// A violation as axe-core reports it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawViolation {
    pub id: Option<String>,
    pub description: Option<String>,
    pub help: Option<String>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub impact: Option<String>,
    pub html: Option<String>,
    pub failure_summary: Option<String>,
}

impl From<RawNode> for ViolationNode {
    fn from(node: RawNode) -> Self {
        ViolationNode {
            impact: node.impact.unwrap_or_default(),
            html: node.html.unwrap_or_default(),
            failure_summary: node.failure_summary.unwrap_or_default(),
        }
    }
}

impl From<RawViolation> for AccessibilityViolation {
    fn from(violation: RawViolation) -> Self {
        AccessibilityViolation {
            id: violation.id.unwrap_or_default(),
            description: violation.description.unwrap_or_default(),
            help: violation.help.unwrap_or_default(),
            nodes: violation.nodes.into_iter().map(ViolationNode::from).collect(),
        }
    }
}

/// Normalize axe-core output, keeping rule and node order
pub fn normalize(raw: Vec<RawViolation>) -> Vec<AccessibilityViolation> {
    raw.into_iter().map(AccessibilityViolation::from).collect()
}
