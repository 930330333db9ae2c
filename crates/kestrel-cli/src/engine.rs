use clap::Args;
use kestrel_browser::{AxeSource, ChromeScanner, LighthouseOptions, LighthouseRunner, ScannerOptions};
use kestrel_core::analysis::{Orchestrator, SessionAuditor};
use kestrel_core::session::SessionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Browser and audit-tool settings shared by `serve` and `analyze`
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Path to the Chrome/Chromium binary (auto-detected when omitted)
    #[arg(long, env = "KESTREL_CHROME_PATH", value_name = "PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Path to the Lighthouse CLI (looked up on PATH when omitted)
    #[arg(long, env = "KESTREL_LIGHTHOUSE_PATH", value_name = "PATH")]
    pub lighthouse_path: Option<PathBuf>,

    /// Local axe-core script to inject instead of downloading it
    #[arg(long, env = "KESTREL_AXE_SCRIPT", value_name = "FILE", conflicts_with = "axe_url")]
    pub axe_script: Option<PathBuf>,

    /// URL axe-core is downloaded from, once per process
    #[arg(long, env = "KESTREL_AXE_URL", value_name = "URL")]
    pub axe_url: Option<String>,

    /// Milliseconds to wait after each viewport change before measuring
    #[arg(long, env = "KESTREL_SETTLE_MS", default_value_t = 200, value_name = "MS")]
    pub settle_ms: u64,

    /// Upper bound in seconds for loading, the axe run, and the Lighthouse run
    #[arg(long, env = "KESTREL_STAGE_TIMEOUT", default_value_t = 60, value_name = "SECONDS")]
    pub stage_timeout: u64,

    /// Launch Chrome with --no-sandbox (needed in most containers)
    #[arg(long, env = "KESTREL_NO_SANDBOX")]
    pub no_sandbox: bool,
}

impl Default for EngineArgs {
    fn default() -> Self {
        Self {
            chrome_path: None,
            lighthouse_path: None,
            axe_script: None,
            axe_url: None,
            settle_ms: 200,
            stage_timeout: 60,
            no_sandbox: false,
        }
    }
}

impl EngineArgs {
    pub fn axe_source(&self) -> AxeSource {
        match (&self.axe_script, &self.axe_url) {
            (Some(path), _) => AxeSource::File(path.clone()),
            (None, Some(url)) => AxeSource::Url(url.clone()),
            (None, None) => AxeSource::default(),
        }
    }

    pub fn scanner_options(&self) -> ScannerOptions {
        ScannerOptions {
            chrome_path: self.chrome_path.clone(),
            sandbox: !self.no_sandbox,
            axe: self.axe_source(),
            settle_delay: Duration::from_millis(self.settle_ms),
            stage_timeout: Duration::from_secs(self.stage_timeout),
        }
    }

    pub fn lighthouse_options(&self) -> LighthouseOptions {
        LighthouseOptions {
            lighthouse_path: self.lighthouse_path.clone(),
            chrome_path: self.chrome_path.clone(),
            sandbox: !self.no_sandbox,
            timeout: Duration::from_secs(self.stage_timeout),
        }
    }

    /// Wire the Chrome scanner and a session-backed Lighthouse auditor.
    ///
    /// `base_url` must reach a server exposing `registry`.
    pub fn orchestrator(&self, registry: SessionRegistry, base_url: &str) -> Orchestrator {
        tracing::debug!("Building analysis engine (exposure base: {})", base_url);
        let scanner = ChromeScanner::new(self.scanner_options());
        let auditor = SessionAuditor::new(
            registry,
            base_url,
            LighthouseRunner::new(self.lighthouse_options()),
        );
        Orchestrator::new(Arc::new(scanner), Arc::new(auditor))
    }
}
