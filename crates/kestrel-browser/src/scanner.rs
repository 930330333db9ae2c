use crate::axe::{self, AxeEngine, AxeSource, RawViolation, AXE_READY_SCRIPT, AXE_RUN_SCRIPT};
use crate::network_idle::{NetworkIdle, NETWORK_IDLE_WINDOW};
use crate::{ChromeFinder, Error, ProfileManager, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use kestrel_core::analysis::{
    sweep, DeviceProfile, LayoutMeasurement, LayoutTarget, PageScanner, ScanOutcome,
    SweepOutcome, DEFAULT_SETTLE_DELAY, DEVICE_PROFILES, LAYOUT_MEASURE_SCRIPT,
};
use kestrel_core::model::{AccessibilityViolation, AnalysisInput};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub struct ScannerOptions {
    pub chrome_path: Option<PathBuf>,
    pub sandbox: bool,
    pub axe: AxeSource,
    /// Wait between a viewport change and its measurement
    pub settle_delay: Duration,
    /// Upper bound for loading content, running axe, and each sweep step
    pub stage_timeout: Duration,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            sandbox: true,
            axe: AxeSource::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            stage_timeout: Duration::from_secs(60),
        }
    }
}

/// Parse a URL the scanner is allowed to navigate to
pub fn validate_target_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Browser(format!("Invalid URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Browser(format!(
            "Unsupported URL scheme '{}': only http and https can be analysed",
            scheme
        ))),
    }
}

async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit, what.to_string()))?
}

async fn eval_json<T: DeserializeOwned>(page: &Page, expression: &str, await_promise: bool) -> Result<T> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(await_promise)
        .return_by_value(true)
        .build()
        .map_err(Error::Cdp)?;

    let result = page.evaluate_expression(params).await?;
    result
        .into_value::<T>()
        .map_err(|e| Error::Cdp(format!("Unexpected evaluation result: {}", e)))
}

/// A headless Chrome dedicated to one scan
struct ScanBrowser {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    _profile: ProfileManager,
}

impl ScanBrowser {
    async fn launch(options: &ScannerOptions) -> Result<Self> {
        let chrome = ChromeFinder::new(options.chrome_path.clone()).find()?;
        let profile = ProfileManager::temporary()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome)
            .new_headless_mode()
            .user_data_dir(profile.path())
            .window_size(1920, 1080)
            .request_timeout(options.stage_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(Error::Browser)?;

        tracing::debug!("Launching scanner browser");
        let (browser, mut handler) = Browser::launch(config).await?;

        // The handler must be polled for any page command to complete
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e.into());
            }
        };

        Ok(Self {
            browser,
            page,
            handler,
            _profile: profile,
        })
    }

    async fn close(mut self) {
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            self.browser.close().await?;
            self.browser.wait().await?;
            Ok::<_, Error>(())
        })
        .await;

        match closed {
            Ok(Ok(())) => tracing::debug!("Scanner browser closed"),
            Ok(Err(e)) => tracing::debug!("Scanner browser close failed, killing on drop: {}", e),
            Err(_) => tracing::debug!("Scanner browser did not close in time, killing on drop"),
        }
    }
}

impl Drop for ScanBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Desktop-mode metrics at the profile's size. Mobile emulation would give
/// the page a 980px layout viewport and hide narrow-screen overflow.
fn viewport_override(profile: &DeviceProfile) -> Result<SetDeviceMetricsOverrideParams> {
    SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(profile.width))
        .height(i64::from(profile.height))
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(Error::Cdp)
}

/// Resizes and measures a live page for the responsiveness sweep
struct PageLayout<'a> {
    page: &'a Page,
    timeout: Duration,
}

#[async_trait]
impl<'a> LayoutTarget for PageLayout<'a> {
    async fn resize(&self, profile: &DeviceProfile) -> kestrel_core::Result<()> {
        let params = viewport_override(profile)?;

        with_timeout(self.timeout, "viewport resize", async {
            self.page.execute(params).await?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn measure(&self) -> kestrel_core::Result<LayoutMeasurement> {
        let measurement = with_timeout(
            self.timeout,
            "layout measurement",
            eval_json::<LayoutMeasurement>(self.page, LAYOUT_MEASURE_SCRIPT, false),
        )
        .await?;
        Ok(measurement)
    }
}

/// Scans pages with axe-core and the responsiveness sweep in a fresh
/// headless Chrome per call
pub struct ChromeScanner {
    options: ScannerOptions,
    axe: AxeEngine,
}

impl ChromeScanner {
    pub fn new(options: ScannerOptions) -> Self {
        let axe = AxeEngine::new(options.axe.clone());
        Self { options, axe }
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    async fn load(&self, page: &Page, input: &AnalysisInput) -> Result<()> {
        let network = NetworkIdle::watch(page).await?;

        match input {
            AnalysisInput::Html(html) => {
                tracing::debug!("Setting page content ({} bytes)", html.len());
                page.set_content(html).await?;
            }
            AnalysisInput::Url(raw) => {
                let url = validate_target_url(raw)?;
                tracing::debug!("Navigating to {}", url);
                page.goto(url.as_str()).await?;
            }
        }

        network.wait(NETWORK_IDLE_WINDOW).await
    }

    async fn run_axe(&self, page: &Page) -> Result<Vec<AccessibilityViolation>> {
        let source = self.axe.script().await?;
        let params = EvaluateParams::builder()
            .expression(source.as_ref())
            .build()
            .map_err(Error::Cdp)?;
        page.evaluate_expression(params).await?;

        let ready: bool = eval_json(page, AXE_READY_SCRIPT, false).await?;
        if !ready {
            return Err(Error::Axe("engine source did not define axe.run".to_string()));
        }

        let raw: Vec<RawViolation> = eval_json(page, AXE_RUN_SCRIPT, true).await?;
        tracing::debug!("axe-core reported {} violations", raw.len());
        Ok(axe::normalize(raw))
    }

    async fn scan_page(&self, page: &Page, input: &AnalysisInput) -> ScanOutcome {
        let limit = self.options.stage_timeout;

        let load = with_timeout(limit, "content load", self.load(page, input))
            .await
            .map_err(|e| kestrel_core::Error::LoadFailure(e.to_string()));

        if load.is_err() {
            // Auditing whatever half-loaded or blank document is left would report on the wrong page
            return ScanOutcome {
                load,
                violations: Err(kestrel_core::Error::ScanFailure(
                    "skipped because the content did not load".to_string(),
                )),
                responsiveness: SweepOutcome::default(),
            };
        }

        let violations = with_timeout(limit, "accessibility scan", self.run_axe(page))
            .await
            .map_err(|e| kestrel_core::Error::ScanFailure(e.to_string()));

        let target = PageLayout {
            page,
            timeout: limit,
        };
        let responsiveness = sweep(&target, &DEVICE_PROFILES, self.options.settle_delay).await;

        ScanOutcome {
            load,
            violations,
            responsiveness,
        }
    }
}

#[async_trait]
impl PageScanner for ChromeScanner {
    async fn scan(&self, input: &AnalysisInput) -> kestrel_core::Result<ScanOutcome> {
        let browser = ScanBrowser::launch(&self.options).await?;
        let outcome = self.scan_page(&browser.page, input).await;
        browser.close().await;
        Ok(outcome)
    }
}
