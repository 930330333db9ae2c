pub mod lighthouse;
mod exposure;
mod orchestrator;
mod performance;
mod responsive;

pub use exposure::SessionAuditor;
pub use lighthouse::LighthouseReport;
pub use orchestrator::{AnalysisRun, Orchestrator};
pub use performance::{
    overall_category, PerformanceAnalyzer, Thresholds, CUMULATIVE_LAYOUT_SHIFT,
    FIRST_CONTENTFUL_PAINT, INTERACTION_TO_NEXT_PAINT, LARGEST_CONTENTFUL_PAINT,
    TIME_TO_FIRST_BYTE,
};
pub use responsive::{
    sweep, DeviceProfile, LayoutMeasurement, LayoutTarget, SweepOutcome, DEFAULT_SETTLE_DELAY,
    DEVICE_PROFILES, LAYOUT_MEASURE_SCRIPT,
};

use crate::model::{AccessibilityViolation, AnalysisInput, PerformanceReport};
use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt;

/// The audit stages a request passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Starting the scanning browser at all
    Scanner,
    Load,
    Accessibility,
    Responsiveness,
    Performance,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scanner => "scanner",
            Stage::Load => "load",
            Stage::Accessibility => "accessibility",
            Stage::Responsiveness => "responsiveness",
            Stage::Performance => "performance",
        };
        f.write_str(name)
    }
}

/// A stage that failed and whose contribution was dropped from the result
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: Error,
}

/// Per-stage results of one scanner run
#[derive(Debug)]
pub struct ScanOutcome {
    pub load: Result<()>,
    pub violations: Result<Vec<AccessibilityViolation>>,
    pub responsiveness: SweepOutcome,
}

/// Loads content in a browser, runs the accessibility engine and the
/// responsiveness sweep.
///
/// Stage failures belong in the [`ScanOutcome`]; an `Err` means the scanner
/// could not run at all.
#[async_trait]
pub trait PageScanner: Send + Sync {
    async fn scan(&self, input: &AnalysisInput) -> Result<ScanOutcome>;
}

/// Runs a performance audit against a navigable URL
#[async_trait]
pub trait UrlAuditor: Send + Sync {
    async fn audit_url(&self, url: &str) -> Result<PerformanceReport>;
}

/// Runs a performance audit against either kind of input
#[async_trait]
pub trait PerformanceAuditor: Send + Sync {
    async fn audit(&self, input: &AnalysisInput) -> Result<PerformanceReport>;
}
