use super::{PageScanner, PerformanceAuditor, Stage, StageFailure};
use crate::model::{AnalysisInput, AnalysisRequest, AnalysisResult, PerformanceReport};
use crate::{Error, Result};
use std::sync::Arc;

/// Everything one analysis produced, including the stages that were dropped
#[derive(Debug, Default)]
pub struct AnalysisRun {
    pub result: AnalysisResult,
    pub failures: Vec<StageFailure>,
}

impl AnalysisRun {
    fn degrade(&mut self, stage: Stage, error: Error) {
        tracing::warn!("{} stage failed, continuing without it: {}", stage, error);
        self.failures.push(StageFailure { stage, error });
    }

    pub fn failed(&self, stage: Stage) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }
}

/// Validates requests, runs the scanner and the performance audit, and merges
/// whatever they produce.
///
/// Only request validation fails the whole analysis. Every other stage
/// failure removes that stage's contribution and is recorded on the
/// [`AnalysisRun`].
#[derive(Clone)]
pub struct Orchestrator {
    scanner: Arc<dyn PageScanner>,
    auditor: Arc<dyn PerformanceAuditor>,
}

impl Orchestrator {
    pub fn new(scanner: Arc<dyn PageScanner>, auditor: Arc<dyn PerformanceAuditor>) -> Self {
        Self { scanner, auditor }
    }

    pub async fn analyse(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        Ok(self.run(request).await?.result)
    }

    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisRun> {
        let input = request.validate()?;
        tracing::info!(
            "Analysing {} input (performance audit: {})",
            input.kind(),
            request.performance_required
        );

        let mut run = AnalysisRun::default();

        self.scan(&input, &mut run).await;

        if request.performance_required {
            match self.audit(&input).await {
                Ok(report) => run.result.performance = Some(report),
                Err(e) => run.degrade(Stage::Performance, e),
            }
        }

        tracing::info!(
            "Analysis complete: {} violations, {} viewports, performance {}, {} stage(s) degraded",
            run.result.violations.len(),
            run.result.responsiveness.len(),
            if run.result.performance.is_some() { "present" } else { "absent" },
            run.failures.len()
        );

        Ok(run)
    }

    async fn scan(&self, input: &AnalysisInput, run: &mut AnalysisRun) {
        let scanner = Arc::clone(&self.scanner);
        let owned = input.clone();

        // A separate task so a panicking scanner degrades instead of taking the request down
        let joined = tokio::spawn(async move { scanner.scan(&owned).await }).await;

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return run.degrade(Stage::Scanner, e),
            Err(e) => {
                return run.degrade(
                    Stage::Scanner,
                    Error::ScanFailure(format!("scanner task aborted: {}", e)),
                );
            }
        };

        if let Err(e) = outcome.load {
            run.degrade(Stage::Load, e);
        }

        match outcome.violations {
            Ok(violations) => run.result.violations = violations,
            Err(e) => run.degrade(Stage::Accessibility, e),
        }

        run.result.responsiveness = outcome.responsiveness.results;
        if let Some(e) = outcome.responsiveness.interrupted {
            run.degrade(Stage::Responsiveness, e);
        }
    }

    async fn audit(&self, input: &AnalysisInput) -> Result<PerformanceReport> {
        let auditor = Arc::clone(&self.auditor);
        let owned = input.clone();

        tokio::spawn(async move { auditor.audit(&owned).await })
            .await
            .map_err(|e| Error::AuditUnavailable(format!("audit task aborted: {}", e)))?
    }
}
