use super::lighthouse::LighthouseReport;
use crate::model::{
    Category, CategoryScores, PerformanceMetric, PerformanceMetrics, PerformanceReport,
};
use crate::{Error, Result};

/// Upper bounds (inclusive) of the GOOD and NEEDS_IMPROVEMENT buckets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub good: f64,
    pub needs_improvement: f64,
}

impl Thresholds {
    pub const fn new(good: f64, needs_improvement: f64) -> Self {
        Self {
            good,
            needs_improvement,
        }
    }

    pub fn classify(&self, value: f64) -> Category {
        if value <= self.good {
            Category::Good
        } else if value <= self.needs_improvement {
            Category::NeedsImprovement
        } else {
            Category::Poor
        }
    }
}

pub const FIRST_CONTENTFUL_PAINT: Thresholds = Thresholds::new(1800.0, 3000.0);
pub const LARGEST_CONTENTFUL_PAINT: Thresholds = Thresholds::new(2500.0, 4000.0);
pub const CUMULATIVE_LAYOUT_SHIFT: Thresholds = Thresholds::new(0.1, 0.25);
pub const INTERACTION_TO_NEXT_PAINT: Thresholds = Thresholds::new(200.0, 500.0);
pub const TIME_TO_FIRST_BYTE: Thresholds = Thresholds::new(800.0, 1800.0);

/// Lighthouse audit ids feeding each reported metric
pub const FCP_AUDIT: &str = "first-contentful-paint";
pub const LCP_AUDIT: &str = "largest-contentful-paint";
pub const CLS_AUDIT: &str = "cumulative-layout-shift";
pub const INP_AUDIT: &str = "total-blocking-time";
pub const TTFB_AUDIT: &str = "server-response-time";

/// Bucket for the overall Lighthouse performance score
pub fn overall_category(performance_score: f64) -> Category {
    if performance_score >= 0.9 {
        Category::Good
    } else if performance_score >= 0.5 {
        Category::NeedsImprovement
    } else {
        Category::Poor
    }
}

fn millis_metric(value: f64, thresholds: Thresholds) -> PerformanceMetric {
    PerformanceMetric {
        percentile_value: value.round(),
        category: thresholds.classify(value),
    }
}

/// Turns a raw Lighthouse report into the normalized performance report
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    pub fn analyze(report: &LighthouseReport) -> Result<PerformanceReport> {
        tracing::debug!("Classifying Lighthouse metrics");

        let fcp = report.numeric_value(FCP_AUDIT)?;
        let lcp = report.numeric_value(LCP_AUDIT)?;
        let cls = report.numeric_value(CLS_AUDIT)?;
        let inp = report.numeric_value(INP_AUDIT)?;
        let ttfb = report.numeric_value(TTFB_AUDIT)?;

        let category_scores = CategoryScores {
            performance: report.category_score("performance")?,
            accessibility: report.category_score("accessibility")?,
            best_practices: report.category_score("best-practices")?,
            seo: report.category_score("seo")?,
        };

        let metrics = PerformanceMetrics {
            first_contentful_paint: millis_metric(fcp, FIRST_CONTENTFUL_PAINT),
            largest_contentful_paint: millis_metric(lcp, LARGEST_CONTENTFUL_PAINT),
            cumulative_layout_shift: PerformanceMetric {
                percentile_value: cls,
                category: CUMULATIVE_LAYOUT_SHIFT.classify(cls),
            },
            interaction_to_next_paint: millis_metric(inp, INTERACTION_TO_NEXT_PAINT),
            time_to_first_byte: millis_metric(ttfb, TIME_TO_FIRST_BYTE),
        };

        let overall_category = overall_category(category_scores.performance);

        tracing::info!(
            "Performance audit classified: overall={}, score={:.2}",
            overall_category,
            category_scores.performance
        );

        Ok(PerformanceReport {
            overall_category,
            metrics,
            category_scores,
        })
    }

    /// Parse and classify a Lighthouse JSON report in one step
    pub fn analyze_json(content: &str) -> Result<PerformanceReport> {
        let report = LighthouseReport::from_str(content)
            .map_err(|e| Error::AuditUnavailable(e.to_string()))?;
        Self::analyze(&report)
    }
}
