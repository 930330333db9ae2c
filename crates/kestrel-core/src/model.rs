use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Incoming analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub performance_required: bool,
}

impl AnalysisRequest {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..Self::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_performance(mut self, required: bool) -> Self {
        self.performance_required = required;
        self
    }

    /// Check that exactly one of `html` or `url` is present.
    ///
    /// Empty strings count as absent.
    pub fn validate(&self) -> Result<AnalysisInput> {
        let html = self.html.as_deref().filter(|s| !s.is_empty());
        let url = self.url.as_deref().filter(|s| !s.is_empty());

        match (html, url) {
            (Some(html), None) => Ok(AnalysisInput::Html(html.to_string())),
            (None, Some(url)) => Ok(AnalysisInput::Url(url.to_string())),
            (None, None) => Err(Error::InvalidRequest(
                "Html field or url field must be specified".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::InvalidRequest(
                "Specify either html or url field".to_string(),
            )),
        }
    }
}

/// Validated content to analyse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisInput {
    Html(String),
    Url(String),
}

impl AnalysisInput {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisInput::Html(_) => "html",
            AnalysisInput::Url(_) => "url",
        }
    }
}

/// One offending DOM element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationNode {
    pub impact: String,
    pub html: String,
    pub failure_summary: String,
}

/// A failed accessibility rule and the nodes that failed it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityViolation {
    pub id: String,
    pub description: String,
    pub help: String,
    pub nodes: Vec<ViolationNode>,
}

/// Layout measurements for a single device profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsivenessResult {
    pub viewport_name: String,
    pub has_horizontal_overflow: bool,
    pub images_oversize: bool,
}

/// Three-tier classification bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Good,
    NeedsImprovement,
    Poor,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Good => "GOOD",
            Category::NeedsImprovement => "NEEDS_IMPROVEMENT",
            Category::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub percentile_value: f64,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub first_contentful_paint: PerformanceMetric,
    pub largest_contentful_paint: PerformanceMetric,
    pub cumulative_layout_shift: PerformanceMetric,
    pub interaction_to_next_paint: PerformanceMetric,
    pub time_to_first_byte: PerformanceMetric,
}

impl PerformanceMetrics {
    /// Metrics paired with their display names, in report order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PerformanceMetric)> {
        [
            ("First Contentful Paint", &self.first_contentful_paint),
            ("Largest Contentful Paint", &self.largest_contentful_paint),
            ("Cumulative Layout Shift", &self.cumulative_layout_shift),
            ("Interaction to Next Paint", &self.interaction_to_next_paint),
            ("Time to First Byte", &self.time_to_first_byte),
        ]
        .into_iter()
    }
}

/// Lighthouse category scores, each in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub performance: f64,
    pub accessibility: f64,
    pub best_practices: f64,
    pub seo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub overall_category: Category,
    pub metrics: PerformanceMetrics,
    pub category_scores: CategoryScores,
}

/// Aggregated result returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub violations: Vec<AccessibilityViolation>,
    pub performance: Option<PerformanceReport>,
    pub responsiveness: Vec<ResponsivenessResult>,
}
