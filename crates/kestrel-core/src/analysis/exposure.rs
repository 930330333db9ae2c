use super::{PerformanceAuditor, UrlAuditor};
use crate::model::{AnalysisInput, PerformanceReport};
use crate::session::SessionRegistry;
use crate::Result;
use async_trait::async_trait;

/// Makes raw HTML auditable by publishing it in the session registry for the
/// duration of the audit. URLs are audited directly.
pub struct SessionAuditor<A> {
    registry: SessionRegistry,
    base_url: String,
    inner: A,
}

impl<A: UrlAuditor> SessionAuditor<A> {
    /// `base_url` is the loopback address serving the exposure endpoint
    pub fn new(registry: SessionRegistry, base_url: impl Into<String>, inner: A) -> Self {
        Self {
            registry,
            base_url: base_url.into(),
            inner,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Audit raw HTML through a leased session
    pub async fn audit_html(&self, html: &str) -> Result<PerformanceReport> {
        let lease = self.registry.lease(html);
        let url = lease.url(&self.base_url);
        tracing::info!("Auditing performance of session {}", lease.id());

        // The lease revokes the session when it goes out of scope, on every path
        self.inner.audit_url(&url).await
    }
}

#[async_trait]
impl<A: UrlAuditor> PerformanceAuditor for SessionAuditor<A> {
    async fn audit(&self, input: &AnalysisInput) -> Result<PerformanceReport> {
        match input {
            AnalysisInput::Html(html) => self.audit_html(html).await,
            AnalysisInput::Url(url) => {
                tracing::info!("Auditing performance of {}", url);
                self.inner.audit_url(url).await
            }
        }
    }
}
