use crate::{Error, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::page::Page;
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// How long no request may be in flight before content counts as loaded
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// A network event reduced to what idle tracking needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkActivity {
    Started(String),
    Settled(String),
}

/// Request ids the page is still waiting on
#[derive(Debug, Default)]
pub struct InFlightRequests {
    pending: HashSet<String>,
}

impl InFlightRequests {
    pub fn record(&mut self, activity: NetworkActivity) -> bool {
        match activity {
            // Redirects reuse the request id, so a repeat start is a no-op
            NetworkActivity::Started(id) => {
                self.pending.insert(id);
                false
            }
            NetworkActivity::Settled(id) => self.pending.remove(&id) && self.pending.is_empty(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Wait until no request has been in flight for `window`.
///
/// The window restarts whenever the last pending request settles. Errors if
/// the activity stream ends while requests are still outstanding.
pub async fn wait_for_idle<S>(mut activity: S, window: Duration) -> Result<()>
where
    S: Stream<Item = NetworkActivity> + Unpin,
{
    let mut in_flight = InFlightRequests::default();
    let mut quiet_until = Instant::now() + window;

    loop {
        tokio::select! {
            Some(event) = activity.next() => {
                if in_flight.record(event) {
                    quiet_until = Instant::now() + window;
                }
            }
            _ = tokio::time::sleep_until(quiet_until), if in_flight.is_idle() => {
                tracing::debug!("Network idle");
                return Ok(());
            }
            else => {
                return Err(Error::Cdp(format!(
                    "Page event stream closed with {} requests in flight",
                    in_flight.pending()
                )));
            }
        }
    }
}

/// Network activity of a page, subscribed before its content starts loading
pub struct NetworkIdle {
    activity: stream::BoxStream<'static, NetworkActivity>,
}

impl NetworkIdle {
    pub async fn watch(page: &Page) -> Result<Self> {
        page.execute(EnableParams::default()).await?;

        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|event| NetworkActivity::Started(event.request_id.inner().to_string()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|event| NetworkActivity::Settled(event.request_id.inner().to_string()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|event| NetworkActivity::Settled(event.request_id.inner().to_string()));

        Ok(Self {
            activity: stream::select(started, stream::select(finished, failed)).boxed(),
        })
    }

    pub async fn wait(self, window: Duration) -> Result<()> {
        wait_for_idle(self.activity, window).await
    }
}
