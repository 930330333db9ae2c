use crate::{Error, Result};
use dashmap::DashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Path prefix under which published sessions are served
pub const SESSION_EXPOSURE_PATH: &str = "/__session-exposure";

/// Opaque identifier of a published HTML document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::SessionNotFound(s.to_string()))
    }
}

/// Publishes HTML under unique session ids so that tools which only
/// accept URLs can fetch it.
///
/// Cloning is cheap; clones share the same map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<str>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `html` and return the id it can be resolved by
    pub fn publish(&self, html: impl Into<Arc<str>>) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(id, html.into());
        tracing::debug!("Published session {} ({} active)", id, self.sessions.len());
        id
    }

    /// Look up the HTML for a session id in its string form
    pub fn resolve(&self, id: &str) -> Result<Arc<str>> {
        let id: SessionId = id.parse()?;
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Remove a session. Returns whether it was present.
    pub fn revoke(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::debug!("Revoked session {} ({} active)", id, self.sessions.len());
        }
        removed
    }

    /// Publish `html` for the lifetime of the returned lease
    pub fn lease(&self, html: impl Into<Arc<str>>) -> SessionLease {
        let id = self.publish(html);
        SessionLease {
            registry: self.clone(),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// A published session that is revoked when dropped
pub struct SessionLease {
    registry: SessionRegistry,
    id: SessionId,
}

impl SessionLease {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// URL at which the session is reachable on the given base address
    pub fn url(&self, base_url: &str) -> String {
        exposure_url(base_url, self.id)
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

/// Build the exposure URL for a session, e.g. `http://127.0.0.1:4000/__session-exposure/<id>`
pub fn exposure_url(base_url: &str, id: SessionId) -> String {
    format!(
        "{}{}/{}",
        base_url.trim_end_matches('/'),
        SESSION_EXPOSURE_PATH,
        id
    )
}
