//! Engine-level abstraction over a set of sessions.

use crate::session::{SessionHandle, SessionId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A started FIX engine owning one or more sessions.
#[async_trait]
pub trait FixEngine: Send + Sync {
    /// Session ids in configuration order.
    fn session_ids(&self) -> Vec<SessionId>;

    fn lookup(&self, id: &SessionId) -> Option<Arc<dyn SessionHandle>>;

    /// Log out any established sessions, wait up to `grace` for them to close,
    /// then tear down the remaining tasks.
    async fn stop(&self, grace: Duration);
}
