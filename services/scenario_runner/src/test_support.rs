//! In-memory engine doubles for unit tests.

use async_trait::async_trait;
use fix_network::{
    FixEngine, InboundHandler, Result as TransportResult, SessionHandle, SessionId, SessionStatus,
    TransportError,
};
use fix_types::{FixMessage, MessageKind};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub enum LogonBehaviour {
    /// Report logged on after the delay, unless logged out first.
    Accept(Duration),
    Reject(String),
    /// Connection failure, as the engine reports an unreachable peer.
    Fail(String),
    /// Stay pending forever.
    Silent,
}

type Responder = Box<dyn Fn(&FixMessage) -> Vec<FixMessage> + Send + Sync>;

pub struct MockSession {
    id: SessionId,
    behaviour: LogonBehaviour,
    status: Arc<RwLock<SessionStatus>>,
    reject_invalid: AtomicBool,
    logon_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    sent: Mutex<Vec<FixMessage>>,
    responder: Mutex<Option<(Responder, Duration)>>,
    handler: Mutex<Option<Arc<dyn InboundHandler>>>,
}

impl MockSession {
    pub fn new(qualifier: &str, behaviour: LogonBehaviour) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new("FIX.4.4", "CLIENT", "EXCHANGE", qualifier),
            behaviour,
            status: Arc::new(RwLock::new(SessionStatus::Disconnected)),
            reject_invalid: AtomicBool::new(true),
            logon_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            handler: Mutex::new(None),
        })
    }

    pub fn accepting(qualifier: &str) -> Arc<Self> {
        Self::new(qualifier, LogonBehaviour::Accept(Duration::from_millis(20)))
    }

    /// Answer every sent message with `respond(message)` after `delay`,
    /// delivered through `handler`.
    pub fn respond_with<F>(&self, handler: Arc<dyn InboundHandler>, delay: Duration, respond: F)
    where
        F: Fn(&FixMessage) -> Vec<FixMessage> + Send + Sync + 'static,
    {
        *self.handler.lock() = Some(handler);
        *self.responder.lock() = Some((Box::new(respond), delay));
    }

    pub fn force_logged_on(&self) {
        *self.status.write() = SessionStatus::LoggedOn;
    }

    pub fn force_disconnected(&self) {
        *self.status.write() = SessionStatus::Disconnected;
    }

    pub fn sent(&self) -> Vec<FixMessage> {
        self.sent.lock().clone()
    }

    pub fn logon_calls(&self) -> usize {
        self.logon_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn rejects_invalid(&self) -> bool {
        self.reject_invalid.load(Ordering::SeqCst)
    }
}

impl SessionHandle for MockSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn logon(&self) -> TransportResult<()> {
        self.logon_calls.fetch_add(1, Ordering::SeqCst);
        *self.status.write() = SessionStatus::LogonSent;
        match self.behaviour.clone() {
            LogonBehaviour::Accept(delay) => {
                let status = self.status.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let mut status = status.write();
                    if *status == SessionStatus::LogonSent {
                        *status = SessionStatus::LoggedOn;
                    }
                });
            }
            LogonBehaviour::Reject(reason) => {
                *self.status.write() = SessionStatus::Rejected(reason);
            }
            LogonBehaviour::Fail(reason) => {
                *self.status.write() = SessionStatus::Failed(reason);
            }
            LogonBehaviour::Silent => {}
        }
        Ok(())
    }

    fn logout(&self) -> TransportResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.status.write() = SessionStatus::Disconnected;
        Ok(())
    }

    fn status(&self) -> SessionStatus {
        self.status.read().clone()
    }

    fn send(&self, message: FixMessage) -> TransportResult<()> {
        if !self.is_logged_on() {
            return Err(TransportError::not_logged_on(&self.id));
        }
        self.sent.lock().push(message.clone());

        let handler = self.handler.lock().clone();
        if let (Some(handler), Some((respond, delay))) = (handler, self.responder.lock().as_ref()) {
            let replies = respond(&message);
            let id = self.id.clone();
            let delay = *delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for reply in replies {
                    handler.on_inbound(&id, reply);
                }
            });
        }
        Ok(())
    }

    fn set_reject_invalid_message(&self, reject: bool) {
        self.reject_invalid.store(reject, Ordering::SeqCst);
    }
}

pub struct MockEngine {
    pub sessions: Vec<Arc<MockSession>>,
}

impl MockEngine {
    pub fn new(sessions: Vec<Arc<MockSession>>) -> Arc<Self> {
        Arc::new(Self { sessions })
    }
}

#[async_trait]
impl FixEngine for MockEngine {
    fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id().clone()).collect()
    }

    fn lookup(&self, id: &SessionId) -> Option<Arc<dyn SessionHandle>> {
        self.sessions
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.clone() as Arc<dyn SessionHandle>)
    }

    async fn stop(&self, _grace: Duration) {}
}

/// Echo an ExecutionReport for every NewOrderSingle, carrying its ClOrdID.
pub fn fill_orders(message: &FixMessage) -> Vec<FixMessage> {
    use fix_types::tag;
    if message.kind() != MessageKind::NewOrderSingle {
        return Vec::new();
    }
    let mut report = FixMessage::of_kind(MessageKind::ExecutionReport)
        .with(tag::ORDER_ID, "EX-1")
        .with(tag::EXEC_TYPE, "0")
        .with(tag::ORD_STATUS, "0");
    if let Some(id) = message.get(tag::CL_ORD_ID) {
        report.set(tag::CL_ORD_ID, id);
    }
    vec![report]
}
