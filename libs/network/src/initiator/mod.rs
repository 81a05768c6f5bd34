//! Socket initiator: the client-side FIX engine.
//!
//! One tokio task per configured session owns the socket and the session
//! protocol state. The runner talks to it through [`InitiatorSession`]
//! handles, which forward commands over an unbounded channel and read the
//! shared status.

mod protocol;
mod task;

use crate::engine::FixEngine;
use crate::session::{InboundHandler, SessionConfig, SessionHandle, SessionId, SessionStatus};
use crate::{Result, TransportError};
use async_trait::async_trait;
use fix_types::FixMessage;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use task::{Command, SessionTask, Shared};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to one initiator session.
pub struct InitiatorSession {
    id: SessionId,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl InitiatorSession {
    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::session_closed(&self.id))
    }
}

impl SessionHandle for InitiatorSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn logon(&self) -> Result<()> {
        self.command(Command::Logon)
    }

    fn logout(&self) -> Result<()> {
        let status = self.status();
        if status.is_logged_on() || status.is_pending() {
            self.command(Command::Logout)?;
        }
        Ok(())
    }

    fn status(&self) -> SessionStatus {
        self.shared.status.read().clone()
    }

    fn send(&self, message: FixMessage) -> Result<()> {
        if !self.is_logged_on() {
            return Err(TransportError::not_logged_on(&self.id));
        }
        self.command(Command::Send(message))
    }

    fn set_reject_invalid_message(&self, reject: bool) {
        self.shared.reject_invalid.store(reject, Ordering::Relaxed);
    }
}

/// Initiator engine over TCP.
pub struct SocketInitiator {
    sessions: Vec<Arc<InitiatorSession>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SocketInitiator {
    /// Spawn one idle task per session. Must be called inside a tokio runtime.
    /// Nothing connects until [`SessionHandle::logon`] is called.
    pub fn start(configs: Vec<SessionConfig>, handler: Arc<dyn InboundHandler>) -> Result<Self> {
        if configs.is_empty() {
            return Err(TransportError::configuration("No sessions to start", None));
        }
        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.id.clone()) {
                return Err(TransportError::configuration(
                    format!("Duplicate session {}", config.id),
                    Some("session"),
                ));
            }
        }

        let mut sessions = Vec::with_capacity(configs.len());
        let mut tasks = Vec::with_capacity(configs.len());
        for config in configs {
            let (tx, rx) = mpsc::unbounded_channel();
            let shared = Arc::new(Shared::default());
            debug!(session = %config.id, host = %config.host, port = config.port, "Starting session task");

            sessions.push(Arc::new(InitiatorSession {
                id: config.id.clone(),
                shared: shared.clone(),
                commands: tx,
            }));
            let task = SessionTask::new(config, shared, handler.clone(), rx);
            tasks.push(tokio::spawn(task.run()));
        }

        info!(sessions = sessions.len(), "Socket initiator started");
        Ok(Self {
            sessions,
            tasks: Mutex::new(tasks),
        })
    }
}

#[async_trait]
impl FixEngine for SocketInitiator {
    fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id.clone()).collect()
    }

    fn lookup(&self, id: &SessionId) -> Option<Arc<dyn SessionHandle>> {
        self.sessions
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.clone() as Arc<dyn SessionHandle>)
    }

    async fn stop(&self, grace: Duration) {
        for session in &self.sessions {
            let _ = session.logout();
        }

        let deadline = tokio::time::Instant::now() + grace;
        while tokio::time::Instant::now() < deadline {
            let open = self.sessions.iter().any(|s| {
                let status = s.status();
                status.is_logged_on() || status.is_pending() || status == SessionStatus::LogoutSent
            });
            if !open {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!("Socket initiator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fix_codec::{encode, parse, FrameDecoder};
    use fix_types::{tag, MessageKind};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Default)]
    struct Collector {
        inbound: Mutex<Vec<FixMessage>>,
    }

    impl InboundHandler for Collector {
        fn on_inbound(&self, _session: &SessionId, message: FixMessage) {
            self.inbound.lock().push(message);
        }
    }

    fn config(port: u16) -> SessionConfig {
        SessionConfig {
            id: SessionId::new("FIX.4.4", "CLIENT", "EXCHANGE", "A"),
            host: "127.0.0.1".into(),
            port,
            heartbeat_interval: Duration::from_secs(30),
            reset_on_logon: true,
            connect_timeout: Duration::from_secs(2),
        }
    }

    async fn read_message(stream: &mut TcpStream, decoder: &mut FrameDecoder) -> FixMessage {
        loop {
            if let Some(frame) = decoder.next_frame().unwrap() {
                return parse(&frame).unwrap();
            }
            let n = stream.read_buf(decoder.buffer_mut()).await.unwrap();
            assert!(n > 0, "initiator closed the connection");
        }
    }

    async fn reply(stream: &mut TcpStream, kind: MessageKind, seq: u64, extra: &[(u32, &str)]) {
        let mut message = FixMessage::of_kind(kind)
            .with_begin_string("FIX.4.4")
            .with(tag::SENDER_COMP_ID, "EXCHANGE")
            .with(tag::TARGET_COMP_ID, "CLIENT")
            .with(tag::MSG_SEQ_NUM, seq.to_string())
            .with(tag::SENDING_TIME, "20240101-00:00:00.000");
        for (t, v) in extra {
            message.set(*t, *v);
        }
        stream.write_all(&encode(&message).unwrap()).await.unwrap();
    }

    async fn wait_for(session: &Arc<dyn SessionHandle>, predicate: impl Fn(&SessionStatus) -> bool) {
        for _ in 0..200 {
            if predicate(&session.status()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("status never reached, last: {}", session.status());
    }

    #[tokio::test]
    async fn test_logon_send_and_logout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let collector = Arc::new(Collector::default());
        let engine = SocketInitiator::start(vec![config(port)], collector.clone()).unwrap();
        let session = engine.lookup(&engine.session_ids()[0]).unwrap();

        assert!(matches!(
            session.send(FixMessage::of_kind(MessageKind::NewOrderSingle)),
            Err(TransportError::NotLoggedOn { .. })
        ));

        session.logon().unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();
        let mut decoder = FrameDecoder::default();

        let logon = read_message(&mut peer, &mut decoder).await;
        assert_eq!(logon.kind(), MessageKind::Logon);
        assert_eq!(logon.get(tag::SENDER_COMP_ID), Some("CLIENT"));
        reply(&mut peer, MessageKind::Logon, 1, &[(tag::HEART_BT_INT, "30")]).await;
        wait_for(&session, SessionStatus::is_logged_on).await;

        let order = FixMessage::of_kind(MessageKind::NewOrderSingle).with(tag::CL_ORD_ID, "ORD-1");
        session.send(order).unwrap();
        let received = read_message(&mut peer, &mut decoder).await;
        assert_eq!(received.get(tag::CL_ORD_ID), Some("ORD-1"));
        assert_eq!(received.seq_num(), Some(2));

        reply(&mut peer, MessageKind::ExecutionReport, 2, &[(tag::CL_ORD_ID, "ORD-1")]).await;
        for _ in 0..200 {
            if !collector.inbound.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(collector.inbound.lock()[0].get(tag::CL_ORD_ID), Some("ORD-1"));

        session.logout().unwrap();
        let logout = read_message(&mut peer, &mut decoder).await;
        assert_eq!(logout.kind(), MessageKind::Logout);
        reply(&mut peer, MessageKind::Logout, 3, &[]).await;
        wait_for(&session, |s| *s == SessionStatus::Disconnected).await;

        engine.stop(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_logon_rejection_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine =
            SocketInitiator::start(vec![config(port)], Arc::new(Collector::default())).unwrap();
        let session = engine.lookup(&engine.session_ids()[0]).unwrap();

        session.logon().unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();
        let mut decoder = FrameDecoder::default();
        read_message(&mut peer, &mut decoder).await;
        reply(&mut peer, MessageKind::Logout, 1, &[(tag::TEXT, "Unknown CompID")]).await;

        wait_for(&session, |s| matches!(s, SessionStatus::Rejected(_))).await;
        assert_eq!(session.rejection().as_deref(), Some("Unknown CompID"));
        assert!(!session.is_logged_on());

        engine.stop(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_connect_failure_marks_session_failed() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let engine =
            SocketInitiator::start(vec![config(port)], Arc::new(Collector::default())).unwrap();
        let session = engine.lookup(&engine.session_ids()[0]).unwrap();

        session.logon().unwrap();
        wait_for(&session, |s| matches!(s, SessionStatus::Failed(_))).await;
        engine.stop(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_duplicate_sessions_are_refused() {
        let result = SocketInitiator::start(
            vec![config(1), config(1)],
            Arc::new(Collector::default()),
        );
        assert!(matches!(result, Err(TransportError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_lookup_unknown_session() {
        let engine =
            SocketInitiator::start(vec![config(1)], Arc::new(Collector::default())).unwrap();
        let other = SessionId::new("FIX.4.4", "CLIENT", "EXCHANGE", "B");
        assert!(engine.lookup(&other).is_none());
        engine.stop(Duration::from_millis(10)).await;
    }
}
