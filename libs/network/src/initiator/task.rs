//! Per-session socket task.
//!
//! Idles until a Logon command arrives, then connects, performs the logon
//! handshake and serves the connection until either side logs out or the
//! socket fails. Afterwards it idles again, so a session can log on more than
//! once over the life of the engine.

use super::protocol::{Action, SessionProtocol};
use crate::session::{InboundHandler, SessionConfig, SessionId, SessionStatus};
use crate::{Result, TransportError};
use fix_codec::{encode, parse, render, FrameDecoder};
use fix_types::FixMessage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How long an unanswered Logout keeps the socket open.
const LOGOUT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub(crate) enum Command {
    Logon,
    Logout,
    Send(FixMessage),
}

/// State shared between the task and its [`super::InitiatorSession`] handle.
pub(crate) struct Shared {
    pub status: RwLock<SessionStatus>,
    pub reject_invalid: AtomicBool,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            status: RwLock::new(SessionStatus::Disconnected),
            reject_invalid: AtomicBool::new(true),
        }
    }
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Close,
}

struct Liveness {
    last_sent: Instant,
    last_received: Instant,
    test_request_sent: Option<Instant>,
    logout_sent: Option<Instant>,
}

impl Liveness {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            last_sent: now,
            last_received: now,
            test_request_sent: None,
            logout_sent: None,
        }
    }
}

pub(crate) struct SessionTask {
    id: SessionId,
    config: SessionConfig,
    shared: Arc<Shared>,
    handler: Arc<dyn InboundHandler>,
    commands: mpsc::UnboundedReceiver<Command>,
    protocol: SessionProtocol,
}

impl SessionTask {
    pub fn new(
        config: SessionConfig,
        shared: Arc<Shared>,
        handler: Arc<dyn InboundHandler>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            id: config.id.clone(),
            protocol: SessionProtocol::new(config.clone()),
            config,
            shared,
            handler,
            commands,
        }
    }

    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Logon => self.connect_and_serve().await,
                Command::Logout => debug!(session = %self.id, "Logout requested while disconnected"),
                Command::Send(message) => warn!(
                    session = %self.id,
                    msg_type = %message.msg_type,
                    "Dropping outbound message, session not connected"
                ),
            }
        }
        debug!(session = %self.id, "Session task finished");
    }

    fn status(&self) -> SessionStatus {
        self.shared.status.read().clone()
    }

    fn set_status(&self, status: SessionStatus) {
        debug!(session = %self.id, status = %status, "Session status changed");
        *self.shared.status.write() = status;
    }

    async fn connect_and_serve(&mut self) {
        self.set_status(SessionStatus::Connecting);

        let mut stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Connect failed");
                self.set_status(SessionStatus::Failed(e.to_string()));
                return;
            }
        };

        if self.config.reset_on_logon {
            self.protocol.reset();
        }

        let outcome = self.serve(&mut stream).await;
        let was_logged_on = match outcome {
            Ok(was_logged_on) => was_logged_on,
            Err((was_logged_on, e)) => {
                match self.status() {
                    SessionStatus::LogoutSent => self.set_status(SessionStatus::Disconnected),
                    SessionStatus::Rejected(_) => {}
                    _ => {
                        warn!(session = %self.id, error = %e, "Session connection failed");
                        self.set_status(SessionStatus::Failed(e.to_string()));
                    }
                }
                was_logged_on
            }
        };
        let _ = stream.shutdown().await;

        if was_logged_on {
            info!(session = %self.id, "Session logged out");
            self.handler.on_logout(&self.id);
        }
    }

    async fn connect(&self) -> Result<TcpStream> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        info!(session = %self.id, address = %address, "Connecting");

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| {
                TransportError::timeout("TCP connect", self.config.connect_timeout.as_millis() as u64)
            })?
            .map_err(|e| TransportError::network_with_source("Failed to connect to FIX counterparty", e))?;

        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::network_with_source("Failed to set TCP_NODELAY", e))?;
        Ok(stream)
    }

    /// Serve one connection. Either variant carries whether the session
    /// reached LoggedOn.
    async fn serve(
        &mut self,
        stream: &mut TcpStream,
    ) -> std::result::Result<bool, (bool, TransportError)> {
        let mut logged_on = false;
        match self.serve_inner(stream, &mut logged_on).await {
            Ok(()) => Ok(logged_on),
            Err(e) => Err((logged_on, e)),
        }
    }

    async fn serve_inner(&mut self, stream: &mut TcpStream, logged_on: &mut bool) -> Result<()> {
        let mut decoder = FrameDecoder::default();
        let mut liveness = Liveness::new();
        let heartbeat = self.config.heartbeat_interval;
        let mut ticker = tokio::time::interval(
            (heartbeat / 4).clamp(Duration::from_millis(100), Duration::from_secs(1)),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let logon = self.protocol.logon();
        self.write(stream, &logon, &mut liveness).await?;
        self.set_status(SessionStatus::LogonSent);

        loop {
            tokio::select! {
                read = stream.read_buf(decoder.buffer_mut()) => {
                    let n = read.map_err(|e| TransportError::network_with_source("Failed to read from socket", e))?;
                    if n == 0 {
                        return Err(TransportError::connection("Connection closed by counterparty", stream.peer_addr().ok()));
                    }
                    liveness.last_received = Instant::now();
                    liveness.test_request_sent = None;

                    while let Some(message) = self.next_message(&mut decoder)? {
                        let reject_invalid = self.shared.reject_invalid.load(Ordering::Relaxed);
                        let status = self.status();
                        let actions = self.protocol.on_message(message, &status, reject_invalid);
                        if self.apply(stream, actions, &mut liveness, logged_on).await? == Flow::Close {
                            return Ok(());
                        }
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        None => return Ok(()),
                        Some(Command::Send(message)) => {
                            if self.status().is_logged_on() {
                                let stamped = self.protocol.stamp(message);
                                self.write(stream, &stamped, &mut liveness).await?;
                            } else {
                                warn!(session = %self.id, msg_type = %message.msg_type, "Dropping outbound message, session not logged on");
                            }
                        }
                        Some(Command::Logout) => {
                            let status = self.status();
                            if status.is_logged_on() || status.is_pending() {
                                info!(session = %self.id, "Sending Logout");
                                let logout = self.protocol.logout(None);
                                self.write(stream, &logout, &mut liveness).await?;
                                self.set_status(SessionStatus::LogoutSent);
                                liveness.logout_sent = Some(Instant::now());
                            }
                        }
                        Some(Command::Logon) => debug!(session = %self.id, "Logon requested while connected"),
                    }
                }
                _ = ticker.tick() => {
                    if self.on_tick(stream, &mut liveness).await? == Flow::Close {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn next_message(&self, decoder: &mut FrameDecoder) -> Result<Option<FixMessage>> {
        loop {
            let frame = match decoder.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(None),
                Err(e) if e.is_recoverable() => {
                    warn!(session = %self.id, error = %e, "Skipping unreadable inbound bytes");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            debug!(session = %self.id, frame = %render(&frame), "Inbound");
            match parse(&frame) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => warn!(session = %self.id, error = %e, "Dropping malformed inbound frame"),
            }
        }
    }

    async fn apply(
        &mut self,
        stream: &mut TcpStream,
        actions: Vec<Action>,
        liveness: &mut Liveness,
        logged_on: &mut bool,
    ) -> Result<Flow> {
        for action in actions {
            match action {
                Action::Send(message) => self.write(stream, &message, liveness).await?,
                Action::Deliver(message) => self.handler.on_inbound(&self.id, message),
                Action::Status(status) => {
                    if status.is_logged_on() {
                        *logged_on = true;
                        self.set_status(status);
                        info!(session = %self.id, "Session logged on");
                        self.handler.on_logon(&self.id);
                    } else {
                        if let SessionStatus::Rejected(reason) = &status {
                            warn!(session = %self.id, reason = %reason, "Logon rejected");
                        }
                        self.set_status(status);
                    }
                }
                Action::Close => return Ok(Flow::Close),
            }
        }
        Ok(Flow::Continue)
    }

    async fn on_tick(&mut self, stream: &mut TcpStream, liveness: &mut Liveness) -> Result<Flow> {
        if let Some(sent_at) = liveness.logout_sent {
            if sent_at.elapsed() >= LOGOUT_GRACE {
                info!(session = %self.id, "Logout not acknowledged, closing");
                self.set_status(SessionStatus::Disconnected);
                return Ok(Flow::Close);
            }
            return Ok(Flow::Continue);
        }
        if !self.status().is_logged_on() {
            return Ok(Flow::Continue);
        }

        let heartbeat = self.config.heartbeat_interval;
        let grace = heartbeat + heartbeat / 5;
        match liveness.test_request_sent {
            Some(sent_at) if sent_at.elapsed() >= grace => {
                return Err(TransportError::timeout(
                    "heartbeat",
                    (grace * 2).as_millis() as u64,
                ));
            }
            None if liveness.last_received.elapsed() >= grace => {
                let request = self.protocol.test_request();
                self.write(stream, &request, liveness).await?;
                liveness.test_request_sent = Some(Instant::now());
            }
            _ => {}
        }
        if liveness.last_sent.elapsed() >= heartbeat {
            let beat = self.protocol.heartbeat(None);
            self.write(stream, &beat, liveness).await?;
        }
        Ok(Flow::Continue)
    }

    async fn write(
        &self,
        stream: &mut TcpStream,
        message: &FixMessage,
        liveness: &mut Liveness,
    ) -> Result<()> {
        let frame = encode(message)?;
        stream
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::network_with_source("Failed to write message", e))?;
        stream
            .flush()
            .await
            .map_err(|e| TransportError::network_with_source("Failed to flush TCP stream", e))?;
        liveness.last_sent = Instant::now();
        debug!(session = %self.id, frame = %render(&frame), "Outbound");
        Ok(())
    }
}
