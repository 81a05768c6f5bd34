//! Mock FIX acceptor for testing
//!
//! Accepts any number of initiator connections on a loopback port and plays
//! a minimal exchange: acknowledges Logon (or rejects it), answers
//! NewOrderSingle with a New ExecutionReport and OrderCancelRequest with a
//! Canceled one, echoes TestRequest and completes Logout.

use anyhow::{bail, Result};
use chrono::Utc;
use fix_codec::{encode, parse, FrameDecoder};
use fix_types::{tag, FixMessage, MessageKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum AcceptorBehaviour {
    /// Acknowledge every Logon.
    Accept,
    /// Answer every Logon with a Logout carrying this text.
    RejectLogon(String),
}

pub struct MockAcceptor {
    port: u16,
    received: Arc<Mutex<Vec<FixMessage>>>,
    task: JoinHandle<()>,
}

impl MockAcceptor {
    pub async fn start(behaviour: AcceptorBehaviour) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        info!("Mock acceptor listening on 127.0.0.1:{}", port);

        let received = Arc::new(Mutex::new(Vec::new()));
        let orders = Arc::new(AtomicU64::new(0));
        let task = {
            let received = received.clone();
            tokio::spawn(async move {
                while let Ok((stream, addr)) = listener.accept().await {
                    debug!("New connection from {}", addr);
                    let mut peer = PeerSession {
                        behaviour: behaviour.clone(),
                        received: received.clone(),
                        orders: orders.clone(),
                        begin_string: String::new(),
                        local_comp_id: String::new(),
                        remote_comp_id: String::new(),
                        next_out: 1,
                    };
                    tokio::spawn(async move {
                        if let Err(e) = peer.serve(stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
            })
        };

        Ok(Self {
            port,
            received,
            task,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Application messages received so far, across all connections.
    pub fn received(&self) -> Vec<FixMessage> {
        self.received.lock().clone()
    }
}

impl Drop for MockAcceptor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct PeerSession {
    behaviour: AcceptorBehaviour,
    received: Arc<Mutex<Vec<FixMessage>>>,
    orders: Arc<AtomicU64>,
    begin_string: String,
    local_comp_id: String,
    remote_comp_id: String,
    next_out: u64,
}

impl PeerSession {
    async fn serve(&mut self, mut stream: TcpStream) -> Result<()> {
        let mut decoder = FrameDecoder::default();
        loop {
            while let Some(frame) = decoder.next_frame()? {
                let message = parse(&frame)?;
                if !self.handle(&mut stream, message).await? {
                    return Ok(());
                }
            }
            if stream.read_buf(decoder.buffer_mut()).await? == 0 {
                debug!("Initiator closed the connection");
                return Ok(());
            }
        }
    }

    /// Returns false once the connection should close.
    async fn handle(&mut self, stream: &mut TcpStream, message: FixMessage) -> Result<bool> {
        match message.kind() {
            MessageKind::Logon => {
                self.begin_string = message.begin_string.clone();
                self.local_comp_id = message.get(tag::TARGET_COMP_ID).unwrap_or_default().to_string();
                self.remote_comp_id = message.get(tag::SENDER_COMP_ID).unwrap_or_default().to_string();
                self.next_out = 1;

                match self.behaviour.clone() {
                    AcceptorBehaviour::Accept => {
                        let heartbeat = message.get(tag::HEART_BT_INT).unwrap_or("30").to_string();
                        let mut ack = FixMessage::of_kind(MessageKind::Logon)
                            .with(tag::ENCRYPT_METHOD, "0")
                            .with(tag::HEART_BT_INT, heartbeat);
                        if message.contains(tag::RESET_SEQ_NUM_FLAG) {
                            ack.set(tag::RESET_SEQ_NUM_FLAG, "Y");
                        }
                        self.send(stream, ack).await?;
                        Ok(true)
                    }
                    AcceptorBehaviour::RejectLogon(text) => {
                        let logout = FixMessage::of_kind(MessageKind::Logout).with(tag::TEXT, text);
                        self.send(stream, logout).await?;
                        Ok(false)
                    }
                }
            }
            MessageKind::Logout => {
                self.send(stream, FixMessage::of_kind(MessageKind::Logout)).await?;
                Ok(false)
            }
            MessageKind::TestRequest => {
                let id = message.get(tag::TEST_REQ_ID).unwrap_or_default().to_string();
                let heartbeat = FixMessage::of_kind(MessageKind::Heartbeat).with(tag::TEST_REQ_ID, id);
                self.send(stream, heartbeat).await?;
                Ok(true)
            }
            MessageKind::NewOrderSingle => {
                let report = self.execution_report(&message, "0", "0");
                self.received.lock().push(message);
                self.send(stream, report).await?;
                Ok(true)
            }
            MessageKind::OrderCancelRequest => {
                let mut report = self.execution_report(&message, "4", "4");
                if let Some(orig) = message.get(tag::ORIG_CL_ORD_ID) {
                    report.set(tag::ORIG_CL_ORD_ID, orig);
                }
                self.received.lock().push(message);
                self.send(stream, report).await?;
                Ok(true)
            }
            kind if kind.is_admin() => Ok(true),
            _ => {
                self.received.lock().push(message);
                Ok(true)
            }
        }
    }

    fn execution_report(&self, request: &FixMessage, exec_type: &str, status: &str) -> FixMessage {
        let n = self.orders.fetch_add(1, Ordering::Relaxed) + 1;
        let qty = request.get(tag::ORDER_QTY).unwrap_or("0");
        FixMessage::of_kind(MessageKind::ExecutionReport)
            .with(tag::ORDER_ID, format!("ORD-{}", n))
            .with(tag::EXEC_ID, format!("EX-{}", n))
            .with(tag::CL_ORD_ID, request.get(tag::CL_ORD_ID).unwrap_or_default())
            .with(tag::EXEC_TYPE, exec_type)
            .with(tag::ORD_STATUS, status)
            .with(tag::SYMBOL, request.get(tag::SYMBOL).unwrap_or_default())
            .with(tag::SIDE, request.get(tag::SIDE).unwrap_or("1"))
            .with(tag::ORDER_QTY, qty)
            .with(tag::LEAVES_QTY, if status == "0" { qty } else { "0" })
            .with(tag::CUM_QTY, "0")
            .with(tag::AVG_PX, "0")
    }

    async fn send(&mut self, stream: &mut TcpStream, body: FixMessage) -> Result<()> {
        if self.begin_string.is_empty() {
            bail!("send before Logon");
        }
        let mut message = FixMessage::new(body.msg_type.clone())
            .with_begin_string(self.begin_string.clone())
            .with(tag::SENDER_COMP_ID, self.local_comp_id.clone())
            .with(tag::TARGET_COMP_ID, self.remote_comp_id.clone())
            .with(tag::MSG_SEQ_NUM, self.next_out.to_string())
            .with(
                tag::SENDING_TIME,
                Utc::now().format("%Y%m%d-%H:%M:%S%.3f").to_string(),
            );
        for (t, v) in body.fields() {
            message.push(*t, v.clone());
        }
        self.next_out += 1;

        stream.write_all(&encode(&message)?).await?;
        Ok(())
    }
}
