//! Session-level protocol rules, kept free of I/O.
//!
//! [`SessionProtocol`] owns the sequence numbers of one session. It turns
//! inbound messages into [`Action`]s for the socket task and stamps outbound
//! messages with the engine-owned header.

use crate::session::{SessionConfig, SessionStatus};
use chrono::Utc;
use fix_types::{tag, FixMessage, MessageKind};
use tracing::{debug, warn};

/// Tags the engine writes itself; values supplied by callers are replaced.
const ENGINE_OWNED: [u32; 4] = [
    tag::SENDER_COMP_ID,
    tag::TARGET_COMP_ID,
    tag::MSG_SEQ_NUM,
    tag::SENDING_TIME,
];

// SessionRejectReason (373) codes
const REASON_REQUIRED_TAG_MISSING: u32 = 1;
const REASON_COMP_ID_PROBLEM: u32 = 9;
const REASON_INVALID_MSG_TYPE: u32 = 11;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    /// Already stamped, ready to encode.
    Send(FixMessage),
    Deliver(FixMessage),
    Status(SessionStatus),
    Close,
}

pub(crate) struct SessionProtocol {
    config: SessionConfig,
    next_out: u64,
    next_in: u64,
}

impl SessionProtocol {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            next_out: 1,
            next_in: 1,
        }
    }

    pub fn reset(&mut self) {
        self.next_out = 1;
        self.next_in = 1;
    }

    pub fn next_out(&self) -> u64 {
        self.next_out
    }

    pub fn next_in(&self) -> u64 {
        self.next_in
    }

    pub fn logon(&mut self) -> FixMessage {
        let heartbeat = self.config.heartbeat_interval.as_secs().max(1);
        let mut logon = FixMessage::of_kind(MessageKind::Logon)
            .with(tag::ENCRYPT_METHOD, "0")
            .with(tag::HEART_BT_INT, heartbeat.to_string());
        if self.config.reset_on_logon {
            logon.set(tag::RESET_SEQ_NUM_FLAG, "Y");
        }
        self.stamp(logon)
    }

    pub fn logout(&mut self, text: Option<&str>) -> FixMessage {
        let mut logout = FixMessage::of_kind(MessageKind::Logout);
        if let Some(text) = text {
            logout.set(tag::TEXT, text);
        }
        self.stamp(logout)
    }

    pub fn heartbeat(&mut self, test_req_id: Option<&str>) -> FixMessage {
        let mut heartbeat = FixMessage::of_kind(MessageKind::Heartbeat);
        if let Some(id) = test_req_id {
            heartbeat.set(tag::TEST_REQ_ID, id);
        }
        self.stamp(heartbeat)
    }

    pub fn test_request(&mut self) -> FixMessage {
        let id = Utc::now().format("TEST-%Y%m%d-%H%M%S%.3f").to_string();
        let request = FixMessage::of_kind(MessageKind::TestRequest).with(tag::TEST_REQ_ID, id);
        self.stamp(request)
    }

    /// Assign the next outbound sequence number and write the header.
    pub fn stamp(&mut self, message: FixMessage) -> FixMessage {
        let seq = self.next_out;
        self.next_out += 1;
        self.stamp_with(message, seq)
    }

    fn stamp_with(&self, message: FixMessage, seq: u64) -> FixMessage {
        let id = &self.config.id;
        let mut out = FixMessage::new(message.msg_type.clone())
            .with_begin_string(id.begin_string.clone());
        out.push(tag::SENDER_COMP_ID, id.sender_comp_id.clone())
            .push(tag::TARGET_COMP_ID, id.target_comp_id.clone())
            .push(tag::MSG_SEQ_NUM, seq.to_string())
            .push(tag::SENDING_TIME, sending_time());

        let (header, body): (Vec<_>, Vec<_>) = message
            .fields()
            .iter()
            .filter(|(t, _)| !ENGINE_OWNED.contains(t))
            .partition(|(t, _)| tag::is_header(*t));
        for (t, v) in header.into_iter().chain(body) {
            out.push(*t, v.clone());
        }
        out
    }

    /// React to one decoded inbound message.
    pub fn on_message(
        &mut self,
        message: FixMessage,
        status: &SessionStatus,
        reject_invalid: bool,
    ) -> Vec<Action> {
        let kind = message.kind();
        let seq = message.seq_num();

        if kind == MessageKind::SequenceReset {
            return self.on_sequence_reset(&message);
        }

        if let Some(seq) = seq {
            if seq < self.next_in {
                if message.get(tag::POSS_DUP_FLAG) == Some("Y") {
                    debug!(seq, expected = self.next_in, "Ignoring possible duplicate");
                    return Vec::new();
                }
                let text = format!(
                    "MsgSeqNum too low, expecting {} but received {}",
                    self.next_in, seq
                );
                warn!(session = %self.config.id, "{}", text);
                return vec![
                    Action::Send(self.logout(Some(&text))),
                    Action::Status(SessionStatus::Failed(text)),
                    Action::Close,
                ];
            }
            if seq > self.next_in {
                warn!(
                    session = %self.config.id,
                    expected = self.next_in,
                    received = seq,
                    "Inbound sequence gap, continuing from received number"
                );
            }
            self.next_in = seq + 1;
        }

        match kind {
            MessageKind::Logon => self.on_logon(status),
            MessageKind::Logout => self.on_logout(&message, status),
            MessageKind::Heartbeat => Vec::new(),
            MessageKind::TestRequest => {
                let id = message.get(tag::TEST_REQ_ID).map(str::to_string);
                vec![Action::Send(self.heartbeat(id.as_deref()))]
            }
            MessageKind::ResendRequest => self.on_resend_request(&message),
            MessageKind::Reject => {
                warn!(
                    session = %self.config.id,
                    ref_seq = ?message.get(tag::REF_SEQ_NUM),
                    text = ?message.get(tag::TEXT),
                    "Session-level reject received"
                );
                Vec::new()
            }
            _ => self.on_application(message, seq, reject_invalid),
        }
    }

    fn on_logon(&mut self, status: &SessionStatus) -> Vec<Action> {
        match status {
            SessionStatus::LogonSent => vec![Action::Status(SessionStatus::LoggedOn)],
            other => {
                debug!(session = %self.config.id, status = %other, "Ignoring unsolicited Logon");
                Vec::new()
            }
        }
    }

    fn on_logout(&mut self, message: &FixMessage, status: &SessionStatus) -> Vec<Action> {
        let text = message.get(tag::TEXT).unwrap_or_default().to_string();
        match status {
            SessionStatus::LogonSent | SessionStatus::Connecting => {
                let reason = if text.is_empty() {
                    "Logout received in response to Logon".to_string()
                } else {
                    text
                };
                vec![Action::Status(SessionStatus::Rejected(reason)), Action::Close]
            }
            SessionStatus::LogoutSent => {
                vec![Action::Status(SessionStatus::Disconnected), Action::Close]
            }
            _ => vec![
                Action::Send(self.logout(None)),
                Action::Status(SessionStatus::Disconnected),
                Action::Close,
            ],
        }
    }

    fn on_sequence_reset(&mut self, message: &FixMessage) -> Vec<Action> {
        match message.get_u64(tag::NEW_SEQ_NO) {
            Some(new_seq) if new_seq >= self.next_in => {
                debug!(from = self.next_in, to = new_seq, "Applying SequenceReset");
                self.next_in = new_seq;
            }
            other => warn!(
                session = %self.config.id,
                new_seq = ?other,
                expected = self.next_in,
                "Ignoring SequenceReset that would move backwards"
            ),
        }
        Vec::new()
    }

    /// No outbound store is kept, so every requested range is gap-filled.
    fn on_resend_request(&mut self, message: &FixMessage) -> Vec<Action> {
        let begin = message.get_u64(tag::BEGIN_SEQ_NO).unwrap_or(1).max(1);
        if begin >= self.next_out {
            return Vec::new();
        }
        let gap_fill = FixMessage::of_kind(MessageKind::SequenceReset)
            .with(tag::POSS_DUP_FLAG, "Y")
            .with(tag::ORIG_SENDING_TIME, sending_time())
            .with(tag::GAP_FILL_FLAG, "Y")
            .with(tag::NEW_SEQ_NO, self.next_out.to_string());
        vec![Action::Send(self.stamp_with(gap_fill, begin))]
    }

    fn on_application(
        &mut self,
        message: FixMessage,
        seq: Option<u64>,
        reject_invalid: bool,
    ) -> Vec<Action> {
        match self.validate(&message) {
            Some((reason, text)) if reject_invalid => {
                warn!(session = %self.config.id, msg_type = %message.msg_type, "{}", text);
                let mut reject = FixMessage::of_kind(MessageKind::Reject)
                    .with(tag::REF_SEQ_NUM, seq.unwrap_or(0).to_string())
                    .with(tag::SESSION_REJECT_REASON, reason.to_string())
                    .with(tag::TEXT, text);
                if !message.msg_type.is_empty() {
                    reject.set(tag::REF_MSG_TYPE, message.msg_type.clone());
                }
                vec![Action::Send(self.stamp(reject))]
            }
            Some((_, text)) => {
                debug!(session = %self.config.id, "Delivering invalid message: {}", text);
                vec![Action::Deliver(message)]
            }
            None => vec![Action::Deliver(message)],
        }
    }

    /// Header checks applied to inbound application messages.
    fn validate(&self, message: &FixMessage) -> Option<(u32, String)> {
        let id = &self.config.id;
        if message.kind() == MessageKind::Unknown {
            return Some((
                REASON_INVALID_MSG_TYPE,
                format!("Unsupported MsgType '{}'", message.msg_type),
            ));
        }
        for required in [tag::MSG_SEQ_NUM, tag::SENDING_TIME] {
            if !message.contains(required) {
                return Some((
                    REASON_REQUIRED_TAG_MISSING,
                    format!("Required tag {} missing", required),
                ));
            }
        }
        if message.get(tag::SENDER_COMP_ID) != Some(id.target_comp_id.as_str())
            || message.get(tag::TARGET_COMP_ID) != Some(id.sender_comp_id.as_str())
        {
            return Some((REASON_COMP_ID_PROBLEM, "CompID problem".to_string()));
        }
        None
    }
}

fn sending_time() -> String {
    Utc::now().format("%Y%m%d-%H:%M:%S%.3f").to_string()
}
