//! FIX tag number constants (FIX 4.2 / 4.4).
//!
//! Tags are `u32` throughout the workspace. [`by_name`] resolves the
//! human-readable field names scenario scripts may use instead of numbers.

// Standard header / trailer
pub const BEGIN_STRING: u32 = 8;
pub const BODY_LENGTH: u32 = 9;
pub const CHECKSUM: u32 = 10;
pub const MSG_SEQ_NUM: u32 = 34;
pub const MSG_TYPE: u32 = 35;
pub const POSS_DUP_FLAG: u32 = 43;
pub const SENDER_COMP_ID: u32 = 49;
pub const SENDING_TIME: u32 = 52;
pub const TARGET_COMP_ID: u32 = 56;
pub const ORIG_SENDING_TIME: u32 = 122;

// Session level
pub const BEGIN_SEQ_NO: u32 = 7;
pub const END_SEQ_NO: u32 = 16;
pub const NEW_SEQ_NO: u32 = 36;
pub const REF_SEQ_NUM: u32 = 45;
pub const TEXT: u32 = 58;
pub const ENCRYPT_METHOD: u32 = 98;
pub const HEART_BT_INT: u32 = 108;
pub const TEST_REQ_ID: u32 = 112;
pub const GAP_FILL_FLAG: u32 = 123;
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
pub const REF_TAG_ID: u32 = 371;
pub const REF_MSG_TYPE: u32 = 372;
pub const SESSION_REJECT_REASON: u32 = 373;

// Orders and executions
pub const ACCOUNT: u32 = 1;
pub const AVG_PX: u32 = 6;
pub const CL_ORD_ID: u32 = 11;
pub const CUM_QTY: u32 = 14;
pub const EXEC_ID: u32 = 17;
pub const LAST_PX: u32 = 31;
pub const LAST_QTY: u32 = 32;
pub const ORDER_ID: u32 = 37;
pub const ORDER_QTY: u32 = 38;
pub const ORD_STATUS: u32 = 39;
pub const ORD_TYPE: u32 = 40;
pub const ORIG_CL_ORD_ID: u32 = 41;
pub const PRICE: u32 = 44;
pub const SIDE: u32 = 54;
pub const SYMBOL: u32 = 55;
pub const TIME_IN_FORCE: u32 = 59;
pub const TRANSACT_TIME: u32 = 60;
pub const CXL_REJ_REASON: u32 = 102;
pub const ORD_REJ_REASON: u32 = 103;
pub const EXEC_TYPE: u32 = 150;
pub const LEAVES_QTY: u32 = 151;
pub const CXL_REJ_RESPONSE_TO: u32 = 434;

// Quotes and market data
pub const QUOTE_ID: u32 = 117;
pub const QUOTE_REQ_ID: u32 = 131;
pub const BID_PX: u32 = 132;
pub const OFFER_PX: u32 = 133;
pub const MD_REQ_ID: u32 = 262;
pub const BUSINESS_REJECT_REASON: u32 = 380;

const NAMES: &[(&str, u32)] = &[
    ("BeginString", BEGIN_STRING),
    ("BodyLength", BODY_LENGTH),
    ("CheckSum", CHECKSUM),
    ("MsgSeqNum", MSG_SEQ_NUM),
    ("MsgType", MSG_TYPE),
    ("PossDupFlag", POSS_DUP_FLAG),
    ("SenderCompID", SENDER_COMP_ID),
    ("SendingTime", SENDING_TIME),
    ("TargetCompID", TARGET_COMP_ID),
    ("OrigSendingTime", ORIG_SENDING_TIME),
    ("BeginSeqNo", BEGIN_SEQ_NO),
    ("EndSeqNo", END_SEQ_NO),
    ("NewSeqNo", NEW_SEQ_NO),
    ("RefSeqNum", REF_SEQ_NUM),
    ("Text", TEXT),
    ("EncryptMethod", ENCRYPT_METHOD),
    ("HeartBtInt", HEART_BT_INT),
    ("TestReqID", TEST_REQ_ID),
    ("GapFillFlag", GAP_FILL_FLAG),
    ("ResetSeqNumFlag", RESET_SEQ_NUM_FLAG),
    ("RefTagID", REF_TAG_ID),
    ("RefMsgType", REF_MSG_TYPE),
    ("SessionRejectReason", SESSION_REJECT_REASON),
    ("Account", ACCOUNT),
    ("AvgPx", AVG_PX),
    ("ClOrdID", CL_ORD_ID),
    ("CumQty", CUM_QTY),
    ("ExecID", EXEC_ID),
    ("LastPx", LAST_PX),
    ("LastQty", LAST_QTY),
    ("OrderID", ORDER_ID),
    ("OrderQty", ORDER_QTY),
    ("OrdStatus", ORD_STATUS),
    ("OrdType", ORD_TYPE),
    ("OrigClOrdID", ORIG_CL_ORD_ID),
    ("Price", PRICE),
    ("Side", SIDE),
    ("Symbol", SYMBOL),
    ("TimeInForce", TIME_IN_FORCE),
    ("TransactTime", TRANSACT_TIME),
    ("CxlRejReason", CXL_REJ_REASON),
    ("OrdRejReason", ORD_REJ_REASON),
    ("ExecType", EXEC_TYPE),
    ("LeavesQty", LEAVES_QTY),
    ("CxlRejResponseTo", CXL_REJ_RESPONSE_TO),
    ("QuoteID", QUOTE_ID),
    ("QuoteReqID", QUOTE_REQ_ID),
    ("BidPx", BID_PX),
    ("OfferPx", OFFER_PX),
    ("MDReqID", MD_REQ_ID),
    ("BusinessRejectReason", BUSINESS_REJECT_REASON),
];

/// Resolve a field name (`"ClOrdID"`) to its tag number.
pub fn by_name(name: &str) -> Option<u32> {
    NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, t)| *t)
}

/// Resolve a script key: either a decimal tag number or a known field name.
pub fn resolve(key: &str) -> Option<u32> {
    let key = key.trim();
    match key.parse::<u32>() {
        Ok(0) => None,
        Ok(tag) => Some(tag),
        Err(_) => by_name(key),
    }
}

/// Reverse lookup used when rendering messages for logs.
pub fn name_of(tag: u32) -> Option<&'static str> {
    NAMES.iter().find(|(_, t)| *t == tag).map(|(n, _)| *n)
}

/// Header and trailer tags the engine owns; scripts never set these.
pub fn is_header(tag: u32) -> bool {
    matches!(
        tag,
        BEGIN_STRING
            | BODY_LENGTH
            | CHECKSUM
            | MSG_SEQ_NUM
            | MSG_TYPE
            | POSS_DUP_FLAG
            | SENDER_COMP_ID
            | SENDING_TIME
            | TARGET_COMP_ID
            | ORIG_SENDING_TIME
    )
}
