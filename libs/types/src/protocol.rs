//! Observed Protocol Messages
//!
//! The session protocol itself is owned by the client; this module only
//! describes the shape of the requests and replies the tracing taps see on the
//! wire, enough to correlate them and to replay requests from a capture.
//!
//! ## Correlation
//!
//! Application requests carry a client-assigned `xid` and their replies come
//! back on the same connection in send order. Pings, authentication packets,
//! watch re-registration and server notifications use reserved negative xids
//! and never take part in correlation.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Server-pushed watch notification
pub const NOTIFICATION_XID: i32 = -1;
/// Keep-alive ping and its reply
pub const PING_XID: i32 = -2;
/// Authentication packet and its reply
pub const AUTH_XID: i32 = -4;
/// Watch re-registration after reconnect
pub const SET_WATCHES_XID: i32 = -8;

/// Operation codes of the session protocol
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
#[repr(i32)]
#[serde(rename_all = "camelCase")]
pub enum OpCode {
    Notification = 0,
    Create = 1,
    Delete = 2,
    Exists = 3,
    GetData = 4,
    SetData = 5,
    GetAcl = 6,
    SetAcl = 7,
    GetChildren = 8,
    Sync = 9,
    Ping = 11,
    GetChildren2 = 12,
    Check = 13,
    Multi = 14,
    Auth = 100,
    SetWatches = 101,
    CreateSession = -10,
    CloseSession = -11,
    Error = -1,
}

impl OpCode {
    /// Ops that never enter the correlation queue regardless of xid
    pub const fn is_session_control(self) -> bool {
        matches!(
            self,
            Self::Ping | Self::Auth | Self::SetWatches | Self::CreateSession | Self::Notification
        )
    }
}

/// Returns true when the xid is reserved for an uncorrelated packet type
pub const fn is_reserved_xid(xid: i32) -> bool {
    matches!(xid, NOTIFICATION_XID | PING_XID | AUTH_XID | SET_WATCHES_XID)
}

/// An outbound client request as observed by the codec tap
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub xid: i32,
    pub op: OpCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, with = "hex_bytes", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl Request {
    pub fn new(xid: i32, op: OpCode) -> Self {
        Self {
            xid,
            op,
            path: None,
            data: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn ping() -> Self {
        Self::new(PING_XID, OpCode::Ping)
    }

    pub fn close_session(xid: i32) -> Self {
        Self::new(xid, OpCode::CloseSession)
    }

    /// Whether the reply to this request can be matched by send order
    pub fn is_correlated(&self) -> bool {
        !is_reserved_xid(self.xid) && !self.op.is_session_control()
    }

    pub fn is_session_close(&self) -> bool {
        self.op == OpCode::CloseSession
    }
}

/// An inbound reply or notification as observed by the codec tap
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Response {
    pub xid: i32,
    pub zxid: i64,
    pub err: i32,
    pub op: OpCode,
    #[serde(default, with = "hex_bytes", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl Response {
    pub fn new(xid: i32, zxid: i64, op: OpCode) -> Self {
        Self {
            xid,
            zxid,
            err: 0,
            op,
            data: Vec::new(),
        }
    }

    pub fn with_err(mut self, err: i32) -> Self {
        self.err = err;
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn is_correlated(&self) -> bool {
        !is_reserved_xid(self.xid) && !self.op.is_session_control()
    }

    pub fn is_session_close(&self) -> bool {
        self.op == OpCode::CloseSession
    }

    pub fn is_error(&self) -> bool {
        self.err != 0
    }
}

/// Hex string encoding for opaque payload bytes
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
