//! Messages: directed units of work fed through the queue.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::account::{Address, LogicalTime};

/// A decoded message. `dst == None` marks an outbound event, which is never queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub hash: String,
    pub src: Option<Address>,
    pub dst: Option<Address>,
    /// Logical-time hint. Messages without one sort as if it were zero.
    pub lt: Option<LogicalTime>,
    #[serde(with = "crate::utils::serde_hex")]
    pub boc: Bytes,
}

impl Message {
    pub fn is_event(&self) -> bool {
        self.dst.is_none()
    }

    /// Primary ordering key inside the message queue.
    pub fn ordering_lt(&self) -> LogicalTime {
        self.lt.unwrap_or(0)
    }
}
