//! Transaction records produced by executing one message.
//!
//! A record is created exactly once per executed message and is never mutated
//! afterwards; the index only ever stores and hands out clones.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::account::{Address, LogicalTime};
use crate::core::message::Message;
use crate::core::TxHash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    pub lt: LogicalTime,
    /// Unix seconds the transaction was executed at.
    pub now: u32,
    pub aborted: bool,
    pub in_message: Message,
    pub out_messages: Vec<Message>,
    /// Encoded transaction as returned by the oracle.
    #[serde(with = "crate::utils::serde_hex")]
    pub boc: Bytes,
}

impl Transaction {
    /// Account the transaction was executed on (destination of the inbound message).
    pub fn account(&self) -> Option<&Address> {
        self.in_message.dst.as_ref()
    }

    /// Outbound messages that have a destination and must be queued.
    pub fn internal_messages(&self) -> impl Iterator<Item = &Message> {
        self.out_messages.iter().filter(|msg| !msg.is_event())
    }

    /// Outbound messages without a destination.
    pub fn events(&self) -> impl Iterator<Item = &Message> {
        self.out_messages.iter().filter(|msg| msg.is_event())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(hash: &str, dst: Option<&str>) -> Message {
        Message {
            hash: hash.to_string(),
            src: Some("0:01".to_string()),
            dst: dst.map(str::to_string),
            lt: Some(2),
            boc: Bytes::new(),
        }
    }

    #[test]
    fn test_internal_messages_skip_events() {
        let tx = Transaction {
            hash: "tx".to_string(),
            lt: 1,
            now: 0,
            aborted: false,
            in_message: message("in", Some("0:01")),
            out_messages: vec![message("a", Some("0:02")), message("ev", None), message("b", Some("0:03"))],
            boc: Bytes::new(),
        };
        let internal: Vec<_> = tx.internal_messages().map(|m| m.hash.as_str()).collect();
        assert_eq!(internal, vec!["a", "b"]);
        assert_eq!(tx.events().count(), 1);
        assert_eq!(tx.account().map(String::as_str), Some("0:01"));
    }
}
