//! Wire protocol: JSON messages tagged by a `type` field, matching the
//! client script's camelCase vocabulary. Presence notices and the echo
//! fallback travel as raw text frames rather than JSON.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Identity;

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "requestLineLock")]
    RequestLineLock { line: usize },

    #[serde(rename = "releaseLineLock")]
    ReleaseLineLock,

    #[serde(rename = "add")]
    Add { position: usize, text: String },

    #[serde(rename = "delete")]
    Delete { start: usize, end: usize },

    #[serde(rename = "edit")]
    Edit {
        start: usize,
        end: usize,
        text: String,
    },

    #[serde(rename = "sync")]
    Sync,
}

/// Messages the server sends. Mutation echoes carry the delta fields plus the
/// full post-mutation text so clients can resync cheaply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init")]
    Init { text: String },

    #[serde(rename = "add")]
    Add {
        position: usize,
        text: String,
        #[serde(rename = "fullText")]
        full_text: String,
    },

    #[serde(rename = "delete")]
    Delete {
        start: usize,
        end: usize,
        #[serde(rename = "fullText")]
        full_text: String,
    },

    #[serde(rename = "edit")]
    Edit {
        start: usize,
        end: usize,
        text: String,
        #[serde(rename = "fullText")]
        full_text: String,
    },

    #[serde(rename = "lineLockGranted")]
    LineLockGranted { line: usize },

    #[serde(rename = "lineLockDenied")]
    LineLockDenied { line: usize, owner: Identity },

    #[serde(rename = "editDenied")]
    EditDenied { reason: String, line: usize },

    #[serde(rename = "lineOwnership")]
    LineOwnership {
        ownership: BTreeMap<usize, Identity>,
    },

    #[serde(rename = "userList")]
    UserList { users: Vec<Identity> },
}

/// One outbound frame on a connection's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Serialized to JSON at the socket.
    Message(ServerMessage),
    /// Sent verbatim as a text frame.
    Notice(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"requestLineLock","line":3}"#).unwrap();
        assert_eq!(msg, ClientMessage::RequestLineLock { line: 3 });

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"sync"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Sync);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"edit","start":0,"end":5,"text":"hi"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Edit {
                start: 0,
                end: 5,
                text: "hi".into()
            }
        );
    }

    #[test]
    fn mutation_echo_uses_camel_case_full_text() {
        let msg = ServerMessage::Add {
            position: 0,
            text: "hi".into(),
            full_text: "hi".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"add","position":0,"text":"hi","fullText":"hi"}"#);
    }

    #[test]
    fn ownership_map_serializes_lines_as_keys() {
        let mut ownership = BTreeMap::new();
        ownership.insert(2, Identity::from("alice"));
        let json = serde_json::to_string(&ServerMessage::LineOwnership { ownership }).unwrap();
        assert_eq!(json, r#"{"type":"lineOwnership","ownership":{"2":"alice"}}"#);
    }
}
