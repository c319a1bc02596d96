//! Messages exchanged between SuperNode and ClientApp.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::constant::ErrorCode;
use crate::record::RecordSet;

/// Routing and bookkeeping fields of a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub run_id: u64,
    pub message_id: String,
    pub src_node_id: u64,
    pub dst_node_id: u64,
    pub reply_to_message: String,
    pub group_id: String,
    /// Seconds the message stays valid after `created_at`.
    pub ttl: f64,
    pub message_type: String,
    /// Unix timestamp in seconds.
    pub created_at: f64,
}

/// Error attached to a reply when the ClientApp could not produce content.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i64,
    pub reason: Option<String>,
}

impl Error {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code: code.as_i64(),
            reason: Some(reason.into()),
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_i64(self.code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub metadata: Metadata,
    pub content: Option<RecordSet>,
    pub error: Option<Error>,
}

impl Message {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Builds the reply to this message carrying `content`.
    ///
    /// The reply inherits the remaining lifetime of this message.
    pub fn create_reply(&self, content: RecordSet) -> Message {
        Message {
            metadata: self.reply_metadata(now_secs()),
            content: Some(content),
            error: None,
        }
    }

    /// Builds the reply to this message carrying `error` and no content.
    pub fn create_error_reply(&self, error: Error) -> Message {
        Message {
            metadata: self.reply_metadata(now_secs()),
            content: None,
            error: Some(error),
        }
    }

    fn reply_metadata(&self, created_at: f64) -> Metadata {
        // An expired request yields a reply that is already expired.
        let ttl = self.metadata.ttl - (created_at - self.metadata.created_at);
        Metadata {
            run_id: self.metadata.run_id,
            message_id: String::new(),
            src_node_id: self.metadata.dst_node_id,
            dst_node_id: self.metadata.src_node_id,
            reply_to_message: self.metadata.message_id.clone(),
            group_id: self.metadata.group_id.clone(),
            ttl,
            message_type: self.metadata.message_type.clone(),
            created_at,
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs_f64()
}
