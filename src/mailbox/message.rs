//! Message definitions

use std::collections::BTreeMap;

/// Longest message body accepted, in characters
pub const MAX_MESSAGE_CHARS: usize = 120;

/// A message in a user's inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Unique across all inboxes: `{recipient}/{slot}`
    pub id: String,

    /// Sender's username
    pub from_user: String,

    /// Message text
    pub body: String,
}

/// Sender username → that sender's messages, oldest first
pub type Inbox = BTreeMap<String, Vec<Message>>;

pub(crate) fn count_key(user: &str) -> String {
    format!("{}/inbox/count", user)
}

pub(crate) fn id_key(user: &str, slot: u64) -> String {
    format!("{}/inbox/{}/id", user, slot)
}

pub(crate) fn from_key(user: &str, slot: u64) -> String {
    format!("{}/inbox/{}/from", user, slot)
}

pub(crate) fn body_key(user: &str, slot: u64) -> String {
    format!("{}/inbox/{}/body", user, slot)
}

pub(crate) fn message_id(recipient: &str, slot: u64) -> String {
    format!("{}/{}", recipient, slot)
}
