//! Mailbox Module
//!
//! Per-user message inboxes persisted through a [`Storage`](crate::storage::Storage).
//!
//! ## Pieces
//! - [`SessionRegistry`] -- one record per user: password and online state
//! - [`MailboxFactory`] -- registers users and hands out clients
//! - [`MailboxClient`] -- login/logout, sending, reading and deleting messages
//!
//! ## Storage Layout
//! ```text
//! {user}/inbox/count          number of slots ever used
//! {user}/inbox/{i}/id         message id (absent once deleted)
//! {user}/inbox/{i}/from       sender
//! {user}/inbox/{i}/body       text
//! ```
//!
//! Inboxes are persistent. Sessions are not: a new factory starts with every
//! user offline and unregistered.

mod client;
mod message;
mod session;

pub use client::{MailboxClient, MailboxFactory};
pub use message::{Inbox, Message, MAX_MESSAGE_CHARS};
pub use session::{SessionRegistry, SessionState};
