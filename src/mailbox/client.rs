//! Mailbox clients and the factory that creates them

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ChunkError, Result};
use crate::storage::Storage;

use super::message::{body_key, count_key, from_key, id_key, message_id};
use super::{Inbox, Message, SessionRegistry, MAX_MESSAGE_CHARS};

/// Per-inbox locks serializing the read-modify-write of its slot count
#[derive(Default)]
struct InboxLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InboxLocks {
    fn get(&self, user: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(user.to_string()).or_default())
    }
}

/// Creates clients that share one storage and one session registry
///
/// Clients from the same factory may send concurrently. Separate factories
/// over the same storage do not coordinate and must not be used at once.
pub struct MailboxFactory {
    storage: Arc<dyn Storage>,
    registry: Arc<SessionRegistry>,
    inbox_locks: Arc<InboxLocks>,
}

impl MailboxFactory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            registry: Arc::new(SessionRegistry::new()),
            inbox_locks: Arc::new(InboxLocks::default()),
        }
    }

    /// Get a client for `username`
    ///
    /// The first call for a name registers it (offline) with `password`.
    /// Later calls take that user offline and return a fresh handle; the
    /// password given then is ignored.
    pub fn get(&self, username: &str, password: &str) -> MailboxClient {
        if !self.registry.register(username, password) {
            self.registry.force_offline(username);
            tracing::debug!("Mailbox client for {:?} restarted", username);
        }

        MailboxClient {
            username: username.to_string(),
            storage: Arc::clone(&self.storage),
            registry: Arc::clone(&self.registry),
            inbox_locks: Arc::clone(&self.inbox_locks),
        }
    }

    /// Get the session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

/// One user's view of the mailbox system
pub struct MailboxClient {
    username: String,
    storage: Arc<dyn Storage>,
    registry: Arc<SessionRegistry>,
    inbox_locks: Arc<InboxLocks>,
}

impl MailboxClient {
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Log in. Already being online makes this a no-op.
    ///
    /// Errors with [`ChunkError::InvalidArgument`] on a wrong password.
    pub fn login(&self, password: &str) -> Result<()> {
        self.registry.login(&self.username, password)
    }

    /// Log out. Errors with [`ChunkError::InvalidArgument`] if not logged in.
    pub fn logout(&self) -> Result<()> {
        self.registry.logout(&self.username)
    }

    /// Usernames currently online, sorted
    pub fn online_users(&self) -> Result<Vec<String>> {
        self.require_online()?;
        Ok(self.registry.online_users())
    }

    /// Messages in this user's inbox, grouped by sender in send order
    pub async fn inbox(&self) -> Result<Inbox> {
        self.require_online()?;

        let mut inbox = Inbox::new();
        let slots = self.slot_count(&self.username).await?;

        for slot in 0..slots {
            if let Some(message) = self.read_slot(slot).await? {
                inbox
                    .entry(message.from_user.clone())
                    .or_default()
                    .push(message);
            }
        }

        Ok(inbox)
    }

    /// Send `body` to `to_user`
    ///
    /// Errors with [`ChunkError::InvalidArgument`] if the recipient is not
    /// registered or the body is longer than [`MAX_MESSAGE_CHARS`].
    pub async fn send_message(&self, to_user: &str, body: &str) -> Result<()> {
        self.require_online()?;

        if !self.registry.is_registered(to_user) {
            return Err(ChunkError::InvalidArgument(format!(
                "no user {:?}",
                to_user
            )));
        }
        let chars = body.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ChunkError::InvalidArgument(format!(
                "message has {} characters, limit is {}",
                chars, MAX_MESSAGE_CHARS
            )));
        }

        let inbox_lock = self.inbox_locks.get(to_user);
        let _guard = inbox_lock.lock().await;
        let slot = self.slot_count(to_user).await?;

        // Fields first, count last: the slot only becomes visible once complete
        self.storage.write(&from_key(to_user, slot), &self.username).await?;
        self.storage.write(&body_key(to_user, slot), body).await?;
        self.storage
            .write(&id_key(to_user, slot), &message_id(to_user, slot))
            .await?;
        self.storage
            .write(&count_key(to_user), &(slot + 1).to_string())
            .await?;

        tracing::debug!("{:?} sent message {} to {:?}", self.username, slot, to_user);
        Ok(())
    }

    /// Delete message `id` from this user's inbox
    ///
    /// Errors with [`ChunkError::InvalidArgument`] if no such message is in
    /// the inbox.
    pub async fn delete_message(&self, id: &str) -> Result<()> {
        self.require_online()?;

        let not_found = || ChunkError::InvalidArgument(format!("no message {:?} in inbox", id));
        let slot = self.slot_of(id).ok_or_else(not_found)?;

        let inbox_lock = self.inbox_locks.get(&self.username);
        let _guard = inbox_lock.lock().await;

        let stored = self.storage.read(&id_key(&self.username, slot)).await?;
        if stored.as_deref() != Some(id) {
            return Err(not_found());
        }

        // Id first: once it is gone the slot no longer reads as a message
        self.storage.delete(&id_key(&self.username, slot)).await?;
        self.storage.delete(&from_key(&self.username, slot)).await?;
        self.storage.delete(&body_key(&self.username, slot)).await?;

        tracing::debug!("{:?} deleted message {:?}", self.username, id);
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn require_online(&self) -> Result<()> {
        if self.registry.is_online(&self.username) {
            Ok(())
        } else {
            Err(ChunkError::PermissionDenied(format!(
                "{:?} is not logged in",
                self.username
            )))
        }
    }

    /// Slot named by a message id of this user's inbox
    fn slot_of(&self, id: &str) -> Option<u64> {
        let slot = id.strip_prefix(self.username.as_str())?.strip_prefix('/')?;
        let parsed: u64 = slot.parse().ok()?;
        // Only the canonical spelling names a slot
        (message_id(&self.username, parsed) == id).then_some(parsed)
    }

    /// Slots ever used in `user`'s inbox
    async fn slot_count(&self, user: &str) -> Result<u64> {
        match self.storage.read(&count_key(user)).await? {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| ChunkError::CorruptValue {
                key: count_key(user),
                reason: format!("inbox count {:?} is not a number", raw),
            }),
        }
    }

    /// The message in `slot` of this user's inbox, `None` if deleted
    ///
    /// Sender and body may be legitimately empty, and an empty value reads
    /// as absent, so only the id decides whether the slot is live.
    async fn read_slot(&self, slot: u64) -> Result<Option<Message>> {
        let id = match self.storage.read(&id_key(&self.username, slot)).await? {
            Some(id) => id,
            None => return Ok(None),
        };
        let from_user = self
            .storage
            .read(&from_key(&self.username, slot))
            .await?
            .unwrap_or_default();
        let body = self
            .storage
            .read(&body_key(&self.username, slot))
            .await?
            .unwrap_or_default();

        Ok(Some(Message {
            id,
            from_user,
            body,
        }))
    }
}

impl std::fmt::Debug for MailboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxClient")
            .field("username", &self.username)
            .finish()
    }
}
