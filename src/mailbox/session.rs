//! Session registry
//!
//! Single owner of every user's session record. Going online or offline
//! changes the state field of that user's record.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{ChunkError, Result};

/// Whether a user is logged in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Online,
    Offline,
}

#[derive(Debug)]
struct Session {
    password: String,
    state: SessionState,
}

/// Username → session record
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `username` offline. Returns `false` if already registered,
    /// in which case the stored password is kept.
    pub fn register(&self, username: &str, password: &str) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(username) {
            return false;
        }
        sessions.insert(
            username.to_string(),
            Session {
                password: password.to_string(),
                state: SessionState::Offline,
            },
        );
        true
    }

    /// Bring a user online
    ///
    /// A user who is already online stays online whatever `password` is.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(username)
            .ok_or_else(|| ChunkError::InvalidArgument(format!("unknown user {:?}", username)))?;

        match session.state {
            SessionState::Online => Ok(()),
            SessionState::Offline if session.password != password => Err(
                ChunkError::InvalidArgument(format!("wrong password for {:?}", username)),
            ),
            SessionState::Offline => {
                session.state = SessionState::Online;
                Ok(())
            }
        }
    }

    /// Take an online user offline
    pub fn logout(&self, username: &str) -> Result<()> {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(username) {
            Some(session) if session.state == SessionState::Online => {
                session.state = SessionState::Offline;
                Ok(())
            }
            _ => Err(ChunkError::InvalidArgument(format!(
                "{:?} is not logged in",
                username
            ))),
        }
    }

    /// Take a user offline if registered, whatever their state
    pub fn force_offline(&self, username: &str) {
        if let Some(session) = self.sessions.lock().get_mut(username) {
            session.state = SessionState::Offline;
        }
    }

    /// Current state of `username`, `None` if unregistered
    pub fn state(&self, username: &str) -> Option<SessionState> {
        self.sessions.lock().get(username).map(|s| s.state)
    }

    pub fn is_registered(&self, username: &str) -> bool {
        self.sessions.lock().contains_key(username)
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.state(username) == Some(SessionState::Online)
    }

    /// Usernames currently online, sorted
    pub fn online_users(&self) -> Vec<String> {
        let sessions = self.sessions.lock();
        let mut users: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.state == SessionState::Online)
            .map(|(name, _)| name.clone())
            .collect();
        users.sort();
        users
    }
}
