//! Command definitions
//!
//! Requests routed through [`crate::Engine::execute`] and their replies.

use std::fmt;

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Write a value under a key
    Write { key: String, value: String },

    /// Read a value by key
    Read { key: String },

    /// Delete a key
    Delete { key: String },

    /// Check whether a key holds a value
    Exists { key: String },

    /// Report how many blocks a key occupies
    Blocks { key: String },
}

impl Command {
    /// The logical key the command targets
    pub fn key(&self) -> &str {
        match self {
            Command::Write { key, .. }
            | Command::Read { key }
            | Command::Delete { key }
            | Command::Exists { key }
            | Command::Blocks { key } => key,
        }
    }
}

/// Result of an executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Write or delete completed
    Done,

    /// Read result; `None` means the key is absent
    Value(Option<String>),

    /// Existence check result
    Exists(bool),

    /// Block count from the size record
    Blocks(u64),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Done => write!(f, "OK"),
            Reply::Value(Some(value)) => write!(f, "{}", value),
            Reply::Value(None) => write!(f, "(absent)"),
            Reply::Exists(exists) => write!(f, "{}", exists),
            Reply::Blocks(count) => write!(f, "{}", count),
        }
    }
}
