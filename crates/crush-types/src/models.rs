use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile details captured on the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub branch: String,
    pub gender: String,
}

/// A student known to the roster, keyed by registration id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub reg: String,
    pub name: String,
    pub attributes: Attributes,
    pub email: String,
    /// Registration ids this user listed, in submission order. Entries may
    /// point at students who never logged in.
    pub crushes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomIdError {
    #[error("room id must look like <reg>-<reg>: {0:?}")]
    Malformed(String),
    #[error("room id is not in canonical order: {0:?}")]
    NotCanonical(String),
}

/// Two-party chat room key.
///
/// The key is the two registration ids sorted and joined with `-`, so both
/// participants derive the same room regardless of who opens the chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId {
    key: String,
    split: usize,
}

impl RoomId {
    pub fn for_pair(a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            key: format!("{lo}-{hi}"),
            split: lo.len(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, RoomIdError> {
        let (lo, hi) = raw
            .split_once('-')
            .ok_or_else(|| RoomIdError::Malformed(raw.to_string()))?;
        if lo.is_empty() || hi.is_empty() || hi.contains('-') {
            return Err(RoomIdError::Malformed(raw.to_string()));
        }
        if lo > hi {
            return Err(RoomIdError::NotCanonical(raw.to_string()));
        }
        Ok(Self::for_pair(lo, hi))
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn participants(&self) -> (&str, &str) {
        (&self.key[..self.split], &self.key[self.split + 1..])
    }

    pub fn has_participant(&self, reg: &str) -> bool {
        let (lo, hi) = self.participants();
        lo == reg || hi == reg
    }

    /// The participant that isn't `reg`, or `None` if `reg` isn't in the room.
    pub fn other(&self, reg: &str) -> Option<&str> {
        match self.participants() {
            (lo, hi) if lo == reg => Some(hi),
            (lo, hi) if hi == reg => Some(lo),
            _ => None,
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(room: RoomId) -> Self {
        room.key
    }
}

/// A persisted chat message. Only `read_by` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub room: RoomId,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub read_by: Vec<String>,
}

impl ChatMessage {
    /// New unread message stamped with the current time at millisecond
    /// precision, which is what the message log stores.
    pub fn new(room: RoomId, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room,
            sender: sender.into(),
            text: text.into(),
            timestamp: Utc::now().trunc_subsecs(3),
            read_by: Vec::new(),
        }
    }
}
