use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::warn;

use crush_types::models::{ChatMessage, RoomId};

use crate::models::{MessageRow, ReadRow};
use crate::{Database, MessageLog};

impl Database {
    // -- Messages --

    pub fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, room, sender, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id.to_string(),
                    message.room.as_str(),
                    message.sender,
                    message.text,
                    message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_room_messages(&self, room: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_room_messages(conn, room))
    }

    pub fn get_room_reads(&self, room: &str) -> Result<Vec<ReadRow>> {
        self.with_conn(|conn| query_room_reads(conn, room))
    }

    // -- Read receipts --

    /// Set-union `reader` into every message of `room`. Messages already
    /// read by `reader` are left alone, so repeating the call is a no-op.
    pub fn mark_room_read(&self, room: &str, reader: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO message_reads (message_id, reader)
                 SELECT id, ?2 FROM messages WHERE room = ?1",
                rusqlite::params![room, reader],
            )?;
            Ok(changed)
        })
    }
}

impl MessageLog for Database {
    fn append(&self, message: &ChatMessage) -> Result<()> {
        self.insert_message(message)
    }

    fn history(&self, room: &RoomId) -> Result<Vec<ChatMessage>> {
        let rows = self.get_room_messages(room.as_str())?;
        let reads = self.get_room_reads(room.as_str())?;

        let mut read_map: HashMap<String, Vec<String>> = HashMap::new();
        for r in reads {
            read_map.entry(r.message_id).or_default().push(r.reader);
        }

        rows.into_iter()
            .map(|row| {
                let read_by = read_map.remove(&row.id).unwrap_or_default();
                to_message(row, room, read_by)
            })
            .collect()
    }

    fn mark_read(&self, room: &RoomId, reader: &str) -> Result<usize> {
        self.mark_room_read(room.as_str(), reader)
    }
}

fn to_message(row: MessageRow, room: &RoomId, read_by: Vec<String>) -> Result<ChatMessage> {
    if row.room != room.as_str() {
        warn!("Message '{}' filed under '{}' while loading '{}'", row.id, row.room, room);
    }
    Ok(ChatMessage {
        id: row
            .id
            .parse()
            .with_context(|| format!("corrupt message id '{}'", row.id))?,
        room: room.clone(),
        sender: row.sender,
        text: row.text,
        timestamp: DateTime::parse_from_rfc3339(&row.created_at)
            .with_context(|| format!("corrupt created_at '{}' on message '{}'", row.created_at, row.id))?
            .with_timezone(&Utc),
        read_by,
    })
}

fn query_room_messages(conn: &Connection, room: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, room, sender, text, created_at
         FROM messages
         WHERE room = ?1
         ORDER BY created_at ASC, seq ASC",
    )?;

    let rows = stmt
        .query_map([room], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                room: row.get(1)?,
                sender: row.get(2)?,
                text: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_room_reads(conn: &Connection, room: &str) -> Result<Vec<ReadRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.message_id, r.reader
         FROM message_reads r
         JOIN messages m ON m.id = r.message_id
         WHERE m.room = ?1
         ORDER BY r.rowid ASC",
    )?;

    let rows = stmt
        .query_map([room], |row| {
            Ok(ReadRow {
                message_id: row.get(0)?,
                reader: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn room() -> RoomId {
        RoomId::for_pair("20123456", "20123457")
    }

    #[test]
    fn history_is_oldest_first_and_scoped_to_room() {
        let db = Database::open_in_memory().unwrap();
        let mut later = ChatMessage::new(room(), "20123456", "second");
        let earlier = ChatMessage::new(room(), "20123457", "first");
        later.timestamp = earlier.timestamp + Duration::seconds(1);
        let elsewhere = ChatMessage::new(RoomId::for_pair("20111111", "20123456"), "20123456", "other");

        db.append(&later).unwrap();
        db.append(&earlier).unwrap();
        db.append(&elsewhere).unwrap();

        let history = db.history(&room()).unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(history[0], earlier);
    }

    #[test]
    fn same_timestamp_keeps_insert_order() {
        let db = Database::open_in_memory().unwrap();
        let first = ChatMessage::new(room(), "20123456", "hi");
        let mut second = ChatMessage::new(room(), "20123456", "there");
        second.timestamp = first.timestamp;

        db.append(&first).unwrap();
        db.append(&second).unwrap();

        let texts: Vec<_> = db.history(&room()).unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["hi", "there"]);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.append(&ChatMessage::new(room(), "20123456", "a")).unwrap();
        db.append(&ChatMessage::new(room(), "20123456", "b")).unwrap();

        assert_eq!(db.mark_read(&room(), "20123457").unwrap(), 2);
        let after_first = db.history(&room()).unwrap();

        assert_eq!(db.mark_read(&room(), "20123457").unwrap(), 0);
        let after_second = db.history(&room()).unwrap();

        assert_eq!(after_first, after_second);
        assert!(after_second.iter().all(|m| m.read_by == ["20123457"]));
    }

    #[test]
    fn read_set_grows_with_new_messages() {
        let db = Database::open_in_memory().unwrap();
        db.append(&ChatMessage::new(room(), "20123456", "a")).unwrap();
        db.mark_read(&room(), "20123457").unwrap();
        db.append(&ChatMessage::new(room(), "20123456", "b")).unwrap();

        assert_eq!(db.mark_read(&room(), "20123457").unwrap(), 1);
        assert_eq!(db.mark_read(&room(), "20123456").unwrap(), 2);

        let history = db.history(&room()).unwrap();
        assert_eq!(history[0].read_by, ["20123457", "20123456"]);
        assert_eq!(history[1].read_by, ["20123457", "20123456"]);
    }

    #[test]
    fn empty_room_has_no_history() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.history(&room()).unwrap().is_empty());
        assert_eq!(db.mark_read(&room(), "20123457").unwrap(), 0);
    }
}
