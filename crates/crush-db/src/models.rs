/// Database row types — these map directly to SQLite rows.
/// Distinct from crush-types models to keep the DB layer independent.

pub struct MessageRow {
    pub id: String,
    pub room: String,
    pub sender: String,
    pub text: String,
    pub created_at: String,
}

pub struct ReadRow {
    pub message_id: String,
    pub reader: String,
}
