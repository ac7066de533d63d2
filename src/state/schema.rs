//! Database schema definitions.

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Full DDL for the chat store.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- One row per conversation, owned by a single user
CREATE TABLE IF NOT EXISTS chats (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    title       TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Messages; seq gives insertion order within a chat
CREATE TABLE IF NOT EXISTS messages (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id          TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    role             TEXT NOT NULL,
    text             TEXT NOT NULL,
    tool_output_json TEXT,
    created_at       TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_chats_user_updated ON chats(user_id, updated_at);
CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, seq);
"#;
