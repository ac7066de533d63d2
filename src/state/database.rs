//! SQLite chat store with WAL mode and schema versioning.

use crate::state::schema;
use crate::tools::ToolOutput;
use crate::types::*;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{info, warn};

/// Fixed-width timestamps so `ORDER BY` on the text column is chronological.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Persisted chats and messages, scoped by user id.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else if version > schema::SCHEMA_VERSION {
            bail!(
                "Database schema v{} is newer than this build supports (v{})",
                version,
                schema::SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Get the current schema version (0 if uninitialized).
    fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Chats
    // -----------------------------------------------------------------------

    /// Create an empty chat owned by `user_id`.
    pub fn create_chat(&self, user_id: &str, title: &str) -> Result<ChatRecord> {
        let id = ulid::Ulid::new().to_string();
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO chats (id, user_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, user_id, title, timestamp(now)],
            )
            .context("Failed to create chat")?;

        Ok(ChatRecord {
            id,
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// All of a user's chats, most recently active first.
    pub fn get_chats(&self, user_id: &str) -> Result<Vec<ChatRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, created_at, updated_at FROM chats
             WHERE user_id = ?1 ORDER BY updated_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ChatRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                messages: Vec::new(),
                created_at: parse_timestamp(&row.get::<_, String>(2)?),
                updated_at: parse_timestamp(&row.get::<_, String>(3)?),
            })
        })?;

        let mut chats = Vec::new();
        for row in rows {
            let mut chat = row?;
            chat.messages = self.load_messages(&chat.id)?;
            chats.push(chat);
        }
        Ok(chats)
    }

    /// One chat with its messages, if it exists and belongs to `user_id`.
    pub fn get_chat(&self, chat_id: &str, user_id: &str) -> Result<Option<ChatRecord>> {
        let chat = self
            .conn
            .query_row(
                "SELECT id, title, created_at, updated_at FROM chats
                 WHERE id = ?1 AND user_id = ?2",
                params![chat_id, user_id],
                |row| {
                    Ok(ChatRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        messages: Vec::new(),
                        created_at: parse_timestamp(&row.get::<_, String>(2)?),
                        updated_at: parse_timestamp(&row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;

        match chat {
            Some(mut chat) => {
                chat.messages = self.load_messages(&chat.id)?;
                Ok(Some(chat))
            }
            None => Ok(None),
        }
    }

    fn load_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT role, text, tool_output_json, created_at FROM messages
             WHERE chat_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![chat_id], |row| {
            let role: String = row.get(0)?;
            let role = role.parse::<Role>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
            })?;
            Ok((
                role,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, text, tool_json, created_at) = row?;
            let tool_output = tool_json.and_then(|json| {
                serde_json::from_str::<ToolOutput>(&json)
                    .map_err(|e| warn!("Dropping unreadable tool output in chat {}: {}", chat_id, e))
                    .ok()
            });
            messages.push(StoredMessage {
                role,
                text,
                tool_output,
                created_at: parse_timestamp(&created_at),
            });
        }
        Ok(messages)
    }

    /// Append a message and bump the chat's `updated_at`.
    ///
    /// Fails if the chat does not exist or belongs to another user.
    pub fn add_message(
        &self,
        chat_id: &str,
        user_id: &str,
        role: Role,
        text: &str,
        tool_output: Option<&ToolOutput>,
    ) -> Result<()> {
        let owned: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM chats WHERE id = ?1 AND user_id = ?2",
                params![chat_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            bail!("Chat not found or access denied");
        }

        let tool_json = tool_output.map(serde_json::to_string).transpose()?;
        let now = timestamp(Utc::now());

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO messages (chat_id, role, text, tool_output_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![chat_id, role.to_string(), text, tool_json, now],
        )?;
        tx.execute(
            "UPDATE chats SET updated_at = ?1 WHERE id = ?2",
            params![now, chat_id],
        )?;
        tx.commit().context("Failed to add message")?;
        Ok(())
    }

    /// Rename a chat. Returns `false` if nothing matched.
    pub fn update_chat_title(&self, chat_id: &str, user_id: &str, title: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE chats SET title = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![title, timestamp(Utc::now()), chat_id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a chat and its messages. Returns `false` if nothing matched.
    pub fn delete_chat(&self, chat_id: &str, user_id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM chats WHERE id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    /// Delete every chat the user owns. Returns how many were removed.
    pub fn delete_all_chats(&self, user_id: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM chats WHERE user_id = ?1", params![user_id])?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::wikipedia::WikipediaResult;

    fn not_found(query: &str) -> ToolOutput {
        ToolOutput::Wikipedia(WikipediaResult::NotFound {
            message: "nothing".into(),
            query: query.into(),
            suggestions: vec!["Check spelling".into()],
        })
    }

    #[test]
    fn messages_keep_insertion_order_and_tool_output() {
        let db = Database::open_memory().unwrap();
        let chat = db.create_chat("alice", "New Chat").unwrap();

        db.add_message(&chat.id, "alice", Role::User, "first", None).unwrap();
        db.add_message(&chat.id, "alice", Role::Bot, "second", Some(&not_found("x")))
            .unwrap();
        db.add_message(&chat.id, "alice", Role::User, "third", None).unwrap();

        let loaded = db.get_chat(&chat.id, "alice").unwrap().unwrap();
        let texts: Vec<_> = loaded.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(loaded.messages[1].role, Role::Bot);
        assert_eq!(loaded.messages[1].tool_output, Some(not_found("x")));
        assert!(loaded.messages[0].tool_output.is_none());
    }

    #[test]
    fn chats_are_scoped_by_user() {
        let db = Database::open_memory().unwrap();
        let chat = db.create_chat("alice", "Private").unwrap();

        assert!(db.get_chat(&chat.id, "mallory").unwrap().is_none());
        assert!(db.get_chats("mallory").unwrap().is_empty());

        let err = db
            .add_message(&chat.id, "mallory", Role::User, "hi", None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Chat not found or access denied");

        assert!(!db.update_chat_title(&chat.id, "mallory", "pwned").unwrap());
        assert!(!db.delete_chat(&chat.id, "mallory").unwrap());
        assert_eq!(db.get_chat(&chat.id, "alice").unwrap().unwrap().title, "Private");
    }

    #[test]
    fn most_recently_active_chat_comes_first() {
        let db = Database::open_memory().unwrap();
        let older = db.create_chat("alice", "older").unwrap();
        db.create_chat("alice", "newer").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        db.add_message(&older.id, "alice", Role::User, "bump", None).unwrap();

        let titles: Vec<_> = db
            .get_chats("alice")
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, ["older", "newer"]);
    }

    #[test]
    fn deleting_a_chat_cascades_to_messages() {
        let db = Database::open_memory().unwrap();
        let chat = db.create_chat("alice", "doomed").unwrap();
        db.add_message(&chat.id, "alice", Role::User, "hello", None).unwrap();

        assert!(db.delete_chat(&chat.id, "alice").unwrap());
        let orphans: u32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn delete_all_only_touches_one_user() {
        let db = Database::open_memory().unwrap();
        db.create_chat("alice", "a1").unwrap();
        db.create_chat("alice", "a2").unwrap();
        db.create_chat("bob", "b1").unwrap();

        assert_eq!(db.delete_all_chats("alice").unwrap(), 2);
        assert!(db.get_chats("alice").unwrap().is_empty());
        assert_eq!(db.get_chats("bob").unwrap().len(), 1);
    }

    #[test]
    fn reopening_a_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chats.db");
        let id = {
            let db = Database::open(&path).unwrap();
            let chat = db.create_chat("alice", "persisted").unwrap();
            db.add_message(&chat.id, "alice", Role::User, "hi", None).unwrap();
            chat.id
        };

        let db = Database::open(&path).unwrap();
        let chat = db.get_chat(&id, "alice").unwrap().unwrap();
        assert_eq!(chat.messages.len(), 1);
    }
}
