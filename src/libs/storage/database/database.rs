use crate::libs::storage::storage_traits::StoreError;
use rusqlite::Connection;
use tracing::info;

/// Creates the schema if it does not exist. Idempotent; safe to run on
/// every pool checkout during startup.
pub(crate) fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'guest',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,

            CHECK (role IN ('guest', 'host', 'admin')),
            CHECK (is_active IN (0, 1))
        );

        CREATE TABLE IF NOT EXISTS conversations (
            conversation_id TEXT PRIMARY KEY,
            title TEXT,
            is_group INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,

            FOREIGN KEY (created_by) REFERENCES users(user_id),

            CHECK (is_group IN (0, 1))
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_updated_at
            ON conversations(updated_at);

        CREATE TABLE IF NOT EXISTS participants (
            conversation_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            joined_at INTEGER NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,

            PRIMARY KEY (conversation_id, user_id),
            FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE,

            CHECK (is_admin IN (0, 1)),
            CHECK (is_active IN (0, 1))
        );
        CREATE INDEX IF NOT EXISTS idx_participants_user_id
            ON participants(user_id);

        CREATE TABLE IF NOT EXISTS messages (
            message_id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            is_edited INTEGER NOT NULL DEFAULT 0,
            edited_at INTEGER,
            reply_to TEXT,

            FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id) ON DELETE CASCADE,
            FOREIGN KEY (sender_id) REFERENCES users(user_id),

            CHECK (is_edited IN (0, 1))
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation_id_created_at
            ON messages(conversation_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_reply_to
            ON messages(reply_to);

        CREATE TABLE IF NOT EXISTS read_receipts (
            message_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            read_at INTEGER NOT NULL,

            PRIMARY KEY (message_id, user_id),
            FOREIGN KEY (message_id) REFERENCES messages(message_id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
        );",
    )?;

    info!("database schema ready");
    Ok(())
}
