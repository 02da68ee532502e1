use crate::libs::core::models::{
    ConversationId, MessageFilter, MessageId, Role, SortOrder, UserId,
};
use crate::libs::storage::database::database;
use crate::libs::storage::records::{
    ConversationRecord, MessageRecord, ParticipantRecord, ReadReceiptRecord, UserRecord,
};
use crate::libs::storage::storage_traits::{
    ConversationStore, EntityStore, MessageStore, ParticipantStore, ReceiptStore, Storage,
    StoreError, Transactional, UserStore,
};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, Transaction};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn_pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::new(manager)?;

        let conn = pool.get()?;
        database::run_migrations(&conn)?;
        info!(path, "sqlite store opened");

        Ok(Self { conn_pool: pool })
    }

    pub fn new_connection(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.conn_pool.get()?)
    }
}

impl Storage for SqliteStore {
    type Transaction<'s>
        = SqliteTransaction<'s>
    where
        Self: 's;
}

pub struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> SqliteTransaction<'conn> {
    pub fn new(
        conn: &'conn mut PooledConnection<SqliteConnectionManager>,
    ) -> Result<Self, StoreError> {
        let tx = conn.transaction()?;
        Ok(Self { tx })
    }

    pub fn inner(&self) -> &Transaction<'conn> {
        &self.tx
    }
}

impl Transactional for SqliteTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit()?)
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(self.tx.rollback()?)
    }
}

impl EntityStore for SqliteTransaction<'_> {}

fn column_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn column_time(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn column_role(row: &Row, idx: usize) -> rusqlite::Result<Role> {
    let text: String = row.get(idx)?;
    Role::parse(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown role `{text}`").into(),
        )
    })
}

fn row_to_user(row: &Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        user_id: UserId(column_uuid(row, 0)?),
        username: row.get(1)?,
        role: column_role(row, 2)?,
        is_active: row.get(3)?,
        created_at: column_time(row, 4)?,
    })
}

fn row_to_conversation(row: &Row) -> rusqlite::Result<ConversationRecord> {
    Ok(ConversationRecord {
        conversation_id: ConversationId(column_uuid(row, 0)?),
        title: row.get(1)?,
        is_group: row.get(2)?,
        created_by: UserId(column_uuid(row, 3)?),
        created_at: column_time(row, 4)?,
        updated_at: column_time(row, 5)?,
    })
}

fn row_to_participant(row: &Row) -> rusqlite::Result<ParticipantRecord> {
    Ok(ParticipantRecord {
        conversation_id: ConversationId(column_uuid(row, 0)?),
        user_id: UserId(column_uuid(row, 1)?),
        joined_at: column_time(row, 2)?,
        is_admin: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<MessageRecord> {
    let edited_at = match row.get::<_, Option<i64>>(6)? {
        Some(_) => Some(column_time(row, 6)?),
        None => None,
    };
    let reply_to = match row.get::<_, Option<String>>(7)? {
        Some(_) => Some(MessageId(column_uuid(row, 7)?)),
        None => None,
    };
    Ok(MessageRecord {
        message_id: MessageId(column_uuid(row, 0)?),
        conversation_id: ConversationId(column_uuid(row, 1)?),
        sender_id: UserId(column_uuid(row, 2)?),
        content: row.get(3)?,
        created_at: column_time(row, 4)?,
        is_edited: row.get(5)?,
        edited_at,
        reply_to,
    })
}

const MESSAGE_COLUMNS: &str =
    "message_id, conversation_id, sender_id, content, created_at, is_edited, edited_at, reply_to";

/// Appends the caller-supplied filter to a message query. The conversation
/// scope predicate is already in place before this runs.
fn push_message_filter(sql: &mut String, values: &mut Vec<Value>, filter: &MessageFilter) {
    if let Some(sender) = filter.sender {
        sql.push_str(" AND sender_id = ?");
        values.push(Value::from(sender.to_string()));
    }
    if let Some(after) = filter.sent_after {
        sql.push_str(" AND created_at >= ?");
        values.push(Value::from(after.timestamp_millis()));
    }
    if let Some(before) = filter.sent_before {
        sql.push_str(" AND created_at <= ?");
        values.push(Value::from(before.timestamp_millis()));
    }
    if let Some(needle) = &filter.content_contains {
        sql.push_str(" AND content LIKE ?");
        values.push(Value::from(format!("%{needle}%")));
    }
}

impl UserStore for SqliteTransaction<'_> {
    fn insert_user(&mut self, record: &UserRecord) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO users (user_id, username, role, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.user_id.to_string(),
                record.username,
                record.role.as_str(),
                record.is_active,
                record.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn load_user(&mut self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let user = self
            .tx
            .query_row(
                "SELECT user_id, username, role, is_active, created_at
                 FROM users WHERE user_id = ?1",
                params![user_id.to_string()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn load_user_by_name(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = self
            .tx
            .query_row(
                "SELECT user_id, username, role, is_active, created_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }
}

impl ConversationStore for SqliteTransaction<'_> {
    fn insert_conversation(&mut self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO conversations
                 (conversation_id, title, is_group, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.conversation_id.to_string(),
                record.title,
                record.is_group,
                record.created_by.to_string(),
                record.created_at.timestamp_millis(),
                record.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn load_conversation(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        let conversation = self
            .tx
            .query_row(
                "SELECT conversation_id, title, is_group, created_by, created_at, updated_at
                 FROM conversations WHERE conversation_id = ?1",
                params![conversation_id.to_string()],
                row_to_conversation,
            )
            .optional()?;
        Ok(conversation)
    }

    fn set_conversation_title(
        &mut self,
        conversation_id: ConversationId,
        title: Option<&str>,
    ) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE conversations SET title = ?1 WHERE conversation_id = ?2",
            params![title, conversation_id.to_string()],
        )?;
        Ok(())
    }

    fn touch_conversation(
        &mut self,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE conversation_id = ?2",
            params![at.timestamp_millis(), conversation_id.to_string()],
        )?;
        Ok(())
    }

    fn delete_conversation(&mut self, conversation_id: ConversationId) -> Result<(), StoreError> {
        // Participants, messages and receipts go with it via FK cascade.
        self.tx.execute(
            "DELETE FROM conversations WHERE conversation_id = ?1",
            params![conversation_id.to_string()],
        )?;
        Ok(())
    }

    fn conversations_for_user(
        &mut self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationRecord>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT c.conversation_id, c.title, c.is_group, c.created_by, c.created_at, c.updated_at
             FROM conversations c
             JOIN participants p ON p.conversation_id = c.conversation_id
             WHERE p.user_id = ?1 AND p.is_active = 1
             ORDER BY c.updated_at DESC, c.conversation_id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(
            params![user_id.to_string(), limit, offset],
            row_to_conversation,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn count_conversations_for_user(&mut self, user_id: UserId) -> Result<u64, StoreError> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*)
             FROM conversations c
             JOIN participants p ON p.conversation_id = c.conversation_id
             WHERE p.user_id = ?1 AND p.is_active = 1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl ParticipantStore for SqliteTransaction<'_> {
    fn insert_participant(&mut self, record: &ParticipantRecord) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO participants (conversation_id, user_id, joined_at, is_admin, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.conversation_id.to_string(),
                record.user_id.to_string(),
                record.joined_at.timestamp_millis(),
                record.is_admin,
                record.is_active,
            ],
        )?;
        Ok(())
    }

    fn load_participant(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        let participant = self
            .tx
            .query_row(
                "SELECT conversation_id, user_id, joined_at, is_admin, is_active
                 FROM participants WHERE conversation_id = ?1 AND user_id = ?2",
                params![conversation_id.to_string(), user_id.to_string()],
                row_to_participant,
            )
            .optional()?;
        Ok(participant)
    }

    fn set_participant_active(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
        active: bool,
    ) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE participants SET is_active = ?1
             WHERE conversation_id = ?2 AND user_id = ?3",
            params![active, conversation_id.to_string(), user_id.to_string()],
        )?;
        Ok(())
    }

    fn count_active_participants(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<u64, StoreError> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM participants
             WHERE conversation_id = ?1 AND is_active = 1",
            params![conversation_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl MessageStore for SqliteTransaction<'_> {
    fn insert_message(&mut self, record: &MessageRecord) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO messages
                 (message_id, conversation_id, sender_id, content, created_at,
                  is_edited, edited_at, reply_to)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.message_id.to_string(),
                record.conversation_id.to_string(),
                record.sender_id.to_string(),
                record.content,
                record.created_at.timestamp_millis(),
                record.is_edited,
                record.edited_at.map(|t| t.timestamp_millis()),
                record.reply_to.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    fn load_message(
        &mut self,
        message_id: MessageId,
    ) -> Result<Option<MessageRecord>, StoreError> {
        let message = self
            .tx
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
                params![message_id.to_string()],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    fn apply_edit(
        &mut self,
        message_id: MessageId,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tx.execute(
            "UPDATE messages SET content = ?1, is_edited = 1, edited_at = ?2
             WHERE message_id = ?3",
            params![
                content,
                edited_at.timestamp_millis(),
                message_id.to_string()
            ],
        )?;
        Ok(())
    }

    fn delete_message(&mut self, message_id: MessageId) -> Result<(), StoreError> {
        self.tx.execute(
            "DELETE FROM messages WHERE message_id = ?1",
            params![message_id.to_string()],
        )?;
        Ok(())
    }

    fn clear_replies_to(&mut self, message_id: MessageId) -> Result<u64, StoreError> {
        let touched = self.tx.execute(
            "UPDATE messages SET reply_to = NULL WHERE reply_to = ?1",
            params![message_id.to_string()],
        )?;
        Ok(touched as u64)
    }

    fn messages_for_conversation(
        &mut self,
        conversation_id: ConversationId,
        filter: &MessageFilter,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let mut sql =
            format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?");
        let mut values = vec![Value::from(conversation_id.to_string())];
        push_message_filter(&mut sql, &mut values, filter);

        let direction = order.as_sql();
        sql.push_str(&format!(
            " ORDER BY created_at {direction}, message_id {direction} LIMIT ? OFFSET ?"
        ));
        values.push(Value::from(limit));
        values.push(Value::from(offset));

        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), row_to_message)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn count_messages(
        &mut self,
        conversation_id: ConversationId,
        filter: &MessageFilter,
    ) -> Result<u64, StoreError> {
        let mut sql = String::from("SELECT COUNT(*) FROM messages WHERE conversation_id = ?");
        let mut values = vec![Value::from(conversation_id.to_string())];
        push_message_filter(&mut sql, &mut values, filter);

        let count: i64 =
            self.tx
                .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn last_message(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Option<MessageRecord>, StoreError> {
        let message = self
            .tx
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY created_at DESC, message_id DESC
                     LIMIT 1"
                ),
                params![conversation_id.to_string()],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    fn unread_messages_for(&mut self, user_id: UserId) -> Result<Vec<MessageRecord>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {cols} FROM messages m
             JOIN participants p ON p.conversation_id = m.conversation_id
             WHERE p.user_id = ?1 AND p.is_active = 1
               AND m.sender_id <> ?1
               AND NOT EXISTS (
                   SELECT 1 FROM read_receipts r
                   WHERE r.message_id = m.message_id AND r.user_id = ?1
               )
             ORDER BY m.created_at ASC, m.message_id ASC",
            cols = "m.message_id, m.conversation_id, m.sender_id, m.content, m.created_at, \
                    m.is_edited, m.edited_at, m.reply_to"
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_message)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl ReceiptStore for SqliteTransaction<'_> {
    fn insert_receipt(&mut self, record: &ReadReceiptRecord) -> Result<bool, StoreError> {
        let inserted = self.tx.execute(
            "INSERT OR IGNORE INTO read_receipts (message_id, user_id, read_at)
             VALUES (?1, ?2, ?3)",
            params![
                record.message_id.to_string(),
                record.user_id.to_string(),
                record.read_at.timestamp_millis(),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn has_receipt(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM read_receipts WHERE message_id = ?1 AND user_id = ?2",
            params![message_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
