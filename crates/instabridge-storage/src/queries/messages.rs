// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.

use instabridge_core::{BridgeError, ConversationSummary, Message};
use rusqlite::{params, OptionalExtension, Row};

use super::parse_column;
use crate::database::{is_unique_violation, storage_err, Database};

const MESSAGE_COLUMNS: &str = "id, account_id, sender_id, recipient_id, message_text, \
                               attachments, timestamp, direction, delivery_status, idempotency_key";

pub(crate) fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        account_id: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        message_text: row.get(4)?,
        attachments: row.get(5)?,
        timestamp: row.get(6)?,
        direction: parse_column(7, row.get(7)?)?,
        delivery_status: parse_column(8, row.get(8)?)?,
        idempotency_key: row.get(9)?,
    })
}

/// Raw insert shared by single inserts and sync-batch commits.
pub(crate) fn insert_row(conn: &rusqlite::Connection, msg: &Message) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
        params![
            msg.id,
            msg.account_id,
            msg.sender_id,
            msg.recipient_id,
            msg.message_text,
            msg.attachments,
            msg.timestamp,
            msg.direction.to_string(),
            msg.delivery_status.to_string(),
            msg.idempotency_key,
        ],
    )
}

/// Insert a new message.
///
/// A primary-key or idempotency-key collision is reported as
/// [`BridgeError::DuplicateMessage`].
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), BridgeError> {
    let msg = msg.clone();
    let id = msg.id.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            match insert_row(conn, &msg) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(storage_err)?;

    if inserted {
        Ok(())
    } else {
        Err(BridgeError::DuplicateMessage { id })
    }
}

/// Returns true if a message with this provider ID is stored.
pub async fn message_exists(db: &Database, id: &str) -> Result<bool, BridgeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(storage_err)
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, BridgeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(storage_err)
}

pub async fn get_message_by_idempotency_key(
    db: &Database,
    key: &str,
) -> Result<Option<Message>, BridgeError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE idempotency_key = ?1"),
                params![key],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(storage_err)
}

/// Get messages for an account in chronological order.
pub async fn list_messages(
    db: &Database,
    account_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, BridgeError> {
    let account_id = account_id.to_string();
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.unwrap_or(-1);
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE account_id = ?1
                 ORDER BY timestamp ASC, id ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![account_id, limit], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(storage_err)
}

/// Stored conversations of an account, one per customer, newest activity first.
///
/// The customer is the sender of inbound messages and the recipient of
/// outbound ones.
pub async fn get_conversations_for_account(
    db: &Database,
    account_id: &str,
    limit: i64,
) -> Result<Vec<ConversationSummary>, BridgeError> {
    let account_id = account_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ConversationSummary>, rusqlite::Error> {
            // SQLite fills bare columns from the row holding MAX(timestamp).
            let mut stmt = conn.prepare(
                "SELECT CASE WHEN direction = 'inbound' THEN sender_id ELSE recipient_id END AS customer_id,
                        MAX(timestamp) AS last_message_at,
                        message_text,
                        COUNT(*)
                 FROM messages
                 WHERE account_id = ?1
                 GROUP BY customer_id
                 ORDER BY last_message_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![account_id, limit], |row| {
                Ok(ConversationSummary {
                    customer_id: row.get(0)?,
                    last_message_at: row.get(1)?,
                    last_message_text: row.get(2)?,
                    message_count: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(storage_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::upsert_account;
    use chrono::{Duration, TimeZone, Utc};
    use instabridge_core::{DeliveryStatus, Direction, TenantAccount};
    use secrecy::SecretString;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        upsert_account(
            &db,
            &TenantAccount {
                id: "acct-1".into(),
                instagram_account_id: Some("100".into()),
                messaging_channel_id: None,
                username: Some("shop".into()),
                access_token: SecretString::from("tok".to_string()),
                created_at: String::new(),
                updated_at: String::new(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    fn make_message(id: &str, customer: &str, direction: Direction, minutes: i64) -> Message {
        let (sender_id, recipient_id) = match direction {
            Direction::Inbound => (customer.to_string(), "100".to_string()),
            Direction::Outbound => ("100".to_string(), customer.to_string()),
        };
        Message {
            id: id.to_string(),
            account_id: "acct-1".to_string(),
            sender_id,
            recipient_id,
            message_text: Some(format!("text {id}")),
            attachments: None,
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
            direction,
            delivery_status: DeliveryStatus::Synced,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let (db, _dir) = setup_db().await;
        let msg = make_message("m1", "200", Direction::Inbound, 0);
        insert_message(&db, &msg).await.unwrap();

        assert!(message_exists(&db, "m1").await.unwrap());
        assert!(!message_exists(&db, "m2").await.unwrap());
        assert_eq!(get_message(&db, "m1").await.unwrap(), Some(msg));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_id_is_reported() {
        let (db, _dir) = setup_db().await;
        let msg = make_message("m1", "200", Direction::Inbound, 0);
        insert_message(&db, &msg).await.unwrap();

        let err = insert_message(&db, &msg).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(list_messages(&db, "acct-1", None).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn idempotency_key_lookup_and_collision() {
        let (db, _dir) = setup_db().await;
        let mut first = make_message("m1", "200", Direction::Outbound, 0);
        first.idempotency_key = Some("req-7".into());
        insert_message(&db, &first).await.unwrap();

        let found = get_message_by_idempotency_key(&db, "req-7").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some("m1".to_string()));

        let mut second = make_message("m2", "200", Direction::Outbound, 1);
        second.idempotency_key = Some("req-7".into());
        assert!(insert_message(&db, &second).await.unwrap_err().is_duplicate());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_is_chronological_and_limited() {
        let (db, _dir) = setup_db().await;
        for (id, minutes) in [("m3", 30), ("m1", 10), ("m2", 20)] {
            insert_message(&db, &make_message(id, "200", Direction::Inbound, minutes))
                .await
                .unwrap();
        }

        let all = list_messages(&db, "acct-1", None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);

        let limited = list_messages(&db, "acct-1", Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn conversations_group_by_customer() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &make_message("a1", "200", Direction::Inbound, 0))
            .await
            .unwrap();
        insert_message(&db, &make_message("a2", "200", Direction::Outbound, 5))
            .await
            .unwrap();
        insert_message(&db, &make_message("b1", "300", Direction::Inbound, 2))
            .await
            .unwrap();

        let summaries = get_conversations_for_account(&db, "acct-1", 10).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].customer_id, "200");
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].last_message_text.as_deref(), Some("text a2"));
        assert_eq!(summaries[1].customer_id, "300");
        assert_eq!(summaries[1].message_count, 1);
        db.close().await.unwrap();
    }
}
