// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic commit of a sync run.

use instabridge_core::{BridgeError, CommitOutcome, SyncBatch};
use tracing::debug;

use super::accounts::set_channel_id;
use super::messages::insert_row;
use crate::database::{is_unique_violation, storage_err, Database};

/// Apply a sync batch in one transaction.
///
/// The channel-ID correction and every message insert land together. Each
/// insert runs in its own savepoint so a message stored concurrently (by a
/// webhook, say) is counted as a duplicate without aborting the batch. Any
/// other failure rolls back everything.
pub async fn commit_sync_batch(
    db: &Database,
    batch: SyncBatch,
) -> Result<CommitOutcome, BridgeError> {
    let account_id = batch.account_id.clone();
    let staged = batch.messages.len();

    let outcome = db
        .connection()
        .call(move |conn| -> Result<Option<CommitOutcome>, rusqlite::Error> {
            let mut tx = conn.transaction()?;

            if let Some(channel_id) = &batch.messaging_channel_id
                && set_channel_id(&tx, &batch.account_id, channel_id)? == 0
            {
                return Ok(None);
            }

            let mut outcome = CommitOutcome::default();
            for message in &batch.messages {
                let sp = tx.savepoint()?;
                match insert_row(&sp, message) {
                    Ok(_) => {
                        sp.commit()?;
                        outcome.inserted += 1;
                    }
                    // Dropping the savepoint rolls the failed insert back.
                    Err(e) if is_unique_violation(&e) => outcome.duplicates += 1,
                    Err(e) => return Err(e),
                }
            }

            tx.commit()?;
            Ok(Some(outcome))
        })
        .await
        .map_err(storage_err)?;

    let outcome = outcome.ok_or_else(|| BridgeError::NotFound {
        entity: "account".into(),
        id: account_id.clone(),
    })?;
    debug!(
        account_id = %account_id,
        staged,
        inserted = outcome.inserted,
        duplicates = outcome.duplicates,
        "sync batch committed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::{get_account, upsert_account};
    use crate::queries::messages::{insert_message, list_messages};
    use chrono::Utc;
    use instabridge_core::{DeliveryStatus, Direction, Message, TenantAccount};
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
                username: None,
                access_token: SecretString::from("tok".to_string()),
                created_at: String::new(),
                updated_at: String::new(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    fn synced(id: &str, account_id: &str) -> Message {
        Message {
            id: id.to_string(),
            account_id: account_id.to_string(),
            sender_id: "200".into(),
            recipient_id: "999".into(),
            message_text: Some("hello".into()),
            attachments: None,
            timestamp: Utc::now(),
            direction: Direction::Inbound,
            delivery_status: DeliveryStatus::Synced,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn commits_correction_and_messages_together() {
        let (db, _dir) = setup_db().await;
        let mut batch = SyncBatch::new("acct-1");
        batch.messaging_channel_id = Some("999".into());
        batch.messages = vec![synced("m1", "acct-1"), synced("m2", "acct-1")];

        let outcome = commit_sync_batch(&db, batch).await.unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.duplicates, 0);

        let account = get_account(&db, "acct-1").await.unwrap().unwrap();
        assert_eq!(account.messaging_channel_id.as_deref(), Some("999"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_duplicates_are_counted_not_fatal() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &synced("m1", "acct-1")).await.unwrap();

        let mut batch = SyncBatch::new("acct-1");
        batch.messages = vec![synced("m1", "acct-1"), synced("m2", "acct-1")];
        let outcome = commit_sync_batch(&db, batch).await.unwrap();

        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(list_messages(&db, "acct-1", None).await.unwrap().len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failure_rolls_back_the_whole_batch() {
        let (db, _dir) = setup_db().await;
        let mut batch = SyncBatch::new("acct-1");
        batch.messaging_channel_id = Some("999".into());
        // Unknown account violates the foreign key.
        batch.messages = vec![synced("m1", "acct-1"), synced("m2", "ghost")];

        assert!(commit_sync_batch(&db, batch).await.is_err());

        let account = get_account(&db, "acct-1").await.unwrap().unwrap();
        assert!(account.messaging_channel_id.is_none());
        assert!(list_messages(&db, "acct-1", None).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let (db, _dir) = setup_db().await;
        let mut batch = SyncBatch::new("ghost");
        batch.messaging_channel_id = Some("999".into());

        let err = commit_sync_batch(&db, batch).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { .. }));
        db.close().await.unwrap();
    }
}
