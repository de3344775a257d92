// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant account operations.

use instabridge_core::{BridgeError, TenantAccount};
use rusqlite::{params, OptionalExtension, Row};
use secrecy::{ExposeSecret, SecretString};

use crate::database::{storage_err, Database};

const ACCOUNT_COLUMNS: &str = "id, instagram_account_id, messaging_channel_id, username, \
                               access_token, created_at, updated_at";

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<TenantAccount> {
    Ok(TenantAccount {
        id: row.get(0)?,
        instagram_account_id: row.get(1)?,
        messaging_channel_id: row.get(2)?,
        username: row.get(3)?,
        access_token: SecretString::from(row.get::<_, String>(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Insert an account, or update identifiers, username, and token of an existing one.
///
/// A known `messaging_channel_id` is kept when the incoming record has none,
/// so relinking never forgets a channel ID learned from traffic.
pub async fn upsert_account(db: &Database, account: &TenantAccount) -> Result<(), BridgeError> {
    let id = account.id.clone();
    let instagram_account_id = account.instagram_account_id.clone();
    let messaging_channel_id = account.messaging_channel_id.clone();
    let username = account.username.clone();
    let token = account.access_token.expose_secret().to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO accounts (id, instagram_account_id, messaging_channel_id, username, access_token)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     instagram_account_id = excluded.instagram_account_id,
                     messaging_channel_id = COALESCE(excluded.messaging_channel_id, accounts.messaging_channel_id),
                     username = excluded.username,
                     access_token = excluded.access_token,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id, instagram_account_id, messaging_channel_id, username, token],
            )?;
            Ok(())
        })
        .await
        .map_err(storage_err)
}

/// Get an account by internal ID.
pub async fn get_account(db: &Database, id: &str) -> Result<Option<TenantAccount>, BridgeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<TenantAccount>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                row_to_account,
            )
            .optional()
        })
        .await
        .map_err(storage_err)
}

/// List all accounts, oldest first.
pub async fn list_accounts(db: &Database) -> Result<Vec<TenantAccount>, BridgeError> {
    db.connection()
        .call(|conn| -> Result<Vec<TenantAccount>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_account)?;
            rows.collect()
        })
        .await
        .map_err(storage_err)
}

/// Find the account that owns a business-side Instagram ID.
///
/// Matches either identifier; when several tenants claim the same ID the
/// most recently updated one wins.
pub async fn find_account_by_business_id(
    db: &Database,
    business_id: &str,
) -> Result<Option<TenantAccount>, BridgeError> {
    let business_id = business_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<TenantAccount>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE instagram_account_id = ?1 OR messaging_channel_id = ?1
                     ORDER BY updated_at DESC LIMIT 1"
                ),
                params![business_id],
                row_to_account,
            )
            .optional()
        })
        .await
        .map_err(storage_err)
}

/// Record the channel ID observed on webhook or conversation traffic.
pub async fn update_messaging_channel_id(
    db: &Database,
    account_id: &str,
    channel_id: &str,
) -> Result<(), BridgeError> {
    let account_id = account_id.to_string();
    let channel_id = channel_id.to_string();
    let updated = db
        .connection()
        .call({
            let account_id = account_id.clone();
            move |conn| -> Result<usize, rusqlite::Error> {
                set_channel_id(conn, &account_id, &channel_id)
            }
        })
        .await
        .map_err(storage_err)?;

    if updated == 0 {
        return Err(BridgeError::NotFound {
            entity: "account".into(),
            id: account_id,
        });
    }
    Ok(())
}

/// Shared by the standalone update and the sync-batch transaction.
pub(crate) fn set_channel_id(
    conn: &rusqlite::Connection,
    account_id: &str,
    channel_id: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE accounts SET messaging_channel_id = ?2,
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        params![account_id, channel_id],
    )
}
