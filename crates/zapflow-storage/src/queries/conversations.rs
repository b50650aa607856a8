// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookups, reactivation, and soft deletion.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{Conversation, ConversationStatus, DeletedReason};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_col, opt_enum_col, optional};

const CONVERSATION_COLUMNS: &str = "id, tenant_id, channel_id, contact_id, status, deleted_at, \
     deleted_reason, last_message_preview, last_message_at, last_inbound_at, created_at, updated_at";

/// Longest preview stored on a conversation, in characters.
const PREVIEW_CHARS: usize = 120;

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel_id: row.get(2)?,
        contact_id: row.get(3)?,
        status: enum_col(row, 4)?,
        deleted_at: row.get(5)?,
        deleted_reason: opt_enum_col(row, 6)?,
        last_message_preview: row.get(7)?,
        last_message_at: row.get(8)?,
        last_inbound_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn fetch(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Conversation>> {
    let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
    optional(conn.query_row(&sql, params![id], row_to_conversation))
}

/// Insert a conversation.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), ZapflowError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, tenant_id, channel_id, contact_id, status,
                     deleted_at, deleted_reason, last_message_preview, last_message_at,
                     last_inbound_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    c.id,
                    c.tenant_id,
                    c.channel_id,
                    c.contact_id,
                    c.status.to_string(),
                    c.deleted_at,
                    c.deleted_reason.map(|r| r.to_string()),
                    c.last_message_preview,
                    c.last_message_at,
                    c.last_inbound_at,
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| fetch(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// The live (non-deleted) conversation for a triple.
pub async fn find_active_conversation(
    db: &Database,
    tenant_id: &str,
    channel_id: &str,
    contact_id: &str,
) -> Result<Option<Conversation>, ZapflowError> {
    let key = (tenant_id.to_string(), channel_id.to_string(), contact_id.to_string());
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE tenant_id = ?1 AND channel_id = ?2 AND contact_id = ?3
                   AND deleted_at IS NULL
                 LIMIT 1"
            );
            optional(conn.query_row(&sql, params![key.0, key.1, key.2], row_to_conversation))
        })
        .await
        .map_err(map_tr_err)
}

/// The most recently soft-deleted conversation for a triple.
pub async fn find_latest_deleted_conversation(
    db: &Database,
    tenant_id: &str,
    channel_id: &str,
    contact_id: &str,
) -> Result<Option<Conversation>, ZapflowError> {
    let key = (tenant_id.to_string(), channel_id.to_string(), contact_id.to_string());
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE tenant_id = ?1 AND channel_id = ?2 AND contact_id = ?3
                   AND deleted_at IS NOT NULL
                 ORDER BY deleted_at DESC, rowid DESC
                 LIMIT 1"
            );
            optional(conn.query_row(&sql, params![key.0, key.1, key.2], row_to_conversation))
        })
        .await
        .map_err(map_tr_err)
}

/// Clear deletion markers and reopen a conversation.
///
/// Refuses tombstones (`user_deleted`) at the storage layer as well.
pub async fn reactivate_conversation(db: &Database, id: &str) -> Result<Conversation, ZapflowError> {
    let key = id.to_string();
    let now = now_ts();
    let reactivated = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations
                 SET deleted_at = NULL, deleted_reason = NULL, status = 'open', updated_at = ?1
                 WHERE id = ?2
                   AND (deleted_reason IS NULL OR deleted_reason <> 'user_deleted')",
                params![now, key],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            fetch(conn, &key)
        })
        .await
        .map_err(map_tr_err)?;
    reactivated.ok_or_else(|| {
        ZapflowError::Validation(format!(
            "conversation {id} does not exist or is a tombstone and cannot be reactivated"
        ))
    })
}

/// Update the last-message preview.
///
/// Inbound traffic also stamps `last_inbound_at` and reopens a resolved conversation.
pub async fn touch_conversation(
    db: &Database,
    id: &str,
    preview: &str,
    at: &str,
    inbound: bool,
) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let preview: String = preview.chars().take(PREVIEW_CHARS).collect();
    let at = at.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET last_message_preview = ?1,
                     last_message_at = ?2,
                     last_inbound_at = CASE WHEN ?3 THEN ?2 ELSE last_inbound_at END,
                     status = CASE WHEN ?3 THEN 'open' ELSE status END,
                     updated_at = ?4
                 WHERE id = ?5",
                params![preview, at, inbound, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set a conversation's open/resolved status.
pub async fn set_conversation_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete a conversation with the given reason.
pub async fn soft_delete_conversation(
    db: &Database,
    id: &str,
    reason: DeletedReason,
    at: &str,
) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET deleted_at = ?1, deleted_reason = ?2, updated_at = ?1
                 WHERE id = ?3",
                params![at, reason.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
