// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbox message persistence and delivery status updates.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{DeliveryStatus, InboxMessage, StatusChange};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_col, opt_json_col, optional, to_json};

const MESSAGE_COLUMNS: &str = "id, conversation_id, tenant_id, channel_id, direction, kind, \
     content, payload, provider_message_id, status, error_code, error_detail, \
     campaign_recipient_id, reply_to, created_at, updated_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<InboxMessage> {
    Ok(InboxMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        tenant_id: row.get(2)?,
        channel_id: row.get(3)?,
        direction: enum_col(row, 4)?,
        kind: row.get(5)?,
        content: row.get(6)?,
        payload: opt_json_col(row, 7)?,
        provider_message_id: row.get(8)?,
        status: enum_col(row, 9)?,
        error_code: row.get(10)?,
        error_detail: row.get(11)?,
        campaign_recipient_id: row.get(12)?,
        reply_to: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// Insert a message.
pub async fn insert_message(db: &Database, message: &InboxMessage) -> Result<(), ZapflowError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            let payload = m.payload.as_ref().map(to_json).transpose()?;
            conn.execute(
                "INSERT INTO messages (id, conversation_id, tenant_id, channel_id, direction,
                     kind, content, payload, provider_message_id, status, error_code,
                     error_detail, campaign_recipient_id, reply_to, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    m.id,
                    m.conversation_id,
                    m.tenant_id,
                    m.channel_id,
                    m.direction.to_string(),
                    m.kind,
                    m.content,
                    payload,
                    m.provider_message_id,
                    m.status.to_string(),
                    m.error_code,
                    m.error_detail,
                    m.campaign_recipient_id,
                    m.reply_to,
                    m.created_at,
                    m.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find a message by the provider's identifier within a channel.
pub async fn find_message_by_provider_id(
    db: &Database,
    channel_id: &str,
    provider_message_id: &str,
) -> Result<Option<InboxMessage>, ZapflowError> {
    let channel_id = channel_id.to_string();
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE channel_id = ?1 AND provider_message_id = ?2"
            );
            optional(conn.query_row(
                &sql,
                params![channel_id, provider_message_id],
                row_to_message,
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation, oldest first.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<InboxMessage>, ZapflowError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a webhook status change to a message under the forward-only ordering.
///
/// Returns `false` when nothing was written.
pub async fn apply_message_status(
    db: &Database,
    id: &str,
    change: &StatusChange,
) -> Result<bool, ZapflowError> {
    let id = id.to_string();
    let change = change.clone();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            let current: Option<DeliveryStatus> = optional(conn.query_row(
                "SELECT status FROM messages WHERE id = ?1",
                params![id],
                |row| enum_col(row, 0),
            ))?;
            let Some(current) = current else {
                return Ok(false);
            };
            if !change.status.supersedes(current) {
                return Ok(false);
            }
            conn.execute(
                "UPDATE messages
                 SET status = ?1,
                     error_code = COALESCE(?2, error_code),
                     error_detail = COALESCE(?3, error_detail),
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    change.status.to_string(),
                    change.error_code,
                    change.error_detail,
                    now,
                    id
                ],
            )?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}
