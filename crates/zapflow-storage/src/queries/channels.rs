// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel reads, status updates, and provider blocking.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{Channel, ChannelStatus};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_col, json_col, optional, to_json};

pub(crate) const CHANNEL_COLUMNS: &str = "id, tenant_id, name, provider, status, config, \
     blocked_by_provider, blocked_reason, blocked_code, blocked_at, created_at, updated_at";

pub(crate) fn row_to_channel(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(offset)?,
        tenant_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        provider: row.get(offset + 3)?,
        status: enum_col(row, offset + 4)?,
        config: json_col(row, offset + 5)?,
        blocked_by_provider: row.get(offset + 6)?,
        blocked_reason: row.get(offset + 7)?,
        blocked_code: row.get(offset + 8)?,
        blocked_at: row.get(offset + 9)?,
        created_at: row.get(offset + 10)?,
        updated_at: row.get(offset + 11)?,
    })
}

/// Insert a channel.
pub async fn insert_channel(db: &Database, channel: &Channel) -> Result<(), ZapflowError> {
    let channel = channel.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channels (id, tenant_id, name, provider, status, config,
                     blocked_by_provider, blocked_reason, blocked_code, blocked_at,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    channel.id,
                    channel.tenant_id,
                    channel.name,
                    channel.provider,
                    channel.status.to_string(),
                    to_json(&channel.config)?,
                    channel.blocked_by_provider,
                    channel.blocked_reason,
                    channel.blocked_code,
                    channel.blocked_at,
                    channel.created_at,
                    channel.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a channel by ID.
pub async fn get_channel(db: &Database, id: &str) -> Result<Option<Channel>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1");
            optional(conn.query_row(&sql, params![id], |row| row_to_channel(row, 0)))
        })
        .await
        .map_err(map_tr_err)
}

/// Update a channel's connection status.
pub async fn update_channel_status(
    db: &Database,
    id: &str,
    status: ChannelStatus,
) -> Result<(), ZapflowError> {
    let key = id.to_string();
    let now = now_ts();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channels SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), now, key],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(ZapflowError::NotFound {
            entity: "channel",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Mark a channel as rejected by its provider.
pub async fn block_channel(
    db: &Database,
    id: &str,
    code: &str,
    reason: &str,
) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let code = code.to_string();
    let reason = reason.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channels
                 SET blocked_by_provider = 1, blocked_code = ?1, blocked_reason = ?2,
                     blocked_at = ?3, updated_at = ?3
                 WHERE id = ?4",
                params![code, reason, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Manually clear a provider block.
pub async fn unblock_channel(db: &Database, id: &str) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channels
                 SET blocked_by_provider = 0, blocked_code = NULL, blocked_reason = NULL,
                     blocked_at = NULL, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
