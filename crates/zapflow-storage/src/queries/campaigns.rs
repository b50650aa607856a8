// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign reads, status transitions, and counter aggregation.

use rusqlite::{params, params_from_iter};
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{Campaign, CampaignContext, CampaignCounters, CampaignStatus};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_col, json_col, optional, to_json};
use crate::queries::channels::{CHANNEL_COLUMNS, row_to_channel};
use crate::queries::templates::{TEMPLATE_COLUMNS, row_to_template};

const CAMPAIGN_COLUMNS: &str = "id, tenant_id, channel_id, template_id, name, status, variables, \
     queued_count, sent_count, delivered_count, read_count, failed_count, pending_retry_count, \
     paused_reason, started_at, completed_at, created_at, updated_at";

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel_id: row.get(2)?,
        template_id: row.get(3)?,
        name: row.get(4)?,
        status: enum_col(row, 5)?,
        variables: json_col(row, 6)?,
        counters: CampaignCounters {
            queued: row.get(7)?,
            sent: row.get(8)?,
            delivered: row.get(9)?,
            read: row.get(10)?,
            failed: row.get(11)?,
            pending_retry: row.get(12)?,
        },
        paused_reason: row.get(13)?,
        started_at: row.get(14)?,
        completed_at: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn fetch_campaign(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Campaign>> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
    optional(conn.query_row(&sql, params![id], row_to_campaign))
}

/// Insert a campaign.
pub async fn insert_campaign(db: &Database, campaign: &Campaign) -> Result<(), ZapflowError> {
    let campaign = campaign.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns (id, tenant_id, channel_id, template_id, name, status,
                     variables, paused_reason, started_at, completed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    campaign.id,
                    campaign.tenant_id,
                    campaign.channel_id,
                    campaign.template_id,
                    campaign.name,
                    campaign.status.to_string(),
                    to_json(&campaign.variables)?,
                    campaign.paused_reason,
                    campaign.started_at,
                    campaign.completed_at,
                    campaign.created_at,
                    campaign.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a campaign by ID.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| fetch_campaign(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Load a campaign together with its template and channel.
///
/// Returns `None` when any of the three rows is missing.
pub async fn load_campaign_context(
    db: &Database,
    id: &str,
) -> Result<Option<CampaignContext>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let Some(campaign) = fetch_campaign(conn, &id)? else {
                return Ok(None);
            };
            let template_sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1");
            let template = optional(conn.query_row(
                &template_sql,
                params![campaign.template_id],
                |row| row_to_template(row, 0),
            ))?;
            let channel_sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1");
            let channel = optional(conn.query_row(
                &channel_sql,
                params![campaign.channel_id],
                |row| row_to_channel(row, 0),
            ))?;
            Ok(match (template, channel) {
                (Some(template), Some(channel)) => Some(CampaignContext {
                    campaign,
                    template,
                    channel,
                }),
                _ => None,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Current status of a campaign.
pub async fn get_campaign_status(
    db: &Database,
    id: &str,
) -> Result<Option<CampaignStatus>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                "SELECT status FROM campaigns WHERE id = ?1",
                params![id],
                |row| enum_col(row, 0),
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Set the campaign status and paused reason.
///
/// Entering `running` stamps `started_at` once; entering `done` stamps `completed_at`.
pub async fn set_campaign_status(
    db: &Database,
    id: &str,
    status: CampaignStatus,
    paused_reason: Option<&str>,
) -> Result<(), ZapflowError> {
    let key = id.to_string();
    let reason = paused_reason.map(str::to_string);
    let now = now_ts();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns
                 SET status = ?1,
                     paused_reason = ?2,
                     started_at = CASE WHEN ?1 = 'running' THEN COALESCE(started_at, ?3)
                                       ELSE started_at END,
                     completed_at = CASE WHEN ?1 = 'done' THEN ?3 ELSE completed_at END,
                     updated_at = ?3
                 WHERE id = ?4",
                params![status.to_string(), reason, now, key],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(ZapflowError::NotFound {
            entity: "campaign",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Recompute per-status counters from recipient rows and store them.
pub async fn refresh_campaign_counters(
    db: &Database,
    id: &str,
) -> Result<CampaignCounters, ZapflowError> {
    let id = id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            let counters = conn.query_row(
                "SELECT
                     COALESCE(SUM(status = 'queued'), 0),
                     COALESCE(SUM(status = 'sent'), 0),
                     COALESCE(SUM(status = 'delivered'), 0),
                     COALESCE(SUM(status = 'read'), 0),
                     COALESCE(SUM(status = 'failed'), 0),
                     COALESCE(SUM(status = 'failed' AND next_retry_at IS NOT NULL), 0)
                 FROM campaign_recipients WHERE campaign_id = ?1",
                params![id],
                |row| {
                    Ok(CampaignCounters {
                        queued: row.get(0)?,
                        sent: row.get(1)?,
                        delivered: row.get(2)?,
                        read: row.get(3)?,
                        failed: row.get(4)?,
                        pending_retry: row.get(5)?,
                    })
                },
            )?;
            conn.execute(
                "UPDATE campaigns
                 SET queued_count = ?1, sent_count = ?2, delivered_count = ?3, read_count = ?4,
                     failed_count = ?5, pending_retry_count = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    counters.queued,
                    counters.sent,
                    counters.delivered,
                    counters.read,
                    counters.failed,
                    counters.pending_retry,
                    now,
                    id,
                ],
            )?;
            Ok(counters)
        })
        .await
        .map_err(map_tr_err)
}

/// IDs of campaigns in any of the given statuses, oldest first.
pub async fn list_campaigns_by_status(
    db: &Database,
    statuses: &[CampaignStatus],
) -> Result<Vec<String>, ZapflowError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let statuses: Vec<String> = statuses.iter().map(ToString::to_string).collect();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            let sql = format!(
                "SELECT id FROM campaigns WHERE status IN ({placeholders}) ORDER BY created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(statuses.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
