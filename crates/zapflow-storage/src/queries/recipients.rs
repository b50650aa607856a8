// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign recipient selection and delivery state updates.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{
    CampaignRecipient, DeliveryStatus, DueRecipient, FailureUpdate, SentUpdate, StatusChange,
};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_col, json_col, optional, to_json};
use crate::queries::contacts::{CONTACT_COLUMNS_C, row_to_contact};

const RECIPIENT_COLUMNS: &str = "id, campaign_id, contact_id, status, attempts, last_error_code, \
     last_error, next_retry_at, provider_message_id, correlation_id, variables, sent_at, \
     delivered_at, read_at, created_at, updated_at";

const RECIPIENT_COLUMNS_R: &str = "r.id, r.campaign_id, r.contact_id, r.status, r.attempts, \
     r.last_error_code, r.last_error, r.next_retry_at, r.provider_message_id, r.correlation_id, \
     r.variables, r.sent_at, r.delivered_at, r.read_at, r.created_at, r.updated_at";

const RECIPIENT_WIDTH: usize = 16;

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRecipient> {
    Ok(CampaignRecipient {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        contact_id: row.get(2)?,
        status: enum_col(row, 3)?,
        attempts: row.get(4)?,
        last_error_code: row.get(5)?,
        last_error: row.get(6)?,
        next_retry_at: row.get(7)?,
        provider_message_id: row.get(8)?,
        correlation_id: row.get(9)?,
        variables: json_col(row, 10)?,
        sent_at: row.get(11)?,
        delivered_at: row.get(12)?,
        read_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// Insert a recipient row.
pub async fn insert_recipient(
    db: &Database,
    recipient: &CampaignRecipient,
) -> Result<(), ZapflowError> {
    let r = recipient.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaign_recipients (id, campaign_id, contact_id, status, attempts,
                     last_error_code, last_error, next_retry_at, provider_message_id,
                     correlation_id, variables, sent_at, delivered_at, read_at,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    r.id,
                    r.campaign_id,
                    r.contact_id,
                    r.status.to_string(),
                    r.attempts,
                    r.last_error_code,
                    r.last_error,
                    r.next_retry_at,
                    r.provider_message_id,
                    r.correlation_id,
                    to_json(&r.variables)?,
                    r.sent_at,
                    r.delivered_at,
                    r.read_at,
                    r.created_at,
                    r.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a recipient by ID.
pub async fn get_recipient(
    db: &Database,
    id: &str,
) -> Result<Option<CampaignRecipient>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {RECIPIENT_COLUMNS} FROM campaign_recipients WHERE id = ?1");
            optional(conn.query_row(&sql, params![id], row_to_recipient))
        })
        .await
        .map_err(map_tr_err)
}

/// Select recipients eligible for a send attempt.
///
/// Eligible rows are `queued`, or `failed` with a retry due at or before
/// `now` and fewer than `max_retries` attempts. Oldest rows come first.
/// Rows already `sent` (or further) are never selected.
pub async fn select_due_recipients(
    db: &Database,
    campaign_id: &str,
    now: &str,
    max_retries: u32,
    limit: usize,
) -> Result<Vec<DueRecipient>, ZapflowError> {
    let campaign_id = campaign_id.to_string();
    let now = now.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {RECIPIENT_COLUMNS_R}, {CONTACT_COLUMNS_C}
                 FROM campaign_recipients r
                 JOIN contacts c ON c.id = r.contact_id
                 WHERE r.campaign_id = ?1
                   AND (r.status = 'queued'
                        OR (r.status = 'failed'
                            AND r.next_retry_at IS NOT NULL
                            AND r.next_retry_at <= ?2
                            AND r.attempts < ?3))
                 ORDER BY r.created_at ASC, r.rowid ASC
                 LIMIT ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![campaign_id, now, max_retries, limit], |row| {
                Ok(DueRecipient {
                    recipient: row_to_recipient(row)?,
                    contact: row_to_contact(row, RECIPIENT_WIDTH)?,
                })
            })?;
            let mut due = Vec::new();
            for row in rows {
                due.push(row?);
            }
            Ok(due)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a confirmed send. Clears error and retry fields.
pub async fn mark_recipient_sent(
    db: &Database,
    id: &str,
    update: &SentUpdate,
) -> Result<(), ZapflowError> {
    if update.provider_message_id.trim().is_empty() {
        return Err(ZapflowError::Validation(
            "a sent recipient requires a provider message id".to_string(),
        ));
    }
    let id = id.to_string();
    let update = update.clone();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_recipients
                 SET status = 'sent', provider_message_id = ?1, correlation_id = ?2,
                     attempts = ?3, sent_at = ?4, last_error_code = NULL, last_error = NULL,
                     next_retry_at = NULL, updated_at = ?5
                 WHERE id = ?6",
                params![
                    update.provider_message_id,
                    update.correlation_id,
                    update.attempts,
                    update.sent_at,
                    now,
                    id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt. `next_retry_at = None` makes the failure permanent.
pub async fn mark_recipient_failed(
    db: &Database,
    id: &str,
    update: &FailureUpdate,
) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let update = update.clone();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_recipients
                 SET status = 'failed', attempts = ?1,
                     correlation_id = COALESCE(?2, correlation_id),
                     last_error_code = ?3, last_error = ?4, next_retry_at = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    update.attempts,
                    update.correlation_id,
                    update.error_code,
                    update.error_detail,
                    update.next_retry_at,
                    now,
                    id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find the recipient that produced a provider message, limited to campaigns
/// sent through `channel_id`.
pub async fn find_recipient_by_provider_message_id(
    db: &Database,
    channel_id: &str,
    provider_message_id: &str,
) -> Result<Option<CampaignRecipient>, ZapflowError> {
    let channel_id = channel_id.to_string();
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {RECIPIENT_COLUMNS} FROM campaign_recipients
                 WHERE provider_message_id = ?1
                   AND campaign_id IN (SELECT id FROM campaigns WHERE channel_id = ?2)
                 ORDER BY created_at DESC LIMIT 1"
            );
            optional(conn.query_row(
                &sql,
                params![provider_message_id, channel_id],
                row_to_recipient,
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a webhook status change under the forward-only ordering.
///
/// Returns `false` (and writes nothing) when the change would regress the row
/// or repeats its current state.
pub async fn apply_recipient_status(
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
                "SELECT status FROM campaign_recipients WHERE id = ?1",
                params![id],
                |row| enum_col(row, 0),
            ))?;
            let Some(current) = current else {
                return Ok(false);
            };
            if !change.status.supersedes(current) {
                return Ok(false);
            }

            match change.status {
                DeliveryStatus::Failed => conn.execute(
                    "UPDATE campaign_recipients
                     SET status = 'failed', last_error_code = ?1, last_error = ?2,
                         next_retry_at = NULL, updated_at = ?3
                     WHERE id = ?4",
                    params![change.error_code, change.error_detail, now, id],
                )?,
                status => conn.execute(
                    "UPDATE campaign_recipients
                     SET status = ?1,
                         sent_at = COALESCE(sent_at, ?2),
                         delivered_at = CASE WHEN ?1 IN ('delivered', 'read')
                                             THEN COALESCE(delivered_at, ?2)
                                             ELSE delivered_at END,
                         read_at = CASE WHEN ?1 = 'read' THEN ?2 ELSE read_at END,
                         updated_at = ?3
                     WHERE id = ?4",
                    params![status.to_string(), change.at, now, id],
                )?,
            };
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{seed_basic, setup_db};

    fn failure(attempts: u32, retry_at: Option<&str>) -> FailureUpdate {
        FailureUpdate {
            attempts,
            correlation_id: Some("corr".to_string()),
            error_code: "131000".to_string(),
            error_detail: "something went wrong".to_string(),
            next_retry_at: retry_at.map(str::to_string),
        }
    }

    fn sent(id: &str) -> SentUpdate {
        SentUpdate {
            provider_message_id: id.to_string(),
            correlation_id: "corr".to_string(),
            attempts: 1,
            sent_at: "2026-01-01T00:00:01.000Z".to_string(),
        }
    }

    fn change(status: DeliveryStatus) -> StatusChange {
        StatusChange {
            status,
            error_code: None,
            error_detail: None,
            at: "2026-01-01T00:01:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn selection_orders_by_creation_and_limits() {
        let (db, _dir) = setup_db().await;
        seed_basic(&db, 5).await;

        let due = select_due_recipients(&db, "camp-1", &now_ts(), 3, 3).await.unwrap();
        let ids: Vec<&str> = due.iter().map(|d| d.recipient.id.as_str()).collect();
        assert_eq!(ids, vec!["rcpt-0", "rcpt-1", "rcpt-2"]);
        assert_eq!(due[0].contact.id, "contact-0");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn selection_respects_retry_time_and_attempts() {
        let (db, _dir) = setup_db().await;
        seed_basic(&db, 4).await;
        let now = "2026-06-01T12:00:00.000Z";

        mark_recipient_sent(&db, "rcpt-0", &sent("wamid.0")).await.unwrap();
        mark_recipient_failed(&db, "rcpt-1", &failure(1, Some("2026-06-01T11:59:00.000Z")))
            .await
            .unwrap();
        mark_recipient_failed(&db, "rcpt-2", &failure(1, Some("2026-06-01T12:30:00.000Z")))
            .await
            .unwrap();
        mark_recipient_failed(&db, "rcpt-3", &failure(3, Some("2026-06-01T11:00:00.000Z")))
            .await
            .unwrap();

        let due = select_due_recipients(&db, "camp-1", now, 3, 10).await.unwrap();
        let ids: Vec<&str> = due.iter().map(|d| d.recipient.id.as_str()).collect();
        assert_eq!(ids, vec!["rcpt-1"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sent_clears_retry_fields() {
        let (db, _dir) = setup_db().await;
        seed_basic(&db, 1).await;

        mark_recipient_failed(&db, "rcpt-0", &failure(1, Some("2026-01-01T00:00:00.000Z")))
            .await
            .unwrap();
        mark_recipient_sent(&db, "rcpt-0", &sent("wamid.0")).await.unwrap();

        let row = get_recipient(&db, "rcpt-0").await.unwrap().unwrap();
        assert_eq!(row.status, DeliveryStatus::Sent);
        assert_eq!(row.provider_message_id.as_deref(), Some("wamid.0"));
        assert!(row.last_error_code.is_none());
        assert!(row.next_retry_at.is_none());
        assert_eq!(row.correlation_id.as_deref(), Some("corr"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sent_without_id_is_rejected() {
        let (db, _dir) = setup_db().await;
        seed_basic(&db, 1).await;
        let err = mark_recipient_sent(&db, "rcpt-0", &sent(" ")).await.unwrap_err();
        assert!(matches!(err, ZapflowError::Validation(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn webhook_status_never_regresses() {
        let (db, _dir) = setup_db().await;
        seed_basic(&db, 1).await;
        mark_recipient_sent(&db, "rcpt-0", &sent("wamid.0")).await.unwrap();

        assert!(apply_recipient_status(&db, "rcpt-0", &change(DeliveryStatus::Read)).await.unwrap());
        assert!(!apply_recipient_status(&db, "rcpt-0", &change(DeliveryStatus::Delivered)).await.unwrap());
        assert!(!apply_recipient_status(&db, "rcpt-0", &change(DeliveryStatus::Read)).await.unwrap());

        let row = find_recipient_by_provider_message_id(&db, "ch-1", "wamid.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, DeliveryStatus::Read);
        assert!(
            find_recipient_by_provider_message_id(&db, "ch-other", "wamid.0")
                .await
                .unwrap()
                .is_none()
        );
        assert!(row.read_at.is_some());
        assert!(row.delivered_at.is_some());

        let mut failed = change(DeliveryStatus::Failed);
        failed.error_code = Some("131047".to_string());
        assert!(apply_recipient_status(&db, "rcpt-0", &failed).await.unwrap());
        let row = get_recipient(&db, "rcpt-0").await.unwrap().unwrap();
        assert_eq!(row.status, DeliveryStatus::Failed);
        assert_eq!(row.last_error_code.as_deref(), Some("131047"));
        db.close().await.unwrap();
    }
}
