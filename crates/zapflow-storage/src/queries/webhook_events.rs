// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw webhook payload audit trail.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{WebhookEventLink, WebhookEventRecord};

use crate::database::{Database, map_tr_err};
use crate::models::optional;

/// Persist a raw payload before any parsing. Returns the new row ID.
pub async fn record_webhook_event(
    db: &Database,
    channel_id: &str,
    provider: &str,
    payload: &str,
) -> Result<String, ZapflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let row = (
        id.clone(),
        channel_id.to_string(),
        provider.to_string(),
        payload.to_string(),
        now_ts(),
    );
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_events (id, channel_id, provider, payload, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.0, row.1, row.2, row.3, row.4],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Mark a recorded payload processed and link what it touched.
pub async fn mark_webhook_event_processed(
    db: &Database,
    id: &str,
    link: &WebhookEventLink,
) -> Result<(), ZapflowError> {
    let id = id.to_string();
    let link = link.clone();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE webhook_events
                 SET processed = 1, event_count = ?1, linked_message_id = ?2,
                     linked_recipient_id = ?3, error = ?4, processed_at = ?5
                 WHERE id = ?6",
                params![
                    link.event_count,
                    link.linked_message_id,
                    link.linked_recipient_id,
                    link.error,
                    now,
                    id
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a recorded payload by ID.
pub async fn get_webhook_event(
    db: &Database,
    id: &str,
) -> Result<Option<WebhookEventRecord>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                "SELECT id, channel_id, provider, payload, processed, event_count,
                        linked_message_id, linked_recipient_id, error, received_at, processed_at
                 FROM webhook_events WHERE id = ?1",
                params![id],
                |row| {
                    Ok(WebhookEventRecord {
                        id: row.get(0)?,
                        channel_id: row.get(1)?,
                        provider: row.get(2)?,
                        payload: row.get(3)?,
                        processed: row.get(4)?,
                        event_count: row.get(5)?,
                        linked_message_id: row.get(6)?,
                        linked_recipient_id: row.get(7)?,
                        error: row.get(8)?,
                        received_at: row.get(9)?,
                        processed_at: row.get(10)?,
                    })
                },
            ))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::setup_db;

    #[tokio::test]
    async fn payload_is_kept_verbatim_and_linked() {
        let (db, _dir) = setup_db().await;
        let raw = r#"{"object":"whatsapp_business_account","entry":[]}"#;

        let id = record_webhook_event(&db, "ch-1", "whatsapp_cloud", raw)
            .await
            .unwrap();
        let pending = get_webhook_event(&db, &id).await.unwrap().unwrap();
        assert_eq!(pending.payload, raw);
        assert!(!pending.processed);

        mark_webhook_event_processed(
            &db,
            &id,
            &WebhookEventLink {
                event_count: 2,
                linked_message_id: Some("msg-1".to_string()),
                linked_recipient_id: None,
                error: None,
            },
        )
        .await
        .unwrap();
        let done = get_webhook_event(&db, &id).await.unwrap().unwrap();
        assert!(done.processed);
        assert_eq!(done.event_count, 2);
        assert_eq!(done.linked_message_id.as_deref(), Some("msg-1"));
        assert!(done.processed_at.is_some());
        db.close().await.unwrap();
    }
}
