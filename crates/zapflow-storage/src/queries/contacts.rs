// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact reads and phone-keyed upserts.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::Contact;

use crate::database::{Database, map_tr_err};
use crate::models::{json_col, optional, to_json};

const CONTACT_COLUMNS: &str = "id, tenant_id, phone, name, email, metadata, created_at";

pub(crate) const CONTACT_COLUMNS_C: &str =
    "c.id, c.tenant_id, c.phone, c.name, c.email, c.metadata, c.created_at";

pub(crate) fn row_to_contact(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(offset)?,
        tenant_id: row.get(offset + 1)?,
        phone: row.get(offset + 2)?,
        name: row.get(offset + 3)?,
        email: row.get(offset + 4)?,
        metadata: json_col(row, offset + 5)?,
        created_at: row.get(offset + 6)?,
    })
}

/// Insert a contact.
pub async fn insert_contact(db: &Database, contact: &Contact) -> Result<(), ZapflowError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, tenant_id, phone, name, email, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    contact.id,
                    contact.tenant_id,
                    contact.phone,
                    contact.name,
                    contact.email,
                    to_json(&contact.metadata)?,
                    contact.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a contact by ID.
pub async fn get_contact(db: &Database, id: &str) -> Result<Option<Contact>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");
            optional(conn.query_row(&sql, params![id], |row| row_to_contact(row, 0)))
        })
        .await
        .map_err(map_tr_err)
}

/// Find a tenant's contact by (normalized) phone or create it.
///
/// An existing contact without a name takes the given name.
pub async fn upsert_contact_by_phone(
    db: &Database,
    tenant_id: &str,
    phone: &str,
    name: Option<&str>,
) -> Result<Contact, ZapflowError> {
    let tenant_id = tenant_id.to_string();
    let phone = phone.to_string();
    let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    let new_id = uuid::Uuid::new_v4().to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO contacts (id, tenant_id, phone, name, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, '{}', ?5)
                 ON CONFLICT (tenant_id, phone) DO UPDATE
                 SET name = COALESCE(contacts.name, excluded.name)",
                params![new_id, tenant_id, phone, name, now],
            )?;
            let sql = format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE tenant_id = ?1 AND phone = ?2"
            );
            let contact = tx.query_row(&sql, params![tenant_id, phone], |row| {
                row_to_contact(row, 0)
            })?;
            tx.commit()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::setup_db;

    #[tokio::test]
    async fn upsert_creates_once_and_fills_missing_name() {
        let (db, _dir) = setup_db().await;

        let first = upsert_contact_by_phone(&db, "tenant-1", "5511987654321", None)
            .await
            .unwrap();
        assert!(first.name.is_none());

        let second = upsert_contact_by_phone(&db, "tenant-1", "5511987654321", Some("Maria"))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("Maria"));

        let third = upsert_contact_by_phone(&db, "tenant-1", "5511987654321", Some("Other"))
            .await
            .unwrap();
        assert_eq!(third.name.as_deref(), Some("Maria"));

        let other_tenant = upsert_contact_by_phone(&db, "tenant-2", "5511987654321", None)
            .await
            .unwrap();
        assert_ne!(other_tenant.id, first.id);
        db.close().await.unwrap();
    }
}
