// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template reads and seeding.

use rusqlite::params;
use zapflow_core::ZapflowError;
use zapflow_core::types::TemplateRecord;

use crate::database::{Database, map_tr_err};
use crate::models::{enum_col, json_col, optional, to_json};

pub(crate) const TEMPLATE_COLUMNS: &str =
    "id, tenant_id, name, language, status, components, variable_mappings, header_media_url, created_at";

pub(crate) fn row_to_template(
    row: &rusqlite::Row<'_>,
    offset: usize,
) -> rusqlite::Result<TemplateRecord> {
    Ok(TemplateRecord {
        id: row.get(offset)?,
        tenant_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        language: row.get(offset + 3)?,
        status: enum_col(row, offset + 4)?,
        components: json_col(row, offset + 5)?,
        variable_mappings: json_col(row, offset + 6)?,
        header_media_url: row.get(offset + 7)?,
        created_at: row.get(offset + 8)?,
    })
}

/// Insert a template.
pub async fn insert_template(db: &Database, template: &TemplateRecord) -> Result<(), ZapflowError> {
    let template = template.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates (id, tenant_id, name, language, status, components,
                     variable_mappings, header_media_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    template.id,
                    template.tenant_id,
                    template.name,
                    template.language,
                    template.status.to_string(),
                    to_json(&template.components)?,
                    to_json(&template.variable_mappings)?,
                    template.header_media_url,
                    template.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a template by ID.
pub async fn get_template(db: &Database, id: &str) -> Result<Option<TemplateRecord>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1");
            optional(conn.query_row(&sql, params![id], |row| row_to_template(row, 0)))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zapflow_core::template::{MappingSource, TemplateComponent, VariableMapping};
    use zapflow_core::types::TemplateStatus;

    #[tokio::test]
    async fn components_and_mappings_survive_storage() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        let template = TemplateRecord {
            id: "tpl-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            name: "promo".to_string(),
            language: "pt_BR".to_string(),
            status: TemplateStatus::Approved,
            components: vec![TemplateComponent::Body {
                text: "Oi {{1}}, use {{2}}".to_string(),
            }],
            variable_mappings: vec![VariableMapping {
                slot: "body.2".to_string(),
                source: MappingSource::Variable {
                    key: "coupon".to_string(),
                },
                fallback: Some("WELCOME".to_string()),
                required: false,
            }],
            header_media_url: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        insert_template(&db, &template).await.unwrap();

        let loaded = get_template(&db, "tpl-1").await.unwrap().unwrap();
        assert_eq!(loaded, template);
        db.close().await.unwrap();
    }
}
