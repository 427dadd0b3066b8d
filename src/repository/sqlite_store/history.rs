use crate::domain::snapshot::{ImportHistoryEntry, ImportSnapshot};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

// ==========================================
// import_history 表读写
// ==========================================
// snapshot_data / import_summary 以 JSON 文本存储

pub(super) fn insert_import(conn: &Connection, snapshot: &ImportSnapshot) -> RepositoryResult<()> {
    let snapshot_json = serde_json::to_string(&snapshot.snapshot_data)?;
    let summary_json = serde_json::to_string(&snapshot.import_summary)?;

    conn.execute(
        r#"
        INSERT INTO import_history (
            id, rows_imported, snapshot_data, import_summary, created_at, consumed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            snapshot.id,
            snapshot.rows_imported as i64,
            snapshot_json,
            summary_json,
            snapshot.created_at,
            snapshot.consumed_at,
        ],
    )?;

    Ok(())
}

pub(super) fn load_import(conn: &Connection, id: &str) -> RepositoryResult<Option<ImportSnapshot>> {
    let raw = conn
        .query_row(
            r#"
            SELECT id, rows_imported, snapshot_data, import_summary, created_at, consumed_at
            FROM import_history
            WHERE id = ?1
            "#,
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, DateTime<Utc>>(4)?,
                    row.get::<_, Option<DateTime<Utc>>>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, rows_imported, snapshot_json, summary_json, created_at, consumed_at)) = raw else {
        return Ok(None);
    };

    Ok(Some(ImportSnapshot {
        id,
        rows_imported: rows_imported.max(0) as usize,
        snapshot_data: serde_json::from_str(&snapshot_json)?,
        import_summary: serde_json::from_str(&summary_json)?,
        created_at,
        consumed_at,
    }))
}

pub(super) fn list_imports(conn: &Connection, limit: usize) -> RepositoryResult<Vec<ImportHistoryEntry>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, rows_imported, import_summary, created_at, consumed_at
        FROM import_history
        ORDER BY created_at DESC, id DESC
        LIMIT ?1
        "#,
    )?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
                row.get::<_, Option<DateTime<Utc>>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, rows_imported, summary_json, created_at, consumed_at) in rows {
        entries.push(ImportHistoryEntry {
            id,
            rows_imported: rows_imported.max(0) as usize,
            import_summary: serde_json::from_str(&summary_json)?,
            created_at,
            consumed: consumed_at.is_some(),
        });
    }
    Ok(entries)
}

pub(super) fn mark_import_consumed(conn: &Connection, id: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
    let updated = conn.execute(
        "UPDATE import_history SET consumed_at = ?2 WHERE id = ?1 AND consumed_at IS NULL",
        params![id, at],
    )?;

    if updated == 0 {
        let exists: bool = conn
            .query_row("SELECT 1 FROM import_history WHERE id = ?1", params![id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(RepositoryError::not_found("ImportSnapshot", id));
        }
        return Err(RepositoryError::PreconditionRejected(format!(
            "导入 {} 已被回滚，不能重复回滚",
            id
        )));
    }

    Ok(())
}
