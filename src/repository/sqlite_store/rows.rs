use crate::domain::catalog::{CatalogState, CrossReference, Part, TableCounts, VehicleAlias, VehicleApplication};
use crate::domain::types::{AliasType, WorkflowStatus};
use crate::repository::error::RepositoryResult;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

pub(super) const PART_COLUMNS: &str = "id, acr_sku, part_type, position_type, abs_type, bolt_pattern, \
     drive_type, specifications, workflow_status, image_url";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(super) fn map_part(row: &Row) -> rusqlite::Result<Part> {
    let status_raw: String = row.get(8)?;
    let workflow_status = WorkflowStatus::parse(&status_raw)
        .ok_or_else(|| conversion_error(8, format!("未知 workflow_status: {}", status_raw)))?;

    Ok(Part {
        id: row.get(0)?,
        acr_sku: row.get(1)?,
        part_type: row.get(2)?,
        position_type: row.get(3)?,
        abs_type: row.get(4)?,
        bolt_pattern: row.get(5)?,
        drive_type: row.get(6)?,
        specifications: row.get(7)?,
        workflow_status,
        image_url: row.get(9)?,
    })
}

pub(super) fn map_vehicle_application(row: &Row) -> rusqlite::Result<VehicleApplication> {
    Ok(VehicleApplication {
        id: row.get(0)?,
        part_id: row.get(1)?,
        make: row.get(2)?,
        model: row.get(3)?,
        start_year: row.get(4)?,
        end_year: row.get(5)?,
    })
}

pub(super) fn map_cross_reference(row: &Row) -> rusqlite::Result<CrossReference> {
    Ok(CrossReference {
        id: row.get(0)?,
        part_id: row.get(1)?,
        competitor_brand: row.get(2)?,
        competitor_sku: row.get(3)?,
    })
}

pub(super) fn map_alias(row: &Row) -> rusqlite::Result<VehicleAlias> {
    let type_raw: String = row.get(2)?;
    let alias_type = AliasType::parse(&type_raw)
        .ok_or_else(|| conversion_error(2, format!("未知 alias_type: {}", type_raw)))?;

    Ok(VehicleAlias {
        alias: row.get(0)?,
        canonical_name: row.get(1)?,
        alias_type,
    })
}

/// 读取目录全量状态（按自然键排序，保证输出稳定）
pub(super) fn load_state(conn: &Connection) -> RepositoryResult<CatalogState> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM parts ORDER BY acr_sku", PART_COLUMNS))?;
    let parts = stmt
        .query_map([], map_part)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        r#"
        SELECT id, part_id, make, model, start_year, end_year
        FROM vehicle_applications
        ORDER BY part_id, make, model, start_year, id
        "#,
    )?;
    let vehicle_applications = stmt
        .query_map([], map_vehicle_application)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        r#"
        SELECT id, part_id, competitor_brand, competitor_sku
        FROM cross_references
        ORDER BY part_id, competitor_brand, competitor_sku
        "#,
    )?;
    let cross_references = stmt
        .query_map([], map_cross_reference)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT alias, canonical_name, alias_type FROM vehicle_aliases ORDER BY alias_type, alias",
    )?;
    let aliases = stmt
        .query_map([], map_alias)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CatalogState {
        parts,
        vehicle_applications,
        cross_references,
        aliases,
    })
}

pub(super) fn count_rows(conn: &Connection) -> RepositoryResult<TableCounts> {
    let count = |table: &str| -> RepositoryResult<usize> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(n as usize)
    };

    Ok(TableCounts {
        parts: count("parts")?,
        vehicle_applications: count("vehicle_applications")?,
        cross_references: count("cross_references")?,
        aliases: count("vehicle_aliases")?,
    })
}
