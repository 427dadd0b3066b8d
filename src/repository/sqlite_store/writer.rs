use super::{history, rows};
use crate::domain::catalog::{CrossReference, Part, TableCounts, VehicleAlias, VehicleApplication};
use crate::domain::snapshot::ImportSnapshot;
use crate::domain::types::AliasType;
use crate::repository::catalog_store::CatalogWriter;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

// ==========================================
// SqliteCatalogWriter - 事务内写入句柄
// ==========================================
// 持有事务连接的借用；提交/回滚由 SqliteCatalogStore::in_transaction 负责
pub struct SqliteCatalogWriter<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalogWriter<'a> {
    pub(super) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 影响 0 行视为目标记录不存在
    fn expect_affected(affected: usize, entity: &str, id: &str) -> RepositoryResult<()> {
        if affected == 0 {
            Err(RepositoryError::not_found(entity, id))
        } else {
            Ok(())
        }
    }
}

impl CatalogWriter for SqliteCatalogWriter<'_> {
    // ==========================================
    // 零件
    // ==========================================

    fn insert_part(&self, part: &Part) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO parts (
                id, acr_sku, part_type, position_type, abs_type, bolt_pattern,
                drive_type, specifications, workflow_status, image_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                part.id,
                part.acr_sku,
                part.part_type,
                part.position_type,
                part.abs_type,
                part.bolt_pattern,
                part.drive_type,
                part.specifications,
                part.workflow_status.as_str(),
                part.image_url,
            ],
        )?;
        Ok(())
    }

    fn update_part(&self, part: &Part) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE parts SET
                acr_sku = ?2,
                part_type = ?3,
                position_type = ?4,
                abs_type = ?5,
                bolt_pattern = ?6,
                drive_type = ?7,
                specifications = ?8,
                workflow_status = ?9,
                image_url = ?10,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                part.id,
                part.acr_sku,
                part.part_type,
                part.position_type,
                part.abs_type,
                part.bolt_pattern,
                part.drive_type,
                part.specifications,
                part.workflow_status.as_str(),
                part.image_url,
            ],
        )?;
        Self::expect_affected(affected, "Part", &part.id)
    }

    fn delete_part(&self, id: &str) -> RepositoryResult<()> {
        let affected = self.conn.execute("DELETE FROM parts WHERE id = ?1", params![id])?;
        Self::expect_affected(affected, "Part", id)
    }

    // ==========================================
    // 车型适配
    // ==========================================

    fn insert_vehicle_application(&self, application: &VehicleApplication) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO vehicle_applications (id, part_id, make, model, start_year, end_year)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                application.id,
                application.part_id,
                application.make,
                application.model,
                application.start_year,
                application.end_year,
            ],
        )?;
        Ok(())
    }

    fn update_vehicle_application(&self, application: &VehicleApplication) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE vehicle_applications SET
                part_id = ?2,
                make = ?3,
                model = ?4,
                start_year = ?5,
                end_year = ?6,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                application.id,
                application.part_id,
                application.make,
                application.model,
                application.start_year,
                application.end_year,
            ],
        )?;
        Self::expect_affected(affected, "VehicleApplication", &application.id)
    }

    fn delete_vehicle_application(&self, id: &str) -> RepositoryResult<()> {
        let affected = self
            .conn
            .execute("DELETE FROM vehicle_applications WHERE id = ?1", params![id])?;
        Self::expect_affected(affected, "VehicleApplication", id)
    }

    // ==========================================
    // 交叉引用
    // ==========================================

    fn insert_cross_reference(&self, cross_ref: &CrossReference) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO cross_references (id, part_id, competitor_brand, competitor_sku)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                cross_ref.id,
                cross_ref.part_id,
                cross_ref.competitor_brand,
                cross_ref.competitor_sku,
            ],
        )?;
        Ok(())
    }

    fn update_cross_reference(&self, cross_ref: &CrossReference) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE cross_references SET
                part_id = ?2,
                competitor_brand = ?3,
                competitor_sku = ?4,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                cross_ref.id,
                cross_ref.part_id,
                cross_ref.competitor_brand,
                cross_ref.competitor_sku,
            ],
        )?;
        Self::expect_affected(affected, "CrossReference", &cross_ref.id)
    }

    fn delete_cross_reference(&self, id: &str) -> RepositoryResult<()> {
        let affected = self
            .conn
            .execute("DELETE FROM cross_references WHERE id = ?1", params![id])?;
        Self::expect_affected(affected, "CrossReference", id)
    }

    // ==========================================
    // 别名
    // ==========================================

    fn insert_alias(&self, alias: &VehicleAlias) -> RepositoryResult<()> {
        self.conn.execute(
            "INSERT INTO vehicle_aliases (alias, canonical_name, alias_type) VALUES (?1, ?2, ?3)",
            params![alias.alias, alias.canonical_name, alias.alias_type.as_str()],
        )?;
        Ok(())
    }

    fn update_alias(&self, alias: &VehicleAlias) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE vehicle_aliases SET
                canonical_name = ?3,
                updated_at = datetime('now')
            WHERE alias = ?1 AND alias_type = ?2
            "#,
            params![alias.alias, alias.alias_type.as_str(), alias.canonical_name],
        )?;
        Self::expect_affected(
            affected,
            "VehicleAlias",
            &format!("{}/{}", alias.alias_type, alias.alias),
        )
    }

    fn delete_alias(&self, alias: &str, alias_type: AliasType) -> RepositoryResult<()> {
        let affected = self.conn.execute(
            "DELETE FROM vehicle_aliases WHERE alias = ?1 AND alias_type = ?2",
            params![alias, alias_type.as_str()],
        )?;
        Self::expect_affected(affected, "VehicleAlias", &format!("{}/{}", alias_type, alias))
    }

    // ==========================================
    // 导入历史
    // ==========================================

    fn insert_import(&self, snapshot: &ImportSnapshot) -> RepositoryResult<()> {
        history::insert_import(self.conn, snapshot)
    }

    fn load_import(&self, id: &str) -> RepositoryResult<Option<ImportSnapshot>> {
        history::load_import(self.conn, id)
    }

    fn mark_import_consumed(&self, id: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        history::mark_import_consumed(self.conn, id, at)
    }

    fn defer_foreign_keys(&self) -> RepositoryResult<()> {
        self.conn.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        Ok(())
    }

    fn count_rows(&self) -> RepositoryResult<TableCounts> {
        rows::count_rows(self.conn)
    }
}
