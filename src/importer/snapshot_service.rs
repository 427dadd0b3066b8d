// ==========================================
// 零件目录导入 - 快照与回滚
// ==========================================
// 职责: 写入前捕获前像；按快照在单事务内精确还原
// 红线: 回滚全有或全无；已消费的快照拒绝再次回滚
// ==========================================

use crate::domain::diff::Diff;
use crate::domain::snapshot::SnapshotData;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::catalog_store::{CatalogStore, CatalogWriter};
use crate::repository::error::RepositoryError;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument};

/// 回滚结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub import_id: String,
    pub rows_restored: usize,
}

pub struct SnapshotService;

impl SnapshotService {
    /// 捕获差异涉及行的前像（更新 / 删除）
    ///
    /// 新增行在执行器生成 id 后追加到 added
    pub fn capture(diff: &Diff) -> SnapshotData {
        let mut data = SnapshotData::default();

        data.parts.updated = diff.parts.updated.iter().map(|u| u.before.clone()).collect();
        data.parts.deleted = diff.parts.deleted.iter().map(|d| d.before.clone()).collect();

        data.vehicle_applications.updated = diff
            .vehicle_applications
            .updated
            .iter()
            .map(|u| u.before.clone())
            .collect();
        data.vehicle_applications.deleted = diff
            .vehicle_applications
            .deleted
            .iter()
            .map(|d| d.before.clone())
            .collect();

        data.cross_references.updated = diff
            .cross_references
            .updated
            .iter()
            .map(|u| u.before.clone())
            .collect();
        data.cross_references.deleted = diff
            .cross_references
            .deleted
            .iter()
            .map(|d| d.before.clone())
            .collect();

        data.aliases.updated = diff.aliases.updated.iter().map(|u| u.before.clone()).collect();
        data.aliases.deleted = diff.aliases.deleted.iter().map(|d| d.before.clone()).collect();

        data
    }

    /// 回滚一次导入
    ///
    /// # 参数
    /// - store: 目录存储
    /// - import_id: 导入历史 id
    ///
    /// # 返回
    /// - Err(ImportNotFound): id 不存在
    /// - Err(RollbackRejected): 快照已被消费
    /// - Err(TransactionFailed): 重放失败，存储无变化
    #[instrument(skip(store))]
    pub fn rollback<S: CatalogStore>(store: &S, import_id: &str) -> ImportResult<RollbackOutcome> {
        let result = store.in_transaction(|w| -> ImportResult<RollbackOutcome> {
            let Some(snapshot) = w.load_import(import_id)? else {
                return Err(ImportError::ImportNotFound(import_id.to_string()));
            };
            if let Some(at) = snapshot.consumed_at {
                return Err(ImportError::RollbackRejected(format!(
                    "导入 {} 已于 {} 回滚",
                    import_id,
                    at.to_rfc3339()
                )));
            }

            w.defer_foreign_keys()?;
            replay(w, &snapshot.snapshot_data)?;

            w.mark_import_consumed(import_id, Utc::now())
                .map_err(|e| match e {
                    RepositoryError::PreconditionRejected(msg) => ImportError::RollbackRejected(msg),
                    other => ImportError::from(other),
                })?;

            Ok(RollbackOutcome {
                import_id: import_id.to_string(),
                rows_restored: snapshot.snapshot_data.rows_touched(),
            })
        });

        match &result {
            Ok(outcome) => info!(rows_restored = outcome.rows_restored, "回滚完成"),
            Err(e) => error!(error = %e, "回滚失败，存储未变更"),
        }
        result
    }
}

/// 按快照重放：删除新增行 → 还原更新前像 → 以原 id 重建删除行
fn replay(w: &dyn CatalogWriter, data: &SnapshotData) -> ImportResult<()> {
    for cr in &data.cross_references.added {
        w.delete_cross_reference(&cr.id)?;
    }
    for va in &data.vehicle_applications.added {
        w.delete_vehicle_application(&va.id)?;
    }
    for alias in &data.aliases.added {
        w.delete_alias(&alias.alias, alias.alias_type)?;
    }
    for part in &data.parts.added {
        w.delete_part(&part.id)?;
    }

    for part in &data.parts.updated {
        w.update_part(part)?;
    }
    for va in &data.vehicle_applications.updated {
        w.update_vehicle_application(va)?;
    }
    for cr in &data.cross_references.updated {
        w.update_cross_reference(cr)?;
    }
    for alias in &data.aliases.updated {
        w.update_alias(alias)?;
    }

    for part in &data.parts.deleted {
        w.insert_part(part)?;
    }
    for va in &data.vehicle_applications.deleted {
        w.insert_vehicle_application(va)?;
    }
    for cr in &data.cross_references.deleted {
        w.insert_cross_reference(cr)?;
    }
    for alias in &data.aliases.deleted {
        w.insert_alias(alias)?;
    }
    Ok(())
}
