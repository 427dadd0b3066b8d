// ==========================================
// 零件目录导入 - 原子执行器
// ==========================================
// 职责: 将 Diff 在单个写事务内应用到全部表，并写入导入历史
// 红线: 全部成功或全部回滚；执行器是唯一的事务边界
// 顺序: 删除（依赖行先于零件）→ 更新零件 → 新增零件 → 更新依赖行 → 新增依赖行 → 历史记录
// ==========================================

use crate::domain::catalog::{CrossReference, VehicleApplication};
use crate::domain::diff::Diff;
use crate::domain::issue::{IssueCode, ValidationReport};
use crate::domain::rows::PartRef;
use crate::domain::snapshot::{ImportSnapshot, ImportSummary};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::normalize::normalize_sku;
use crate::importer::snapshot_service::SnapshotService;
use crate::repository::catalog_store::{CatalogStore, CatalogWriter};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// WarningGate - 警告确认门禁
// ==========================================
pub struct WarningGate<'a> {
    raised: BTreeSet<IssueCode>,
    acknowledged: &'a BTreeSet<IssueCode>,
}

impl<'a> WarningGate<'a> {
    /// 汇总校验与差异阶段的全部警告编码
    pub fn new(report: &ValidationReport, diff: &Diff, acknowledged: &'a BTreeSet<IssueCode>) -> Self {
        let mut raised = report.warning_codes();
        raised.extend(diff.warnings.iter().map(|w| w.code));
        Self { raised, acknowledged }
    }

    pub fn raised(&self) -> &BTreeSet<IssueCode> {
        &self.raised
    }

    pub fn unacknowledged(&self) -> Vec<IssueCode> {
        self.raised.difference(self.acknowledged).copied().collect()
    }

    pub fn check(&self) -> ImportResult<()> {
        let pending = self.unacknowledged();
        if pending.is_empty() {
            Ok(())
        } else {
            warn!(codes = ?pending, "存在未确认的警告，拒绝执行");
            Err(ImportError::WarningsNotAcknowledged(pending))
        }
    }
}

/// 执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
    pub import_id: String,
    pub rows_imported: usize,
    pub summary: ImportSummary,
}

// ==========================================
// ImportExecutor
// ==========================================
pub struct ImportExecutor<'a, S: CatalogStore> {
    store: &'a S,
}

impl<'a, S: CatalogStore> ImportExecutor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// 原子应用差异
    ///
    /// # 返回
    /// - Ok: 已提交，含导入历史 id 与各实体计数
    /// - Err(NoChanges): 差异为空，不创建历史
    /// - Err(TransactionFailed): 任一写入失败，事务整体回滚
    #[instrument(skip_all, fields(total_changes = diff.summary.total_changes))]
    pub fn execute(&self, diff: &Diff) -> ImportResult<ExecuteOutcome> {
        if diff.is_empty() {
            return Err(ImportError::NoChanges);
        }

        let import_id = Uuid::new_v4().to_string();
        info!(import_id = %import_id, "开始导入事务");

        let result = self
            .store
            .in_transaction(|w| apply_diff(w, diff, &import_id));

        match &result {
            Ok(outcome) => info!(
                import_id = %outcome.import_id,
                rows_imported = outcome.rows_imported,
                "导入事务已提交"
            ),
            Err(e) => error!(import_id = %import_id, error = %e, "导入事务失败，已回滚"),
        }
        result
    }
}

fn apply_diff(w: &dyn CatalogWriter, diff: &Diff, import_id: &str) -> ImportResult<ExecuteOutcome> {
    let mut snapshot_data = SnapshotService::capture(diff);

    // ===== 删除 =====
    for d in &diff.cross_references.deleted {
        w.delete_cross_reference(&d.before.id)?;
    }
    for d in &diff.vehicle_applications.deleted {
        w.delete_vehicle_application(&d.before.id)?;
    }
    for d in &diff.aliases.deleted {
        w.delete_alias(&d.before.alias, d.before.alias_type)?;
    }
    for d in &diff.parts.deleted {
        w.delete_part(&d.before.id)?;
    }

    // ===== 零件 =====
    for u in &diff.parts.updated {
        w.update_part(&u.after)?;
    }

    let mut new_part_ids: HashMap<String, String> = HashMap::new();
    for a in &diff.parts.added {
        let part = a.row.clone().into_part(Uuid::new_v4().to_string());
        w.insert_part(&part)?;
        new_part_ids.insert(normalize_sku(&part.acr_sku), part.id.clone());
        snapshot_data.parts.added.push(part);
    }

    let resolve = |part: &PartRef| -> ImportResult<String> {
        match part {
            PartRef::Existing(id) => Ok(id.clone()),
            PartRef::New(sku) => new_part_ids
                .get(sku)
                .cloned()
                .ok_or_else(|| ImportError::InternalError(format!("新增零件 '{}' 未生成 id", sku))),
        }
    };

    // ===== 依赖行更新 =====
    for u in &diff.vehicle_applications.updated {
        w.update_vehicle_application(&VehicleApplication {
            id: u.before.id.clone(),
            part_id: resolve(&u.after.part)?,
            make: u.after.make.clone(),
            model: u.after.model.clone(),
            start_year: u.after.start_year,
            end_year: u.after.end_year,
        })?;
    }
    for u in &diff.cross_references.updated {
        w.update_cross_reference(&CrossReference {
            id: u.before.id.clone(),
            part_id: resolve(&u.after.part)?,
            competitor_brand: u.after.competitor_brand.clone(),
            competitor_sku: u.after.competitor_sku.clone(),
        })?;
    }
    for u in &diff.aliases.updated {
        w.update_alias(&u.after)?;
    }

    // ===== 依赖行新增 =====
    for a in &diff.vehicle_applications.added {
        let application = VehicleApplication {
            id: Uuid::new_v4().to_string(),
            part_id: resolve(&a.row.part)?,
            make: a.row.make.clone(),
            model: a.row.model.clone(),
            start_year: a.row.start_year,
            end_year: a.row.end_year,
        };
        w.insert_vehicle_application(&application)?;
        snapshot_data.vehicle_applications.added.push(application);
    }
    for a in &diff.cross_references.added {
        let cross_ref = CrossReference {
            id: Uuid::new_v4().to_string(),
            part_id: resolve(&a.row.part)?,
            competitor_brand: a.row.competitor_brand.clone(),
            competitor_sku: a.row.competitor_sku.clone(),
        };
        w.insert_cross_reference(&cross_ref)?;
        snapshot_data.cross_references.added.push(cross_ref);
    }
    for a in &diff.aliases.added {
        w.insert_alias(&a.row)?;
        snapshot_data.aliases.added.push(a.row.clone());
    }

    // ===== 导入历史 =====
    let summary = ImportSummary::from(&diff.summary);
    let snapshot = ImportSnapshot {
        id: import_id.to_string(),
        rows_imported: diff.summary.total_changes,
        snapshot_data,
        import_summary: summary,
        created_at: Utc::now(),
        consumed_at: None,
    };
    w.insert_import(&snapshot)?;

    Ok(ExecuteOutcome {
        import_id: snapshot.id,
        rows_imported: snapshot.rows_imported,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::issue::ValidationIssue;

    #[test]
    fn test_warning_gate_requires_every_code() {
        let report = ValidationReport::from_issues(vec![ValidationIssue::new(
            IssueCode::PartTypeChanged,
            "Parts",
            Some(4),
            "零件类型变更",
        )]);
        let mut diff = Diff::default();
        diff.warnings.push(ValidationIssue::new(
            IssueCode::CascadeDelete,
            "Parts",
            Some(5),
            "级联删除",
        ));

        let none = BTreeSet::new();
        let gate = WarningGate::new(&report, &diff, &none);
        assert_eq!(
            gate.unacknowledged(),
            vec![IssueCode::PartTypeChanged, IssueCode::CascadeDelete]
        );
        assert!(matches!(gate.check(), Err(ImportError::WarningsNotAcknowledged(_))));

        let partial: BTreeSet<IssueCode> = [IssueCode::PartTypeChanged].into_iter().collect();
        let gate = WarningGate::new(&report, &diff, &partial);
        assert_eq!(gate.unacknowledged(), vec![IssueCode::CascadeDelete]);

        let all: BTreeSet<IssueCode> = [IssueCode::PartTypeChanged, IssueCode::CascadeDelete]
            .into_iter()
            .collect();
        assert!(WarningGate::new(&report, &diff, &all).check().is_ok());
    }
}
