// ==========================================
// 零件目录导入 - 差异模型
// ==========================================
// 职责: 按实体划分的 Added / Updated / Deleted 集合 + 汇总
// 红线: 三个集合互不相交；差异计算不修改存储
// ==========================================

use crate::domain::catalog::{CrossReference, Part, VehicleAlias, VehicleApplication};
use crate::domain::issue::ValidationIssue;
use crate::domain::rows::{PartRef, SourceRef};
use crate::domain::types::WorkflowStatus;
use serde::{Deserialize, Serialize};

/// 单字段变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub was: Option<String>,
    pub now: Option<String>,
}

impl FieldChange {
    pub fn new(field: &str, was: Option<String>, now: Option<String>) -> Self {
        Self {
            field: field.to_string(),
            was,
            now,
        }
    }
}

/// 删除来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    RowAction, // Eliminar
    Marker,    // [DELETE]<sku>
    Cascade,   // 父零件被删除
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedEntry<A> {
    pub source: SourceRef,
    pub row: A,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedEntry<T, U = T> {
    pub source: SourceRef,
    pub before: T,
    pub after: U,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEntry<T> {
    pub source: Option<SourceRef>, // 级联删除无来源行
    pub reason: DeleteReason,
    pub before: T,
}

// ==========================================
// EntityDiff - 单实体差异
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDiff<A, T, U = T> {
    pub added: Vec<AddedEntry<A>>,
    pub updated: Vec<UpdatedEntry<T, U>>,
    pub deleted: Vec<DeletedEntry<T>>,
}

impl<A, T, U> Default for EntityDiff<A, T, U> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<A, T, U> EntityDiff<A, T, U> {
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            added: self.added.len(),
            updated: self.updated.len(),
            deleted: self.deleted.len(),
        }
    }
}

// ==========================================
// 新增行草稿（尚无代理主键）
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDraft {
    pub acr_sku: String,
    pub part_type: String,
    pub position_type: Option<String>,
    pub abs_type: Option<String>,
    pub bolt_pattern: Option<String>,
    pub drive_type: Option<String>,
    pub specifications: Option<String>,
    pub workflow_status: WorkflowStatus,
    pub image_url: Option<String>,
}

impl PartDraft {
    pub fn into_part(self, id: String) -> Part {
        Part {
            id,
            acr_sku: self.acr_sku,
            part_type: self.part_type,
            position_type: self.position_type,
            abs_type: self.abs_type,
            bolt_pattern: self.bolt_pattern,
            drive_type: self.drive_type,
            specifications: self.specifications,
            workflow_status: self.workflow_status,
            image_url: self.image_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub part: PartRef,
    pub make: String,
    pub model: String,
    pub start_year: i32,
    pub end_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceDraft {
    pub part: PartRef,
    pub competitor_brand: String,
    pub competitor_sku: String,
}

// ==========================================
// 汇总
// ==========================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl EntityCounts {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub parts: EntityCounts,
    pub vehicle_applications: EntityCounts,
    pub cross_references: EntityCounts,
    pub aliases: EntityCounts,
    pub total_changes: usize,
}

pub type PartDiff = EntityDiff<PartDraft, Part>;
pub type ApplicationDiff = EntityDiff<ApplicationDraft, VehicleApplication, ApplicationDraft>;
pub type CrossReferenceDiff = EntityDiff<CrossReferenceDraft, CrossReference, CrossReferenceDraft>;
pub type AliasDiff = EntityDiff<VehicleAlias, VehicleAlias>;

// ==========================================
// Diff - 一次导入的完整差异
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub parts: PartDiff,
    pub vehicle_applications: ApplicationDiff,
    pub cross_references: CrossReferenceDiff,
    pub aliases: AliasDiff,
    pub summary: DiffSummary,
    /// 差异阶段产生的警告（级联删除 W9）
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl Diff {
    /// 根据各集合重新计算汇总
    pub fn refresh_summary(&mut self) {
        let parts = self.parts.counts();
        let vehicle_applications = self.vehicle_applications.counts();
        let cross_references = self.cross_references.counts();
        let aliases = self.aliases.counts();
        self.summary = DiffSummary {
            parts,
            vehicle_applications,
            cross_references,
            aliases,
            total_changes: parts.total()
                + vehicle_applications.total()
                + cross_references.total()
                + aliases.total(),
        };
    }

    pub fn is_empty(&self) -> bool {
        self.summary.total_changes == 0
    }
}
