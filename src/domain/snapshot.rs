// ==========================================
// 零件目录导入 - 导入快照（历史记录）
// ==========================================
// 红线: 每次执行创建一次；不可变；仅能被回滚消费一次
// 对齐: db.rs import_history 表
// ==========================================

use crate::domain::catalog::{CrossReference, Part, VehicleAlias, VehicleApplication};
use crate::domain::diff::DiffSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单实体快照：新增行（含生成的 id）、更新前像、删除前像
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSet<T> {
    pub added: Vec<T>,
    pub updated: Vec<T>,
    pub deleted: Vec<T>,
}

impl<T> Default for SnapshotSet<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> SnapshotSet<T> {
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    pub parts: SnapshotSet<Part>,
    pub vehicle_applications: SnapshotSet<VehicleApplication>,
    pub cross_references: SnapshotSet<CrossReference>,
    pub aliases: SnapshotSet<VehicleAlias>,
}

impl SnapshotData {
    pub fn rows_touched(&self) -> usize {
        self.parts.len()
            + self.vehicle_applications.len()
            + self.cross_references.len()
            + self.aliases.len()
    }
}

// ==========================================
// ImportSummary - 执行结果计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub parts_added: usize,
    pub parts_updated: usize,
    pub parts_deleted: usize,
    pub vehicle_applications_added: usize,
    pub vehicle_applications_updated: usize,
    pub vehicle_applications_deleted: usize,
    pub cross_references_added: usize,
    pub cross_references_updated: usize,
    pub cross_references_deleted: usize,
    pub aliases_added: usize,
    pub aliases_updated: usize,
    pub aliases_deleted: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.parts_added
            + self.parts_updated
            + self.parts_deleted
            + self.vehicle_applications_added
            + self.vehicle_applications_updated
            + self.vehicle_applications_deleted
            + self.cross_references_added
            + self.cross_references_updated
            + self.cross_references_deleted
            + self.aliases_added
            + self.aliases_updated
            + self.aliases_deleted
    }
}

impl From<&DiffSummary> for ImportSummary {
    fn from(s: &DiffSummary) -> Self {
        Self {
            parts_added: s.parts.added,
            parts_updated: s.parts.updated,
            parts_deleted: s.parts.deleted,
            vehicle_applications_added: s.vehicle_applications.added,
            vehicle_applications_updated: s.vehicle_applications.updated,
            vehicle_applications_deleted: s.vehicle_applications.deleted,
            cross_references_added: s.cross_references.added,
            cross_references_updated: s.cross_references.updated,
            cross_references_deleted: s.cross_references.deleted,
            aliases_added: s.aliases.added,
            aliases_updated: s.aliases.updated,
            aliases_deleted: s.aliases.deleted,
        }
    }
}

// ==========================================
// ImportSnapshot - 导入历史记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshot {
    pub id: String,
    pub rows_imported: usize,
    pub snapshot_data: SnapshotData,
    pub import_summary: ImportSummary,
    pub created_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>, // 回滚后写入
}

impl ImportSnapshot {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

/// 历史列表条目（不含快照正文）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistoryEntry {
    pub id: String,
    pub rows_imported: usize,
    pub import_summary: ImportSummary,
    pub created_at: DateTime<Utc>,
    pub consumed: bool,
}
