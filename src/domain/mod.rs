// ==========================================
// 零件目录导入 - 领域模型层
// ==========================================
// 职责: 定义目录实体、表格行、校验问题、差异、快照
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod catalog;
pub mod diff;
pub mod issue;
pub mod rows;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use catalog::{CatalogState, CrossReference, Part, TableCounts, VehicleAlias, VehicleApplication};
pub use diff::{
    AddedEntry, AliasDiff, ApplicationDiff, ApplicationDraft, CrossReferenceDiff,
    CrossReferenceDraft, DeleteReason, DeletedEntry, Diff, DiffSummary, EntityCounts, EntityDiff,
    FieldChange, PartDiff, PartDraft, UpdatedEntry,
};
pub use issue::{IssueCode, ValidationIssue, ValidationReport};
pub use rows::{
    AliasRow, CrossReferenceRow, ExtractedRows, PartRef, PartRow, RawCellDiagnostic, RowId,
    SheetLayout, SourceRef, VehicleApplicationRow,
};
pub use snapshot::{ImportHistoryEntry, ImportSnapshot, ImportSummary, SnapshotData, SnapshotSet};
pub use types::{AliasType, EntityKind, RowAction, Severity, WorkflowStatus};
