// ==========================================
// 零件目录导入 - 目录存储接口
// ==========================================
// 职责: 定义导入管道使用的存储能力（按键读取、事务内写入）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 红线: 组件不持有全局存储客户端，统一通过该接口注入
// ==========================================

use crate::domain::catalog::{CatalogState, CrossReference, Part, TableCounts, VehicleAlias, VehicleApplication};
use crate::domain::snapshot::{ImportHistoryEntry, ImportSnapshot};
use crate::domain::types::AliasType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};

// ==========================================
// CatalogWriter - 事务内写入句柄
// ==========================================
// 生命周期: 仅在 CatalogStore::in_transaction 闭包内有效
// 约定: update/delete 影响 0 行时返回 NotFound（差异已过期）
pub trait CatalogWriter {
    // ===== 零件 =====
    fn insert_part(&self, part: &Part) -> RepositoryResult<()>;
    fn update_part(&self, part: &Part) -> RepositoryResult<()>;
    fn delete_part(&self, id: &str) -> RepositoryResult<()>;

    // ===== 车型适配 =====
    fn insert_vehicle_application(&self, application: &VehicleApplication) -> RepositoryResult<()>;
    fn update_vehicle_application(&self, application: &VehicleApplication) -> RepositoryResult<()>;
    fn delete_vehicle_application(&self, id: &str) -> RepositoryResult<()>;

    // ===== 交叉引用 =====
    fn insert_cross_reference(&self, cross_ref: &CrossReference) -> RepositoryResult<()>;
    fn update_cross_reference(&self, cross_ref: &CrossReference) -> RepositoryResult<()>;
    fn delete_cross_reference(&self, id: &str) -> RepositoryResult<()>;

    // ===== 别名 =====
    fn insert_alias(&self, alias: &VehicleAlias) -> RepositoryResult<()>;
    fn update_alias(&self, alias: &VehicleAlias) -> RepositoryResult<()>;
    fn delete_alias(&self, alias: &str, alias_type: AliasType) -> RepositoryResult<()>;

    // ===== 导入历史 =====
    fn insert_import(&self, snapshot: &ImportSnapshot) -> RepositoryResult<()>;
    fn load_import(&self, id: &str) -> RepositoryResult<Option<ImportSnapshot>>;

    /// 标记快照已被回滚消费；已消费返回 PreconditionRejected
    fn mark_import_consumed(&self, id: &str, at: DateTime<Utc>) -> RepositoryResult<()>;

    /// 将外键检查推迟到提交时（回滚重放使用）
    fn defer_foreign_keys(&self) -> RepositoryResult<()>;

    fn count_rows(&self) -> RepositoryResult<TableCounts>;
}

// ==========================================
// CatalogStore - 存储访问接口
// ==========================================
// 实现者: SqliteCatalogStore（使用 rusqlite）
pub trait CatalogStore: Send + Sync {
    /// 读取当前目录全量状态（校验与差异计算输入）
    fn load_state(&self) -> RepositoryResult<CatalogState>;

    /// 按 id 读取导入快照
    fn find_import(&self, id: &str) -> RepositoryResult<Option<ImportSnapshot>>;

    /// 列出导入历史（新到旧）
    fn list_imports(&self, limit: usize) -> RepositoryResult<Vec<ImportHistoryEntry>>;

    /// 各表行数
    fn count_rows(&self) -> RepositoryResult<TableCounts>;

    /// 在单个写事务中执行闭包
    ///
    /// # 返回
    /// - Ok: 闭包成功且事务已提交
    /// - Err: 闭包失败或提交失败，事务整体回滚，存储无任何变化
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&dyn CatalogWriter) -> Result<T, E>;
}
