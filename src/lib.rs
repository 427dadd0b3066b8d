// ==========================================
// 零件目录导入 - 核心库
// ==========================================
// 职责: 表格批量编辑 → 校验 → 最小差异 → 原子执行 → 快照回滚
// 技术栈: Rust + SQLite + calamine
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 校验 / 差异 / 执行 / 回滚
pub mod importer;

// 配置层 - 导入规则
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::{ApiError, ImportApi};
pub use domain::{Diff, ImportSnapshot, IssueCode, ValidationIssue, ValidationReport};
pub use importer::{CatalogImporter, CatalogImporterImpl, ImportError};
pub use repository::{CatalogStore, SqliteCatalogStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "零件目录导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
