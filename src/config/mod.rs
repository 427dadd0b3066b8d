// ==========================================
// 零件目录导入 - 配置层
// ==========================================
// 职责: 导入规则参数管理,支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod import_rules;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::ImportConfigReader;
pub use import_rules::{normalize_brand, FieldLimits, ImportRules, DEFAULT_COMPETITOR_BRANDS, DELETE_MARKER};
