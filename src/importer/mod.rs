// ==========================================
// 零件目录导入 - 导入层
// ==========================================
// 职责: 表格 → 强类型行 → 校验 → 差异 → 原子执行 / 回滚
// 支持: Excel (.xlsx)
// ==========================================

// 模块声明
pub mod catalog_importer;
pub mod columns;
pub mod cross_ref;
pub mod diff_engine;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod row_extractor;
pub mod snapshot_service;
pub mod store_index;
pub mod template_export;
pub mod validator;
pub mod workbook;

// 重导出核心类型
pub use catalog_importer::{CatalogImporter, CatalogImporterImpl, Preview};
pub use diff_engine::DiffEngine;
pub use error::{ImportError, ImportResult};
pub use executor::{ExecuteOutcome, ImportExecutor, WarningGate};
pub use row_extractor::RowExtractor;
pub use snapshot_service::{RollbackOutcome, SnapshotService};
pub use template_export::export_workbook;
pub use validator::Validator;
pub use workbook::{ExcelWorkbookParser, RawRow, RawSheet, RawWorkbook, WorkbookParser};
