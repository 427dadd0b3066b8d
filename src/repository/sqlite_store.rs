// ==========================================
// 零件目录导入 - SQLite 目录存储
// ==========================================
// 对齐: db.rs parts / vehicle_applications / cross_references / vehicle_aliases / import_history 表
// 红线: 写入仅在 BEGIN IMMEDIATE 事务内进行，未提交的行对并发读者不可见
// ==========================================

mod core;
mod history;
mod rows;
mod writer;


pub use core::SqliteCatalogStore;
pub use writer::SqliteCatalogWriter;
