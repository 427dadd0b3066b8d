// ==========================================
// 零件目录导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 建表语句集中管理，依赖表不使用 ON DELETE CASCADE（级联由差异引擎显式生成）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 创建目录表与导入历史表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS parts (
            id              TEXT PRIMARY KEY,
            acr_sku         TEXT NOT NULL UNIQUE,
            part_type       TEXT NOT NULL,
            position_type   TEXT,
            abs_type        TEXT,
            bolt_pattern    TEXT,
            drive_type      TEXT,
            specifications  TEXT,
            workflow_status TEXT NOT NULL DEFAULT 'ACTIVE'
                CHECK (workflow_status IN ('ACTIVE', 'INACTIVE', 'DELETE')),
            image_url       TEXT,
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS vehicle_applications (
            id          TEXT PRIMARY KEY,
            part_id     TEXT NOT NULL REFERENCES parts(id),
            make        TEXT NOT NULL,
            model       TEXT NOT NULL,
            start_year  INTEGER NOT NULL,
            end_year    INTEGER NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK (start_year <= end_year)
        );
        CREATE INDEX IF NOT EXISTS idx_vehicle_applications_part
            ON vehicle_applications(part_id);

        CREATE TABLE IF NOT EXISTS cross_references (
            id               TEXT PRIMARY KEY,
            part_id          TEXT NOT NULL REFERENCES parts(id),
            competitor_brand TEXT NOT NULL,
            competitor_sku   TEXT NOT NULL,
            updated_at       TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (part_id, competitor_brand, competitor_sku)
        );
        CREATE INDEX IF NOT EXISTS idx_cross_references_part
            ON cross_references(part_id);

        CREATE TABLE IF NOT EXISTS vehicle_aliases (
            alias          TEXT NOT NULL,
            canonical_name TEXT NOT NULL,
            alias_type     TEXT NOT NULL CHECK (alias_type IN ('make', 'model')),
            updated_at     TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (alias, alias_type)
        );

        CREATE TABLE IF NOT EXISTS import_history (
            id             TEXT PRIMARY KEY,
            rows_imported  INTEGER NOT NULL,
            snapshot_data  TEXT NOT NULL,
            import_summary TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            consumed_at    TEXT
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id   TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CATALOG_IMPORT_DB_PATH";

/// 默认数据库路径
///
/// # 顺序
/// 1. 环境变量 CATALOG_IMPORT_DB_PATH
/// 2. 用户数据目录 catalog-import/catalog.db
/// 3. 当前目录 ./catalog.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-import");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog.db");
        }
    }
    path.to_string_lossy().to_string()
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_dependent_rows_require_parent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO vehicle_applications (id, part_id, make, model, start_year, end_year)
             VALUES ('va-1', 'missing', 'HONDA', 'CIVIC', 2010, 2012)",
            [],
        );
        assert!(result.is_err());
    }
}
