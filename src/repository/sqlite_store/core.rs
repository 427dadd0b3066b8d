use super::{history, rows, SqliteCatalogWriter};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::catalog::{CatalogState, TableCounts};
use crate::domain::snapshot::{ImportHistoryEntry, ImportSnapshot};
use crate::repository::catalog_store::{CatalogStore, CatalogWriter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

// ==========================================
// SqliteCatalogStore - 目录存储（rusqlite 实现）
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// 基于共享连接创建存储（连接需已完成 PRAGMA 配置与建表）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并确保表结构存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 共享连接（供 ConfigManager 复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn load_state(&self) -> RepositoryResult<CatalogState> {
        let conn = self.get_conn()?;
        rows::load_state(&conn)
    }

    fn find_import(&self, id: &str) -> RepositoryResult<Option<ImportSnapshot>> {
        let conn = self.get_conn()?;
        history::load_import(&conn, id)
    }

    fn list_imports(&self, limit: usize) -> RepositoryResult<Vec<ImportHistoryEntry>> {
        let conn = self.get_conn()?;
        history::list_imports(&conn, limit)
    }

    fn count_rows(&self) -> RepositoryResult<TableCounts> {
        let conn = self.get_conn()?;
        rows::count_rows(&conn)
    }

    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&dyn CatalogWriter) -> Result<T, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!("写事务已开启 (IMMEDIATE)");

        let result = {
            let writer = SqliteCatalogWriter::new(&tx);
            f(&writer)
        };

        match result {
            Ok(value) => {
                // 延迟外键在提交时检查，失败时事务随 drop 回滚
                tx.commit().map_err(RepositoryError::from)?;
                debug!("写事务已提交");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "事务回滚失败");
                }
                debug!("写事务已回滚");
                Err(err)
            }
        }
    }
}
