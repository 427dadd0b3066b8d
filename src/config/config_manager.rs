// ==========================================
// 零件目录导入 - 配置管理器
// ==========================================
// 职责: 导入规则的加载与覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::import_rules::{normalize_brand, FieldLimits, ImportRules};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager（与仓储共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆写）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取整数配置；格式错误时记录告警并回退默认值
    fn get_i32_or_default(&self, key: &str, default: i32) -> ConfigResult<i32> {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<i32>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key = key, value = %raw, "配置值不是整数，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    /// 读取字段长度覆写（import.max_len.<field>）
    fn load_field_limits(&self) -> ConfigResult<FieldLimits> {
        let mut limits = FieldLimits::default();
        for field in FieldLimits::FIELD_NAMES {
            let key = format!("{}{}", config_keys::MAX_LEN_PREFIX, field);
            if let Some(raw) = self.get_config_value(&key)? {
                match raw.trim().parse::<usize>() {
                    Ok(v) if v > 0 => {
                        limits.set(field, v);
                    }
                    _ => warn!(key = %key, value = %raw, "字段长度配置无效，忽略"),
                }
            }
        }
        Ok(limits)
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_sku_prefix(&self) -> ConfigResult<String> {
        let value = self.get_config_value(config_keys::SKU_PREFIX)?;
        Ok(value
            .map(|v| v.trim().to_uppercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| ImportRules::default().sku_prefix))
    }

    async fn get_min_year(&self) -> ConfigResult<i32> {
        self.get_i32_or_default(config_keys::MIN_YEAR, ImportRules::default().min_year)
    }

    async fn get_max_year(&self) -> ConfigResult<i32> {
        let defaults = ImportRules::default();
        // 上限 = 当前年份 + 提前量
        let ahead = self.get_i32_or_default(config_keys::MAX_YEAR_AHEAD, 2)?;
        Ok(defaults.max_year - 2 + ahead)
    }

    async fn get_competitor_brands(&self) -> ConfigResult<Vec<String>> {
        match self.get_config_value(config_keys::COMPETITOR_BRANDS)? {
            Some(raw) => {
                let brands: Vec<String> = raw
                    .split(',')
                    .map(normalize_brand)
                    .filter(|b| !b.is_empty())
                    .collect();
                if brands.is_empty() {
                    Ok(ImportRules::default().competitor_brands)
                } else {
                    Ok(brands)
                }
            }
            None => Ok(ImportRules::default().competitor_brands),
        }
    }

    async fn load_import_rules(&self) -> ConfigResult<ImportRules> {
        Ok(ImportRules {
            sku_prefix: self.get_sku_prefix().await?,
            min_year: self.get_min_year().await?,
            max_year: self.get_max_year().await?,
            limits: self.load_field_limits()?,
            competitor_brands: self.get_competitor_brands().await?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const SKU_PREFIX: &str = "import.sku_prefix";
    pub const MIN_YEAR: &str = "import.min_year";
    pub const MAX_YEAR_AHEAD: &str = "import.max_year_ahead";
    pub const COMPETITOR_BRANDS: &str = "import.competitor_brands"; // 逗号分隔
    pub const MAX_LEN_PREFIX: &str = "import.max_len.";
}
