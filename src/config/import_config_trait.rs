// ==========================================
// 零件目录导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_rules::ImportRules;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）、ImportRules（静态规则）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取 SKU 前缀
    ///
    /// # 默认值
    /// - "ACR"
    async fn get_sku_prefix(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 获取年份下限（含）
    ///
    /// # 默认值
    /// - 1900
    async fn get_min_year(&self) -> Result<i32, Box<dyn Error + Send + Sync>>;

    /// 获取年份上限（含）
    ///
    /// # 默认值
    /// - 当前年份 + 2
    async fn get_max_year(&self) -> Result<i32, Box<dyn Error + Send + Sync>>;

    /// 获取竞品品牌列（规范化大写）
    async fn get_competitor_brands(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>>;

    /// 组装完整规则
    ///
    /// # 说明
    /// - 默认实现逐项读取；字段长度上限使用默认值
    async fn load_import_rules(&self) -> Result<ImportRules, Box<dyn Error + Send + Sync>> {
        Ok(ImportRules {
            sku_prefix: self.get_sku_prefix().await?,
            min_year: self.get_min_year().await?,
            max_year: self.get_max_year().await?,
            competitor_brands: self.get_competitor_brands().await?,
            ..ImportRules::default()
        })
    }
}

// 静态规则直接作为配置源（测试与离线校验使用）
#[async_trait]
impl ImportConfigReader for ImportRules {
    async fn get_sku_prefix(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(self.sku_prefix.clone())
    }

    async fn get_min_year(&self) -> Result<i32, Box<dyn Error + Send + Sync>> {
        Ok(self.min_year)
    }

    async fn get_max_year(&self) -> Result<i32, Box<dyn Error + Send + Sync>> {
        Ok(self.max_year)
    }

    async fn get_competitor_brands(&self) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        Ok(self.competitor_brands.clone())
    }

    async fn load_import_rules(&self) -> Result<ImportRules, Box<dyn Error + Send + Sync>> {
        Ok(self.clone())
    }
}
