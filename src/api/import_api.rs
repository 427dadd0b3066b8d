// ==========================================
// 零件目录导入 API
// ==========================================
// 职责: 封装 校验 / 预览 / 执行 / 回滚 / 历史，输出对外 JSON 结构
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::diff::Diff;
use crate::domain::issue::{IssueCode, ValidationIssue, ValidationReport};
use crate::domain::snapshot::{ImportHistoryEntry, ImportSummary};
use crate::importer::{
    CatalogImporter, CatalogImporterImpl, ExcelWorkbookParser, RawWorkbook, WorkbookParser,
};
use crate::repository::SqliteCatalogStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, instrument};

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub valid: bool,
    /// 校验未通过时为空
    pub diff: Option<Diff>,
    pub errors: Vec<ValidationIssue>,
    /// 校验警告 + 差异阶段警告（W9）
    pub warnings: Vec<ValidationIssue>,
}

/// 执行响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub import_id: String,
    pub summary: ImportSummary,
}

/// 回滚响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResponse {
    pub success: bool,
    pub import_id: String,
}

type Importer = CatalogImporterImpl<SqliteCatalogStore, ConfigManager>;

/// 导入 API
pub struct ImportApi {
    db_path: String,
}

impl ImportApi {
    /// 创建新的 ImportApi 实例
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// 确保数据库与表结构存在
    pub fn init_db(&self) -> ApiResult<()> {
        SqliteCatalogStore::open(&self.db_path)?;
        info!(db_path = %self.db_path, "数据库已初始化");
        Ok(())
    }

    fn create_importer(&self) -> ApiResult<Importer> {
        let store = SqliteCatalogStore::open(&self.db_path)?;
        let config = ConfigManager::from_connection(store.connection());
        Ok(CatalogImporterImpl::new(store, config))
    }

    fn read_workbook(file_path: &str) -> ApiResult<RawWorkbook> {
        Ok(ExcelWorkbookParser.parse_file(Path::new(file_path))?)
    }

    /// 解析确认的警告编码（如 "W3"）
    pub fn parse_acknowledged<T: AsRef<str>>(codes: &[T]) -> ApiResult<BTreeSet<IssueCode>> {
        codes
            .iter()
            .map(|c| {
                c.as_ref()
                    .parse::<IssueCode>()
                    .map_err(ApiError::InvalidInput)
            })
            .collect()
    }

    // ==========================================
    // 文件入口
    // ==========================================

    pub async fn validate(&self, file_path: &str) -> ApiResult<ValidationReport> {
        let workbook = Self::read_workbook(file_path)?;
        self.validate_workbook(&workbook).await
    }

    pub async fn preview(&self, file_path: &str) -> ApiResult<PreviewResponse> {
        let workbook = Self::read_workbook(file_path)?;
        self.preview_workbook(&workbook).await
    }

    pub async fn execute(&self, file_path: &str, acknowledged: &[String]) -> ApiResult<ExecuteResponse> {
        let acknowledged = Self::parse_acknowledged(acknowledged)?;
        let workbook = Self::read_workbook(file_path)?;
        self.execute_workbook(&workbook, &acknowledged).await
    }

    // ==========================================
    // 工作簿入口
    // ==========================================

    #[instrument(skip_all)]
    pub async fn validate_workbook(&self, workbook: &RawWorkbook) -> ApiResult<ValidationReport> {
        Ok(self.create_importer()?.validate(workbook).await?)
    }

    #[instrument(skip_all)]
    pub async fn preview_workbook(&self, workbook: &RawWorkbook) -> ApiResult<PreviewResponse> {
        let preview = self.create_importer()?.preview(workbook).await?;
        let mut warnings = preview.report.warnings;
        if let Some(diff) = &preview.diff {
            warnings.extend(diff.warnings.iter().cloned());
        }
        Ok(PreviewResponse {
            valid: preview.report.valid,
            diff: preview.diff,
            errors: preview.report.errors,
            warnings,
        })
    }

    #[instrument(skip_all)]
    pub async fn execute_workbook(
        &self,
        workbook: &RawWorkbook,
        acknowledged: &BTreeSet<IssueCode>,
    ) -> ApiResult<ExecuteResponse> {
        let outcome = self
            .create_importer()?
            .execute(workbook, acknowledged)
            .await?;
        Ok(ExecuteResponse {
            success: true,
            import_id: outcome.import_id,
            summary: outcome.summary,
        })
    }

    // ==========================================
    // 回滚 / 历史
    // ==========================================

    #[instrument(skip(self))]
    pub async fn rollback(&self, import_id: &str) -> ApiResult<RollbackResponse> {
        if import_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("importId 不能为空".to_string()));
        }
        let outcome = self.create_importer()?.rollback(import_id.trim()).await?;
        Ok(RollbackResponse {
            success: true,
            import_id: outcome.import_id,
        })
    }

    pub async fn history(&self, limit: usize) -> ApiResult<Vec<ImportHistoryEntry>> {
        Ok(self.create_importer()?.history(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acknowledged_codes() {
        let codes = ImportApi::parse_acknowledged(&["w3", " W9 "]).unwrap();
        assert!(codes.contains(&IssueCode::PartTypeChanged));
        assert!(codes.contains(&IssueCode::CascadeDelete));

        assert!(matches!(
            ImportApi::parse_acknowledged(&["W99"]),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
