// ==========================================
// 零件目录导入 - 导入编排
// ==========================================
// 流程: 提取 → 校验（错误即停止）→ 差异 → 警告确认 → 快照 + 原子执行
// 职责: 串联各组件；存储与配置通过接口注入
// ==========================================

use crate::config::{ImportConfigReader, ImportRules};
use crate::domain::diff::Diff;
use crate::domain::issue::{IssueCode, ValidationReport};
use crate::domain::rows::ExtractedRows;
use crate::domain::snapshot::ImportHistoryEntry;
use crate::importer::diff_engine::DiffEngine;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::executor::{ExecuteOutcome, ImportExecutor, WarningGate};
use crate::importer::row_extractor::RowExtractor;
use crate::importer::snapshot_service::{RollbackOutcome, SnapshotService};
use crate::importer::validator::Validator;
use crate::importer::workbook::RawWorkbook;
use crate::repository::catalog_store::CatalogStore;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{error, info, instrument, warn};

/// 预览结果：校验报告 + 差异（校验未通过时无差异）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub report: ValidationReport,
    pub diff: Option<Diff>,
}

// ==========================================
// CatalogImporter Trait
// ==========================================
// 实现者: CatalogImporterImpl
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 仅校验
    async fn validate(&self, workbook: &RawWorkbook) -> ImportResult<ValidationReport>;

    /// 校验 + 差异预览（不写入）
    async fn preview(&self, workbook: &RawWorkbook) -> ImportResult<Preview>;

    /// 执行导入
    ///
    /// # 参数
    /// - workbook: 已解析的工作簿
    /// - acknowledged: 调用方已确认的警告编码
    ///
    /// # 返回
    /// - Ok(ExecuteOutcome): 导入历史 id + 计数
    /// - Err(ValidationBlocked / WarningsNotAcknowledged / NoChanges): 写入前拒绝
    /// - Err(TransactionFailed): 事务已整体回滚
    async fn execute(
        &self,
        workbook: &RawWorkbook,
        acknowledged: &BTreeSet<IssueCode>,
    ) -> ImportResult<ExecuteOutcome>;

    /// 回滚一次导入
    async fn rollback(&self, import_id: &str) -> ImportResult<RollbackOutcome>;

    /// 导入历史（新到旧）
    async fn history(&self, limit: usize) -> ImportResult<Vec<ImportHistoryEntry>>;
}

// ==========================================
// CatalogImporterImpl
// ==========================================
pub struct CatalogImporterImpl<S, C>
where
    S: CatalogStore,
    C: ImportConfigReader,
{
    // 数据访问层
    store: S,

    // 配置读取器
    config: C,
}

/// 一次分析（提取 + 校验）的中间结果
struct Analysis {
    state: crate::domain::catalog::CatalogState,
    rows: ExtractedRows,
    report: ValidationReport,
}

impl<S, C> CatalogImporterImpl<S, C>
where
    S: CatalogStore,
    C: ImportConfigReader,
{
    pub fn new(store: S, config: C) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_rules(&self) -> ImportResult<ImportRules> {
        self.config.load_import_rules().await.map_err(|e| {
            error!(error = %e, "导入规则读取失败");
            ImportError::ConfigReadError(e.to_string())
        })
    }

    async fn analyse(&self, workbook: &RawWorkbook) -> ImportResult<Analysis> {
        let rules = self.load_rules().await?;
        let state = self.store.load_state()?;
        let rows = RowExtractor::new(&rules).extract(workbook);
        let report = Validator::new(&rules).validate(&rows, &state);
        Ok(Analysis { state, rows, report })
    }
}

#[async_trait]
impl<S, C> CatalogImporter for CatalogImporterImpl<S, C>
where
    S: CatalogStore,
    C: ImportConfigReader,
{
    #[instrument(skip_all)]
    async fn validate(&self, workbook: &RawWorkbook) -> ImportResult<ValidationReport> {
        Ok(self.analyse(workbook).await?.report)
    }

    #[instrument(skip_all)]
    async fn preview(&self, workbook: &RawWorkbook) -> ImportResult<Preview> {
        let analysis = self.analyse(workbook).await?;
        if !analysis.report.valid {
            return Ok(Preview {
                report: analysis.report,
                diff: None,
            });
        }

        let diff = DiffEngine::new(&analysis.state).compute(&analysis.rows);
        Ok(Preview {
            report: analysis.report,
            diff: Some(diff),
        })
    }

    #[instrument(skip_all, fields(acknowledged = ?acknowledged))]
    async fn execute(
        &self,
        workbook: &RawWorkbook,
        acknowledged: &BTreeSet<IssueCode>,
    ) -> ImportResult<ExecuteOutcome> {
        let analysis = self.analyse(workbook).await?;
        if !analysis.report.valid {
            warn!(errors = analysis.report.errors.len(), "校验未通过，拒绝执行");
            return Err(ImportError::ValidationBlocked {
                errors: analysis.report.errors.len(),
            });
        }

        let diff = DiffEngine::new(&analysis.state).compute(&analysis.rows);
        if diff.is_empty() {
            info!("未检测到变更");
            return Err(ImportError::NoChanges);
        }

        WarningGate::new(&analysis.report, &diff, acknowledged).check()?;

        ImportExecutor::new(&self.store).execute(&diff)
    }

    #[instrument(skip(self))]
    async fn rollback(&self, import_id: &str) -> ImportResult<RollbackOutcome> {
        SnapshotService::rollback(&self.store, import_id)
    }

    async fn history(&self, limit: usize) -> ImportResult<Vec<ImportHistoryEntry>> {
        Ok(self.store.list_imports(limit)?)
    }
}
