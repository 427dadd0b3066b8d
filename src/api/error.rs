// ==========================================
// 零件目录导入 - API 层错误类型
// ==========================================
// 职责: 将导入层 / 仓储层错误转换为调用方可区分的错误分类
// 说明: 与 E/W 问题编码分开；问题明细随响应体返回
// ==========================================

use crate::domain::issue::IssueCode;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 流程门禁（需修正文件或确认）
    // ==========================================
    /// 校验存在错误，需修正源文件后重新上传
    #[error("导入无效: {0}")]
    Invalid(String),

    /// 警告未确认
    #[error("需要确认的警告: {}", .0.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "))]
    WarningsNotAcknowledged(Vec<IssueCode>),

    #[error("未检测到任何变更")]
    NoChanges,

    // ==========================================
    // 事务 / 回滚
    // ==========================================
    #[error("导入事务失败，存储未变更: {0}")]
    TransactionFailed(String),

    #[error("回滚被拒绝: {0}")]
    RollbackRejected(String),

    // ==========================================
    // 输入 / 资源
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    Internal(String),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            ImportError::UnsupportedFormat(msg)
            | ImportError::FileReadError(msg)
            | ImportError::ExcelParseError(msg) => ApiError::InvalidInput(msg),
            ImportError::ValidationBlocked { errors } => {
                ApiError::Invalid(format!("{} 个错误需修正", errors))
            }
            ImportError::WarningsNotAcknowledged(codes) => ApiError::WarningsNotAcknowledged(codes),
            ImportError::NoChanges => ApiError::NoChanges,
            ImportError::TransactionFailed(e) => ApiError::TransactionFailed(e.to_string()),
            ImportError::RollbackRejected(msg) => ApiError::RollbackRejected(msg),
            ImportError::ImportNotFound(id) => ApiError::NotFound(format!("导入记录(id={})", id)),
            ImportError::ConfigReadError(msg)
            | ImportError::SnapshotCodecError(msg)
            | ImportError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::PreconditionRejected(msg) => ApiError::RollbackRejected(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_mapping() {
        assert!(matches!(
            ApiError::from(ImportError::ValidationBlocked { errors: 2 }),
            ApiError::Invalid(_)
        ));
        assert!(matches!(ApiError::from(ImportError::NoChanges), ApiError::NoChanges));
        assert!(matches!(
            ApiError::from(ImportError::TransactionFailed(RepositoryError::UniqueConstraintViolation(
                "parts.acr_sku".to_string()
            ))),
            ApiError::TransactionFailed(_)
        ));

        let err = ApiError::from(ImportError::WarningsNotAcknowledged(vec![
            IssueCode::PartTypeChanged,
            IssueCode::CascadeDelete,
        ]));
        assert_eq!(err.to_string(), "需要确认的警告: W3, W9");
    }
}
