// ==========================================
// 零件目录导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: E/W 问题编码不属于此处；此处为流程级失败
// ==========================================

use crate::domain::issue::IssueCode;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    // ===== 流程门禁 =====
    #[error("校验未通过: {errors} 个错误")]
    ValidationBlocked { errors: usize },

    #[error("存在未确认的警告: {}", format_codes(.0))]
    WarningsNotAcknowledged(Vec<IssueCode>),

    #[error("未检测到任何变更")]
    NoChanges,

    // ===== 事务错误 =====
    #[error("导入事务失败，已整体回滚: {0}")]
    TransactionFailed(#[source] RepositoryError),

    // ===== 回滚错误 =====
    #[error("回滚被拒绝: {0}")]
    RollbackRejected(String),

    #[error("导入记录不存在: {0}")]
    ImportNotFound(String),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigReadError(String),

    // ===== 快照 =====
    #[error("快照编解码失败: {0}")]
    SnapshotCodecError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

fn format_codes(codes: &[IssueCode]) -> String {
    codes
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::SnapshotCodecError(err.to_string())
    }
}

// 仓储错误在导入流程中一律视为事务失败
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::SerializationError(msg) => ImportError::SnapshotCodecError(msg),
            other => ImportError::TransactionFailed(other),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
