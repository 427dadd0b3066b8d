// ==========================================
// 零件目录导入 - 校验问题模型
// ==========================================
// 职责: 稳定问题编码 (E*/W*) + 问题记录 + 校验报告
// 红线: 错误与警告分开上报，编码是对外契约
// ==========================================

use crate::domain::types::{EntityKind, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ==========================================
// IssueCode - 问题编码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    // ===== 错误 =====
    #[serde(rename = "E1")]
    MissingHiddenColumn,
    #[serde(rename = "E2")]
    DuplicateSku,
    #[serde(rename = "E3")]
    RequiredFieldEmpty,
    #[serde(rename = "E4")]
    MalformedId,
    #[serde(rename = "E5")]
    UnresolvedPartReference,
    #[serde(rename = "E6")]
    YearRangeInverted,
    #[serde(rename = "E7")]
    FieldTooLong,
    #[serde(rename = "E8")]
    YearOutOfBounds,
    #[serde(rename = "E9")]
    IdNotFound,
    #[serde(rename = "E10")]
    DuplicateId,
    #[serde(rename = "E11")]
    InvalidNumber,
    #[serde(rename = "E12")]
    InvalidEnumValue,
    #[serde(rename = "E13")]
    MissingSheet,
    #[serde(rename = "E20")]
    SkuFormat,
    #[serde(rename = "E21")]
    UnknownRowAction,
    #[serde(rename = "E22")]
    InvalidUrl,
    #[serde(rename = "E23")]
    DuplicateAlias,
    #[serde(rename = "E24")]
    SkuTaken,

    // ===== 警告 =====
    #[serde(rename = "W1")]
    SkuChanged,
    #[serde(rename = "W3")]
    PartTypeChanged,
    #[serde(rename = "W4")]
    PositionChanged,
    #[serde(rename = "W7")]
    SpecificationsShortened,
    #[serde(rename = "W9")]
    CascadeDelete,
    #[serde(rename = "W11")]
    DuplicateCompetitorSku,
    #[serde(rename = "W12")]
    SpaceDelimitedSkus,
    #[serde(rename = "W13")]
    DeleteMarkerUnmatched,
}

impl IssueCode {
    pub const ALL: [IssueCode; 26] = [
        IssueCode::MissingHiddenColumn,
        IssueCode::DuplicateSku,
        IssueCode::RequiredFieldEmpty,
        IssueCode::MalformedId,
        IssueCode::UnresolvedPartReference,
        IssueCode::YearRangeInverted,
        IssueCode::FieldTooLong,
        IssueCode::YearOutOfBounds,
        IssueCode::IdNotFound,
        IssueCode::DuplicateId,
        IssueCode::InvalidNumber,
        IssueCode::InvalidEnumValue,
        IssueCode::MissingSheet,
        IssueCode::SkuFormat,
        IssueCode::UnknownRowAction,
        IssueCode::InvalidUrl,
        IssueCode::DuplicateAlias,
        IssueCode::SkuTaken,
        IssueCode::SkuChanged,
        IssueCode::PartTypeChanged,
        IssueCode::PositionChanged,
        IssueCode::SpecificationsShortened,
        IssueCode::CascadeDelete,
        IssueCode::DuplicateCompetitorSku,
        IssueCode::SpaceDelimitedSkus,
        IssueCode::DeleteMarkerUnmatched,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingHiddenColumn => "E1",
            IssueCode::DuplicateSku => "E2",
            IssueCode::RequiredFieldEmpty => "E3",
            IssueCode::MalformedId => "E4",
            IssueCode::UnresolvedPartReference => "E5",
            IssueCode::YearRangeInverted => "E6",
            IssueCode::FieldTooLong => "E7",
            IssueCode::YearOutOfBounds => "E8",
            IssueCode::IdNotFound => "E9",
            IssueCode::DuplicateId => "E10",
            IssueCode::InvalidNumber => "E11",
            IssueCode::InvalidEnumValue => "E12",
            IssueCode::MissingSheet => "E13",
            IssueCode::SkuFormat => "E20",
            IssueCode::UnknownRowAction => "E21",
            IssueCode::InvalidUrl => "E22",
            IssueCode::DuplicateAlias => "E23",
            IssueCode::SkuTaken => "E24",
            IssueCode::SkuChanged => "W1",
            IssueCode::PartTypeChanged => "W3",
            IssueCode::PositionChanged => "W4",
            IssueCode::SpecificationsShortened => "W7",
            IssueCode::CascadeDelete => "W9",
            IssueCode::DuplicateCompetitorSku => "W11",
            IssueCode::SpaceDelimitedSkus => "W12",
            IssueCode::DeleteMarkerUnmatched => "W13",
        }
    }

    pub fn severity(&self) -> Severity {
        if self.as_str().starts_with('E') {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        IssueCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == wanted)
            .ok_or_else(|| format!("未知问题编码: {}", s))
    }
}

// ==========================================
// ValidationIssue - 单条问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub sheet: String,
    pub row: Option<usize>,        // 工作表级问题 (E13) 无行号
    pub column: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_rows: Vec<usize>,  // E2 等跨行问题涉及的全部行号
}

impl ValidationIssue {
    pub fn new(code: IssueCode, sheet: impl Into<String>, row: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            sheet: sheet.into(),
            row,
            column: None,
            message: message.into(),
            related_rows: Vec::new(),
        }
    }

    pub fn at(code: IssueCode, entity: EntityKind, row: usize, message: impl Into<String>) -> Self {
        Self::new(code, entity.sheet_name(), Some(row), message)
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_related_rows(mut self, rows: Vec<usize>) -> Self {
        self.related_rows = rows;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ==========================================
// ValidationReport - 校验结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// 按既定顺序拆分错误/警告；存在任一错误即 invalid
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues.into_iter().partition(|i| i.is_error());
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn warning_codes(&self) -> BTreeSet<IssueCode> {
        self.warnings.iter().map(|w| w.code).collect()
    }

    pub fn error_codes(&self) -> BTreeSet<IssueCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    pub fn count(&self, code: IssueCode) -> usize {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(|i| i.code == code)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_code_roundtrip_text() {
        for code in IssueCode::ALL {
            assert_eq!(code.as_str().parse::<IssueCode>().unwrap(), code);
        }
        assert_eq!("w3".parse::<IssueCode>().unwrap(), IssueCode::PartTypeChanged);
        assert!("E99".parse::<IssueCode>().is_err());
    }

    #[test]
    fn test_issue_code_serializes_as_code() {
        let json = serde_json::to_string(&IssueCode::YearRangeInverted).unwrap();
        assert_eq!(json, "\"E6\"");
    }

    #[test]
    fn test_report_partitions_by_severity() {
        let report = ValidationReport::from_issues(vec![
            ValidationIssue::new(IssueCode::PartTypeChanged, "Parts", Some(4), "w"),
            ValidationIssue::new(IssueCode::DuplicateSku, "Parts", Some(5), "e"),
        ]);

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warning_codes().into_iter().collect::<Vec<_>>(), vec![IssueCode::PartTypeChanged]);
    }
}
