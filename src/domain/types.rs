// ==========================================
// 零件目录导入 - 领域类型定义
// ==========================================
// 职责: 工作流状态 / 行动作标记 / 别名类型 / 实体类别 / 问题级别
// 序列化格式: 与数据库存储值一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 零件工作流状态 (Workflow Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Active,   // 在用
    Inactive, // 停用
    Delete,   // 待删除（仅标记，不触发物理删除）
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Active => "ACTIVE",
            WorkflowStatus::Inactive => "INACTIVE",
            WorkflowStatus::Delete => "DELETE",
        }
    }

    /// 从单元格文本解析（大小写不敏感）
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(WorkflowStatus::Active),
            "INACTIVE" => Some(WorkflowStatus::Inactive),
            "DELETE" => Some(WorkflowStatus::Delete),
            _ => None,
        }
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        WorkflowStatus::Active
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 行动作标记 (Row Action)
// ==========================================
// 红线: 删除意图只来自行动作标记，不从空列推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Keep,   // Activo - 保留/新增/更新
    Delete, // Eliminar - 删除
}

impl RowAction {
    pub const KEEP_LABEL: &'static str = "Activo";
    pub const DELETE_LABEL: &'static str = "Eliminar";

    /// 解析动作列；空值视为 Activo，未识别值返回 None
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let value = match raw.map(str::trim) {
            None | Some("") => return Some(RowAction::Keep),
            Some(v) => v.to_lowercase(),
        };

        match value.as_str() {
            "activo" => Some(RowAction::Keep),
            "eliminar" => Some(RowAction::Delete),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RowAction::Keep => Self::KEEP_LABEL,
            RowAction::Delete => Self::DELETE_LABEL,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, RowAction::Delete)
    }
}

// ==========================================
// 别名类型 (Alias Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasType {
    Make,
    Model,
}

impl AliasType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasType::Make => "make",
            AliasType::Model => "model",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "make" => Some(AliasType::Make),
            "model" => Some(AliasType::Model),
            _ => None,
        }
    }
}

impl fmt::Display for AliasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 实体类别 (Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Part,
    VehicleApplication,
    CrossReference,
    Alias,
}

impl EntityKind {
    /// 实体对应的工作表名（交叉引用挂在 Parts 表的品牌列上）
    pub fn sheet_name(&self) -> &'static str {
        match self {
            EntityKind::Part | EntityKind::CrossReference => "Parts",
            EntityKind::VehicleApplication => "Vehicle Applications",
            EntityKind::Alias => "Aliases",
        }
    }

    /// 工作表排序权重，用于问题列表的确定性排序
    pub fn sheet_rank(sheet: &str) -> usize {
        match sheet {
            "Parts" => 0,
            "Vehicle Applications" => 1,
            "Aliases" => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Part => write!(f, "part"),
            EntityKind::VehicleApplication => write!(f, "vehicle_application"),
            EntityKind::CrossReference => write!(f, "cross_reference"),
            EntityKind::Alias => write!(f, "alias"),
        }
    }
}

// ==========================================
// 问题级别 (Severity)
// ==========================================
// 红线: 错误与警告永不合并
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,   // 阻断：必须修正源文件
    Warning, // 需确认：执行前必须显式确认
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_action_parse() {
        assert_eq!(RowAction::parse(None), Some(RowAction::Keep));
        assert_eq!(RowAction::parse(Some("  ")), Some(RowAction::Keep));
        assert_eq!(RowAction::parse(Some("Activo")), Some(RowAction::Keep));
        assert_eq!(RowAction::parse(Some("ELIMINAR")), Some(RowAction::Delete));
        assert_eq!(RowAction::parse(Some("borrar")), None);
    }

    #[test]
    fn test_workflow_status_parse() {
        assert_eq!(WorkflowStatus::parse("active"), Some(WorkflowStatus::Active));
        assert_eq!(WorkflowStatus::parse(" INACTIVE "), Some(WorkflowStatus::Inactive));
        assert_eq!(WorkflowStatus::parse("archived"), None);
    }

    #[test]
    fn test_alias_type_parse() {
        assert_eq!(AliasType::parse("Make"), Some(AliasType::Make));
        assert_eq!(AliasType::parse("MODEL"), Some(AliasType::Model));
        assert_eq!(AliasType::parse("trim"), None);
    }
}
