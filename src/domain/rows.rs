// ==========================================
// 零件目录导入 - 表格行中间结构
// ==========================================
// 用途: 行提取器输出，下游组件只处理强类型值
// 生命周期: 仅在一次导入流程内
// ==========================================

use crate::domain::issue::IssueCode;
use crate::domain::types::{AliasType, EntityKind, RowAction, WorkflowStatus};
use serde::{Deserialize, Serialize};

/// 来源定位（工作表名 + 1 起始行号）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub sheet: String,
    pub row: usize,
}

impl SourceRef {
    pub fn new(sheet: impl Into<String>, row: usize) -> Self {
        Self {
            sheet: sheet.into(),
            row,
        }
    }
}

// ==========================================
// RowId - 代理主键标记
// ==========================================
// 无 id 即"新增候选"，不从列为空推断意图
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowId {
    New,
    Existing(String), // 原始文本，形状由校验引擎检查 (E4)
}

impl RowId {
    pub fn from_cell(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => RowId::New,
            Some(v) => RowId::Existing(v.to_string()),
        }
    }

    pub fn existing(&self) -> Option<&str> {
        match self {
            RowId::New => None,
            RowId::Existing(id) => Some(id.as_str()),
        }
    }
}

// ==========================================
// PartRef - 依赖行指向的零件
// ==========================================
// New 持有规范化 SKU，执行器在事务内解析为新生成的 id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PartRef {
    Existing(String),
    New(String),
}

// ==========================================
// 各实体行
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRow {
    pub source: SourceRef,
    pub id: RowId,
    pub action: RowAction,
    pub acr_sku: Option<String>,
    pub part_type: Option<String>,
    pub position_type: Option<String>,
    pub abs_type: Option<String>,
    pub bolt_pattern: Option<String>,
    pub drive_type: Option<String>,
    pub specifications: Option<String>,
    pub workflow_status: Option<WorkflowStatus>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleApplicationRow {
    pub source: SourceRef,
    pub id: RowId,
    pub action: RowAction,
    pub acr_sku: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// 由 Parts 表品牌列拆分出的单条交叉引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceRow {
    pub source: SourceRef,
    pub column: String,              // 品牌列表头原文
    pub parent_id: RowId,            // 继承父零件的 id
    pub parent_sku: Option<String>,  // 父零件 SKU（原文）
    pub parent_action: RowAction,
    pub competitor_brand: String,    // 规范化品牌名
    pub competitor_sku: String,      // 原文（已去首尾空白）
    pub delete_marker: bool,         // [DELETE] 前缀
    pub repeated_in_cell: bool,      // 同一单元格内重复 (W11)
    pub space_delimited: bool,       // 单元格使用空格分隔 (W12)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRow {
    pub source: SourceRef,
    pub action: RowAction,
    pub alias: Option<String>,
    pub canonical_name: Option<String>,
    pub alias_type: Option<AliasType>,
}

// ==========================================
// 原始单元格诊断
// ==========================================
// 无法转换为强类型的行（非数字年份、未知动作值等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCellDiagnostic {
    pub code: IssueCode,
    pub source: SourceRef,
    pub column: String,
    pub raw: String,
    pub message: String,
}

/// 工作表布局（表头映射结果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub entity: EntityKind,
    pub sheet: String,
    pub missing_hidden: Vec<String>, // 缺失的隐藏列 (E1)
    pub brand_columns: Vec<String>,
}

// ==========================================
// ExtractedRows - 行提取器输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRows {
    pub parts: Vec<PartRow>,
    pub vehicle_applications: Vec<VehicleApplicationRow>,
    pub cross_references: Vec<CrossReferenceRow>,
    pub aliases: Vec<AliasRow>,
    pub diagnostics: Vec<RawCellDiagnostic>,
    pub layouts: Vec<SheetLayout>,
    pub missing_sheets: Vec<String>,
}

impl ExtractedRows {
    pub fn total_rows(&self) -> usize {
        self.parts.len() + self.vehicle_applications.len() + self.aliases.len()
    }
}
