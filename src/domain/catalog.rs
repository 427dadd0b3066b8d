// ==========================================
// 零件目录导入 - 目录存储实体
// ==========================================
// 对齐: db.rs 中 parts / vehicle_applications / cross_references / vehicle_aliases 表
// 用途: 存储层读写、快照前像、回滚重放
// ==========================================

use crate::domain::types::{AliasType, WorkflowStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// Part - 零件主数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,                     // 代理主键（UUID）
    pub acr_sku: String,                // 自然键，全局唯一
    pub part_type: String,              // 零件类型
    pub position_type: Option<String>,  // 安装位置
    pub abs_type: Option<String>,       // ABS 类型
    pub bolt_pattern: Option<String>,   // 螺栓孔距
    pub drive_type: Option<String>,     // 驱动类型
    pub specifications: Option<String>, // 规格说明
    pub workflow_status: WorkflowStatus,
    pub image_url: Option<String>,      // 图片地址
}

// ==========================================
// VehicleApplication - 车型适配
// ==========================================
// 约束: start_year <= end_year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleApplication {
    pub id: String,
    pub part_id: String, // FK → parts.id
    pub make: String,
    pub model: String,
    pub start_year: i32,
    pub end_year: i32,
}

// ==========================================
// CrossReference - 竞品交叉引用
// ==========================================
// 身份: (part_id, competitor_brand, 规范化 competitor_sku)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub id: String,
    pub part_id: String, // FK → parts.id
    pub competitor_brand: String,
    pub competitor_sku: String,
}

// ==========================================
// VehicleAlias - 品牌/车型别名
// ==========================================
// 身份: (alias, alias_type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleAlias {
    pub alias: String,
    pub canonical_name: String,
    pub alias_type: AliasType,
}

// ==========================================
// CatalogState - 存储当前状态（只读视图）
// ==========================================
// 用途: 校验引擎与差异引擎的输入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogState {
    pub parts: Vec<Part>,
    pub vehicle_applications: Vec<VehicleApplication>,
    pub cross_references: Vec<CrossReference>,
    pub aliases: Vec<VehicleAlias>,
}

impl CatalogState {
    pub fn counts(&self) -> TableCounts {
        TableCounts {
            parts: self.parts.len(),
            vehicle_applications: self.vehicle_applications.len(),
            cross_references: self.cross_references.len(),
            aliases: self.aliases.len(),
        }
    }
}

/// 各表行数（原子性校验用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub parts: usize,
    pub vehicle_applications: usize,
    pub cross_references: usize,
    pub aliases: usize,
}
