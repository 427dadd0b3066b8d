// ==========================================
// 零件目录导入 - 列定义表
// ==========================================
// 职责: 表头文本 → 字段 映射（含别名、隐藏列标记）
// 红线: 按表头文本映射，不依赖列位置；模板列顺序调整不影响数据
// ==========================================

use crate::config::import_rules::ImportRules;
use crate::domain::types::EntityKind;
use crate::importer::normalize::normalize_key;
use crate::importer::workbook::RawRow;
use std::collections::HashMap;

/// 表头所在行（第 1 行为分组表头，第 3 行为说明行）
pub const HEADER_ROW: usize = 2;
/// 数据起始行
pub const FIRST_DATA_ROW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Action,
    AcrSku,
    PartType,
    PositionType,
    AbsType,
    BoltPattern,
    DriveType,
    Specifications,
    Status,
    ImageUrl,
    Make,
    Model,
    StartYear,
    EndYear,
    Alias,
    CanonicalName,
    AliasType,
}

impl Field {
    /// 存储字段名（用于问题定位与长度上限配置）
    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Action => "action",
            Field::AcrSku => "acr_sku",
            Field::PartType => "part_type",
            Field::PositionType => "position_type",
            Field::AbsType => "abs_type",
            Field::BoltPattern => "bolt_pattern",
            Field::DriveType => "drive_type",
            Field::Specifications => "specifications",
            Field::Status => "workflow_status",
            Field::ImageUrl => "image_url",
            Field::Make => "make",
            Field::Model => "model",
            Field::StartYear => "start_year",
            Field::EndYear => "end_year",
            Field::Alias => "alias",
            Field::CanonicalName => "canonical_name",
            Field::AliasType => "alias_type",
        }
    }
}

/// 单列定义
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub field: Field,
    pub header: &'static str,
    pub aliases: &'static [&'static str],
    pub hidden: bool,
}

const fn col(field: Field, header: &'static str, aliases: &'static [&'static str]) -> ColumnDef {
    ColumnDef {
        field,
        header,
        aliases,
        hidden: false,
    }
}

const fn hidden(field: Field, header: &'static str, aliases: &'static [&'static str]) -> ColumnDef {
    ColumnDef {
        field,
        header,
        aliases,
        hidden: true,
    }
}

pub const PART_COLUMNS: &[ColumnDef] = &[
    hidden(Field::Id, "_id", &["_part_id"]),
    hidden(Field::Action, "_action", &["_accion"]),
    col(Field::AcrSku, "ACR SKU", &["SKU", "ACR_SKU"]),
    col(Field::PartType, "Part Type", &["Type", "Tipo"]),
    col(Field::PositionType, "Position", &["Position Type"]),
    col(Field::AbsType, "ABS Type", &["ABS"]),
    col(Field::BoltPattern, "Bolt Pattern", &[]),
    col(Field::DriveType, "Drive Type", &[]),
    col(Field::Specifications, "Specifications", &["Specs"]),
    col(Field::Status, "Status", &["Workflow Status"]),
    col(Field::ImageUrl, "Image URL", &["Image"]),
];

pub const APPLICATION_COLUMNS: &[ColumnDef] = &[
    hidden(Field::Id, "_id", &["_vehicle_application_id"]),
    hidden(Field::Action, "_action", &["_accion"]),
    col(Field::AcrSku, "ACR SKU", &["SKU", "ACR_SKU"]),
    col(Field::Make, "Make", &["Marca"]),
    col(Field::Model, "Model", &["Modelo"]),
    col(Field::StartYear, "Start Year", &["Year From", "Desde"]),
    col(Field::EndYear, "End Year", &["Year To", "Hasta"]),
];

pub const ALIAS_COLUMNS: &[ColumnDef] = &[
    hidden(Field::Action, "_action", &["_accion"]),
    col(Field::Alias, "Alias", &[]),
    col(Field::CanonicalName, "Canonical Name", &["Canonical"]),
    col(Field::AliasType, "Alias Type", &["Type"]),
];

pub fn columns_for(entity: EntityKind) -> &'static [ColumnDef] {
    match entity {
        EntityKind::Part | EntityKind::CrossReference => PART_COLUMNS,
        EntityKind::VehicleApplication => APPLICATION_COLUMNS,
        EntityKind::Alias => ALIAS_COLUMNS,
    }
}

/// 字段的标准表头文本
pub fn standard_header(entity: EntityKind, field: Field) -> &'static str {
    columns_for(entity)
        .iter()
        .find(|def| def.field == field)
        .map(|def| def.header)
        .unwrap_or_else(|| field.name())
}

/// 品牌列（Parts 表）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandColumn {
    pub index: usize,
    pub header: String, // 表头原文
    pub brand: String,  // 规范化品牌名
}

// ==========================================
// ColumnMap - 单个工作表的表头解析结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    indices: HashMap<Field, usize>,
    headers: HashMap<Field, String>,
    pub brand_columns: Vec<BrandColumn>,
    pub missing_hidden: Vec<String>,
}

impl ColumnMap {
    /// 解析表头行；header_row 为 None 时所有列视为缺失
    pub fn resolve(entity: EntityKind, header_row: Option<&RawRow>, rules: &ImportRules) -> Self {
        let defs = columns_for(entity);
        let mut map = ColumnMap::default();

        if let Some(row) = header_row {
            for (index, cell) in row.cells.iter().enumerate() {
                let Some(text) = cell.as_deref() else {
                    continue;
                };
                let key = normalize_key(text);

                let matched = defs.iter().find(|def| {
                    normalize_key(def.header) == key
                        || def.aliases.iter().any(|a| normalize_key(a) == key)
                });

                match matched {
                    // 同一字段重复出现时以第一列为准
                    Some(def) => {
                        if !map.indices.contains_key(&def.field) {
                            map.indices.insert(def.field, index);
                            map.headers.insert(def.field, text.to_string());
                        }
                    }
                    None if entity == EntityKind::Part => {
                        if let Some(brand) = rules.brand_for_header(text) {
                            map.brand_columns.push(BrandColumn {
                                index,
                                header: text.to_string(),
                                brand,
                            });
                        }
                    }
                    None => {}
                }
            }
        }

        map.missing_hidden = defs
            .iter()
            .filter(|def| def.hidden && !map.indices.contains_key(&def.field))
            .map(|def| def.header.to_string())
            .collect();

        map
    }

    pub fn has(&self, field: Field) -> bool {
        self.indices.contains_key(&field)
    }

    /// 读取字段单元格（已去空白，空值为 None）
    pub fn get<'r>(&self, row: &'r RawRow, field: Field) -> Option<&'r str> {
        self.indices.get(&field).and_then(|idx| row.cell(*idx))
    }

    /// 字段对应的表头文本（缺失时使用标准表头）
    pub fn header(&self, entity: EntityKind, field: Field) -> String {
        self.headers
            .get(&field)
            .cloned()
            .unwrap_or_else(|| standard_header(entity, field).to_string())
    }
}
