// ==========================================
// 零件目录导入 - 模板导出（网格）
// ==========================================
// 职责: 当前目录状态 → 与导入同构的三表网格（3 行表头 + 数据）
// 用途: 导出后立即重新导入应得到零变更
// 说明: 单元格样式与 xlsx 写出不在此处
// ==========================================

use crate::config::ImportRules;
use crate::domain::catalog::CatalogState;
use crate::domain::types::{EntityKind, RowAction};
use crate::importer::columns::{columns_for, ColumnDef, Field};
use crate::importer::workbook::{RawSheet, RawWorkbook};
use std::collections::BTreeMap;

const GROUP_HEADER: &str = "Catalog";
const INSTRUCTION: &str = "Do not edit hidden columns";

/// 导出当前状态
pub fn export_workbook(state: &CatalogState, rules: &ImportRules) -> RawWorkbook {
    RawWorkbook::new(vec![
        export_parts(state, rules),
        export_applications(state),
        export_aliases(state),
    ])
}

fn header_rows(defs: &[ColumnDef], extra: &[String]) -> Vec<Vec<String>> {
    let width = defs.len() + extra.len();
    let mut group = vec![String::new(); width];
    if let Some(first) = group.first_mut() {
        *first = GROUP_HEADER.to_string();
    }
    let headers = defs
        .iter()
        .map(|d| d.header.to_string())
        .chain(extra.iter().cloned())
        .collect();
    let mut instruction = vec![String::new(); width];
    if let Some(first) = instruction.first_mut() {
        *first = INSTRUCTION.to_string();
    }
    vec![group, headers, instruction]
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn export_parts(state: &CatalogState, rules: &ImportRules) -> RawSheet {
    let defs = columns_for(EntityKind::Part);
    let mut rows = header_rows(defs, &rules.competitor_brands);

    // part_id → brand → 竞品 SKU 列表
    let mut refs: BTreeMap<&str, BTreeMap<&str, Vec<&str>>> = BTreeMap::new();
    for cr in &state.cross_references {
        refs.entry(cr.part_id.as_str())
            .or_default()
            .entry(cr.competitor_brand.as_str())
            .or_default()
            .push(cr.competitor_sku.as_str());
    }

    for part in &state.parts {
        let mut cells: Vec<String> = defs
            .iter()
            .map(|def| match def.field {
                Field::Id => part.id.clone(),
                Field::Action => RowAction::KEEP_LABEL.to_string(),
                Field::AcrSku => part.acr_sku.clone(),
                Field::PartType => part.part_type.clone(),
                Field::PositionType => opt(&part.position_type),
                Field::AbsType => opt(&part.abs_type),
                Field::BoltPattern => opt(&part.bolt_pattern),
                Field::DriveType => opt(&part.drive_type),
                Field::Specifications => opt(&part.specifications),
                Field::Status => part.workflow_status.as_str().to_string(),
                Field::ImageUrl => opt(&part.image_url),
                _ => String::new(),
            })
            .collect();

        let by_brand = refs.get(part.id.as_str());
        for brand in &rules.competitor_brands {
            let joined = by_brand
                .and_then(|m| m.get(brand.as_str()))
                .map(|skus| join_competitor_skus(skus))
                .unwrap_or_default();
            cells.push(joined);
        }
        rows.push(cells);
    }

    RawSheet::from_rows(EntityKind::Part.sheet_name(), rows)
}

/// 单个含空白的 SKU 以 ';' 结尾，重新导入时不会被按空白拆分
fn join_competitor_skus(skus: &[&str]) -> String {
    let joined = skus.join(";");
    if skus.len() == 1 && joined.contains(char::is_whitespace) {
        format!("{};", joined)
    } else {
        joined
    }
}

fn export_applications(state: &CatalogState) -> RawSheet {
    let defs = columns_for(EntityKind::VehicleApplication);
    let mut rows = header_rows(defs, &[]);

    for va in &state.vehicle_applications {
        let sku = state
            .parts
            .iter()
            .find(|p| p.id == va.part_id)
            .map(|p| p.acr_sku.clone())
            .unwrap_or_default();
        rows.push(
            defs.iter()
                .map(|def| match def.field {
                    Field::Id => va.id.clone(),
                    Field::Action => RowAction::KEEP_LABEL.to_string(),
                    Field::AcrSku => sku.clone(),
                    Field::Make => va.make.clone(),
                    Field::Model => va.model.clone(),
                    Field::StartYear => va.start_year.to_string(),
                    Field::EndYear => va.end_year.to_string(),
                    _ => String::new(),
                })
                .collect(),
        );
    }

    RawSheet::from_rows(EntityKind::VehicleApplication.sheet_name(), rows)
}

fn export_aliases(state: &CatalogState) -> RawSheet {
    let defs = columns_for(EntityKind::Alias);
    let mut rows = header_rows(defs, &[]);

    for alias in &state.aliases {
        rows.push(
            defs.iter()
                .map(|def| match def.field {
                    Field::Action => RowAction::KEEP_LABEL.to_string(),
                    Field::Alias => alias.alias.clone(),
                    Field::CanonicalName => alias.canonical_name.clone(),
                    Field::AliasType => alias.alias_type.as_str().to_string(),
                    _ => String::new(),
                })
                .collect(),
        );
    }

    RawSheet::from_rows(EntityKind::Alias.sheet_name(), rows)
}
