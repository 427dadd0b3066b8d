// ==========================================
// 零件目录导入 - 存储索引（只读）
// ==========================================
// 职责: 对当前存储状态建立按代理主键 / 自然键 / 组合键的查找表
// 用途: 校验引擎（外键、重复检查）与差异引擎共用
// ==========================================

use crate::domain::catalog::{CatalogState, CrossReference, Part, VehicleAlias, VehicleApplication};
use crate::domain::rows::{PartRow, RowId};
use crate::domain::types::AliasType;
use crate::importer::normalize::{normalize_key, normalize_sku};
use std::collections::{HashMap, HashSet};

/// 车型适配组合键（part_id, make, model, start_year, end_year）
pub type ApplicationKey = (String, String, String, i32, i32);
/// 交叉引用组合键（part_id, brand, 规范化 sku）
pub type CrossReferenceKey = (String, String, String);

pub fn application_key(part_id: &str, make: &str, model: &str, start: i32, end: i32) -> ApplicationKey {
    (part_id.to_string(), normalize_key(make), normalize_key(model), start, end)
}

pub fn cross_reference_key(part_id: &str, brand: &str, sku: &str) -> CrossReferenceKey {
    (part_id.to_string(), brand.to_string(), normalize_sku(sku))
}

pub fn alias_key(alias: &str, alias_type: AliasType) -> (String, AliasType) {
    (normalize_key(alias), alias_type)
}

pub struct StoreIndex<'a> {
    parts_by_id: HashMap<&'a str, &'a Part>,
    parts_by_sku: HashMap<String, &'a Part>,
    applications_by_id: HashMap<&'a str, &'a VehicleApplication>,
    applications_by_key: HashMap<ApplicationKey, &'a VehicleApplication>,
    applications_by_part: HashMap<&'a str, Vec<&'a VehicleApplication>>,
    cross_refs_by_key: HashMap<CrossReferenceKey, &'a CrossReference>,
    cross_refs_by_part: HashMap<&'a str, Vec<&'a CrossReference>>,
    aliases_by_key: HashMap<(String, AliasType), &'a VehicleAlias>,
}

impl<'a> StoreIndex<'a> {
    pub fn build(state: &'a CatalogState) -> Self {
        let mut index = StoreIndex {
            parts_by_id: HashMap::new(),
            parts_by_sku: HashMap::new(),
            applications_by_id: HashMap::new(),
            applications_by_key: HashMap::new(),
            applications_by_part: HashMap::new(),
            cross_refs_by_key: HashMap::new(),
            cross_refs_by_part: HashMap::new(),
            aliases_by_key: HashMap::new(),
        };

        for part in &state.parts {
            index.parts_by_id.insert(part.id.as_str(), part);
            index.parts_by_sku.insert(normalize_sku(&part.acr_sku), part);
        }

        for va in &state.vehicle_applications {
            index.applications_by_id.insert(va.id.as_str(), va);
            index.applications_by_key.insert(
                application_key(&va.part_id, &va.make, &va.model, va.start_year, va.end_year),
                va,
            );
            index
                .applications_by_part
                .entry(va.part_id.as_str())
                .or_default()
                .push(va);
        }

        for cr in &state.cross_references {
            index.cross_refs_by_key.insert(
                cross_reference_key(&cr.part_id, &cr.competitor_brand, &cr.competitor_sku),
                cr,
            );
            index
                .cross_refs_by_part
                .entry(cr.part_id.as_str())
                .or_default()
                .push(cr);
        }

        for alias in &state.aliases {
            index
                .aliases_by_key
                .insert(alias_key(&alias.alias, alias.alias_type), alias);
        }

        index
    }

    // ===== 零件 =====

    pub fn part_by_id(&self, id: &str) -> Option<&'a Part> {
        self.parts_by_id.get(id).copied()
    }

    pub fn part_by_sku(&self, sku: &str) -> Option<&'a Part> {
        self.parts_by_sku.get(&normalize_sku(sku)).copied()
    }

    /// Parts 表全部行 → 存储零件（按行号）
    ///
    /// # 规则
    /// - 带 id：仅按 id 匹配（id 不存在时不出现在结果中，由校验报 E9）
    /// - 无 id：按规范化 SKU 自然键匹配；已被带 id 行认领的零件不参与匹配
    pub fn match_part_rows(&self, rows: &[PartRow]) -> HashMap<usize, &'a Part> {
        let claimed: HashSet<&str> = rows.iter().filter_map(|r| r.id.existing()).collect();

        rows.iter()
            .filter_map(|row| {
                let stored = match &row.id {
                    RowId::Existing(id) => self.part_by_id(id),
                    RowId::New => row
                        .acr_sku
                        .as_deref()
                        .and_then(|sku| self.part_by_sku(sku))
                        .filter(|p| !claimed.contains(p.id.as_str())),
                }?;
                Some((row.source.row, stored))
            })
            .collect()
    }

    // ===== 车型适配 =====

    pub fn application_by_id(&self, id: &str) -> Option<&'a VehicleApplication> {
        self.applications_by_id.get(id).copied()
    }

    pub fn application_by_key(&self, key: &ApplicationKey) -> Option<&'a VehicleApplication> {
        self.applications_by_key.get(key).copied()
    }

    pub fn applications_of(&self, part_id: &str) -> &[&'a VehicleApplication] {
        self.applications_by_part
            .get(part_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ===== 交叉引用 =====

    pub fn cross_reference_by_key(&self, key: &CrossReferenceKey) -> Option<&'a CrossReference> {
        self.cross_refs_by_key.get(key).copied()
    }

    pub fn cross_references_of(&self, part_id: &str) -> &[&'a CrossReference] {
        self.cross_refs_by_part
            .get(part_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ===== 别名 =====

    pub fn alias(&self, alias: &str, alias_type: AliasType) -> Option<&'a VehicleAlias> {
        self.aliases_by_key.get(&alias_key(alias, alias_type)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rows::SourceRef;
    use crate::domain::types::{RowAction, WorkflowStatus};

    const PART_ID: &str = "3c1f0e2d-4b5a-4c6d-9e8f-7a6b5c4d3e2f";

    fn state() -> CatalogState {
        CatalogState {
            parts: vec![Part {
                id: PART_ID.to_string(),
                acr_sku: "ACR-100".to_string(),
                part_type: "Rotor".to_string(),
                position_type: None,
                abs_type: None,
                bolt_pattern: None,
                drive_type: None,
                specifications: None,
                workflow_status: WorkflowStatus::Active,
                image_url: None,
            }],
            ..Default::default()
        }
    }

    fn row(row: usize, id: Option<&str>, sku: &str) -> PartRow {
        PartRow {
            source: SourceRef::new("Parts", row),
            id: RowId::from_cell(id),
            action: RowAction::Keep,
            acr_sku: Some(sku.to_string()),
            part_type: Some("Rotor".to_string()),
            position_type: None,
            abs_type: None,
            bolt_pattern: None,
            drive_type: None,
            specifications: None,
            workflow_status: None,
            image_url: None,
        }
    }

    #[test]
    fn test_natural_key_matches_unclaimed_part() {
        let state = state();
        let index = StoreIndex::build(&state);
        let matches = index.match_part_rows(&[row(4, None, "acr 100")]);
        assert_eq!(matches.get(&4).map(|p| p.id.as_str()), Some(PART_ID));
    }

    #[test]
    fn test_part_claimed_by_id_row_is_not_matched_by_sku() {
        let state = state();
        let index = StoreIndex::build(&state);
        // 第 5 行用旧 SKU，但该零件已由第 4 行按 id 改名认领
        let matches = index.match_part_rows(&[row(5, None, "ACR-100"), row(4, Some(PART_ID), "ACR-101")]);
        assert_eq!(matches.get(&4).map(|p| p.id.as_str()), Some(PART_ID));
        assert!(matches.get(&5).is_none());
    }
}
