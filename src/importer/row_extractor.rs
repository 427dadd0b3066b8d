// ==========================================
// 零件目录导入 - 行提取器
// ==========================================
// 职责: 原始网格 → 强类型行（Part / VehicleApplication / CrossReference / Alias）
// 红线: 下游组件只处理强类型值；无法转换的行进入诊断列表，不做猜测
// ==========================================

use crate::config::import_rules::ImportRules;
use crate::domain::issue::IssueCode;
use crate::domain::rows::{
    AliasRow, CrossReferenceRow, ExtractedRows, PartRow, RawCellDiagnostic, RowId, SheetLayout,
    SourceRef, VehicleApplicationRow,
};
use crate::domain::types::{AliasType, EntityKind, RowAction, WorkflowStatus};
use crate::importer::columns::{ColumnMap, Field, FIRST_DATA_ROW, HEADER_ROW};
use crate::importer::cross_ref::explode_cell;
use crate::importer::normalize::clean_cell;
use crate::importer::workbook::{RawRow, RawWorkbook};
use tracing::{debug, info, instrument};

pub struct RowExtractor<'a> {
    rules: &'a ImportRules,
}

/// 单行提取上下文（收集本行诊断）
struct RowScope<'m> {
    entity: EntityKind,
    map: &'m ColumnMap,
    source: SourceRef,
    diagnostics: Vec<RawCellDiagnostic>,
}

impl<'m> RowScope<'m> {
    fn new(entity: EntityKind, map: &'m ColumnMap, row: &RawRow) -> Self {
        Self {
            entity,
            map,
            source: SourceRef::new(entity.sheet_name(), row.row_number),
            diagnostics: Vec::new(),
        }
    }

    fn text(&self, row: &RawRow, field: Field) -> Option<String> {
        clean_cell(self.map.get(row, field))
    }

    fn reject(&mut self, code: IssueCode, field: Field, raw: &str, message: String) {
        self.diagnostics.push(RawCellDiagnostic {
            code,
            source: self.source.clone(),
            column: self.map.header(self.entity, field),
            raw: raw.to_string(),
            message,
        });
    }

    fn action(&mut self, row: &RawRow) -> RowAction {
        let raw = self.map.get(row, Field::Action);
        match RowAction::parse(raw) {
            Some(action) => action,
            None => {
                let raw = raw.unwrap_or_default().to_string();
                self.reject(
                    IssueCode::UnknownRowAction,
                    Field::Action,
                    &raw,
                    format!(
                        "无法识别的行动作 '{}'（可选: {} / {}）",
                        raw,
                        RowAction::KEEP_LABEL,
                        RowAction::DELETE_LABEL
                    ),
                );
                RowAction::Keep
            }
        }
    }

    fn year(&mut self, row: &RawRow, field: Field) -> Option<i32> {
        let raw = self.text(row, field)?;
        match parse_year(&raw) {
            Some(year) => Some(year),
            None => {
                self.reject(
                    IssueCode::InvalidNumber,
                    field,
                    &raw,
                    format!("{} 不是有效整数: '{}'", field.name(), raw),
                );
                None
            }
        }
    }

    fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// 年份解析：接受 "2015" 与 "2015.0"
fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(v) = raw.parse::<i32>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => Some(f as i32),
        _ => None,
    }
}

impl<'a> RowExtractor<'a> {
    pub fn new(rules: &'a ImportRules) -> Self {
        Self { rules }
    }

    /// 提取全部工作表
    #[instrument(skip_all)]
    pub fn extract(&self, workbook: &RawWorkbook) -> ExtractedRows {
        let mut out = ExtractedRows::default();

        for entity in [EntityKind::Part, EntityKind::VehicleApplication, EntityKind::Alias] {
            let sheet_name = entity.sheet_name();
            let Some(sheet) = workbook.sheet(sheet_name) else {
                // 仅 Parts 表为必需
                if entity == EntityKind::Part {
                    out.missing_sheets.push(sheet_name.to_string());
                }
                continue;
            };

            let map = ColumnMap::resolve(entity, sheet.row(HEADER_ROW), self.rules);
            out.layouts.push(SheetLayout {
                entity,
                sheet: sheet_name.to_string(),
                missing_hidden: map.missing_hidden.clone(),
                brand_columns: map.brand_columns.iter().map(|b| b.header.clone()).collect(),
            });

            for row in sheet
                .rows
                .iter()
                .filter(|r| r.row_number >= FIRST_DATA_ROW && !r.is_blank())
            {
                match entity {
                    EntityKind::Part => self.extract_part(&map, row, &mut out),
                    EntityKind::VehicleApplication => self.extract_application(&map, row, &mut out),
                    EntityKind::Alias => self.extract_alias(&map, row, &mut out),
                    EntityKind::CrossReference => {}
                }
            }
        }

        info!(
            parts = out.parts.len(),
            vehicle_applications = out.vehicle_applications.len(),
            cross_references = out.cross_references.len(),
            aliases = out.aliases.len(),
            diagnostics = out.diagnostics.len(),
            "行提取完成"
        );
        out
    }

    fn extract_part(&self, map: &ColumnMap, row: &RawRow, out: &mut ExtractedRows) {
        let mut scope = RowScope::new(EntityKind::Part, map, row);
        let action = scope.action(row);

        let workflow_status = match scope.text(row, Field::Status) {
            None => None,
            Some(raw) => match WorkflowStatus::parse(&raw) {
                Some(status) => Some(status),
                None => {
                    scope.reject(
                        IssueCode::InvalidEnumValue,
                        Field::Status,
                        &raw,
                        format!("无效的状态值 '{}'（可选: ACTIVE / INACTIVE / DELETE）", raw),
                    );
                    None
                }
            },
        };

        if !scope.is_clean() {
            debug!(row = row.row_number, "零件行无法转换，跳过");
            out.diagnostics.extend(scope.diagnostics);
            return;
        }

        let part = PartRow {
            source: scope.source.clone(),
            id: RowId::from_cell(map.get(row, Field::Id)),
            action,
            acr_sku: scope.text(row, Field::AcrSku),
            part_type: scope.text(row, Field::PartType),
            position_type: scope.text(row, Field::PositionType),
            abs_type: scope.text(row, Field::AbsType),
            bolt_pattern: scope.text(row, Field::BoltPattern),
            drive_type: scope.text(row, Field::DriveType),
            specifications: scope.text(row, Field::Specifications),
            workflow_status,
            image_url: scope.text(row, Field::ImageUrl),
        };

        // 品牌列拆分为交叉引用，继承父零件身份
        for brand in &map.brand_columns {
            let Some(cell) = row.cell(brand.index) else {
                continue;
            };
            for competitor in explode_cell(cell) {
                out.cross_references.push(CrossReferenceRow {
                    source: part.source.clone(),
                    column: brand.header.clone(),
                    parent_id: part.id.clone(),
                    parent_sku: part.acr_sku.clone(),
                    parent_action: part.action,
                    competitor_brand: brand.brand.clone(),
                    competitor_sku: competitor.sku,
                    delete_marker: competitor.delete_marker,
                    repeated_in_cell: competitor.repeated_in_cell,
                    space_delimited: competitor.space_delimited,
                });
            }
        }

        out.parts.push(part);
    }

    fn extract_application(&self, map: &ColumnMap, row: &RawRow, out: &mut ExtractedRows) {
        let mut scope = RowScope::new(EntityKind::VehicleApplication, map, row);
        let action = scope.action(row);
        let start_year = scope.year(row, Field::StartYear);
        let end_year = scope.year(row, Field::EndYear);

        if !scope.is_clean() {
            debug!(row = row.row_number, "车型适配行无法转换，跳过");
            out.diagnostics.extend(scope.diagnostics);
            return;
        }

        out.vehicle_applications.push(VehicleApplicationRow {
            source: scope.source.clone(),
            id: RowId::from_cell(map.get(row, Field::Id)),
            action,
            acr_sku: scope.text(row, Field::AcrSku),
            make: scope.text(row, Field::Make),
            model: scope.text(row, Field::Model),
            start_year,
            end_year,
        });
    }

    fn extract_alias(&self, map: &ColumnMap, row: &RawRow, out: &mut ExtractedRows) {
        let mut scope = RowScope::new(EntityKind::Alias, map, row);
        let action = scope.action(row);

        let alias_type = match scope.text(row, Field::AliasType) {
            None => None,
            Some(raw) => match AliasType::parse(&raw) {
                Some(t) => Some(t),
                None => {
                    scope.reject(
                        IssueCode::InvalidEnumValue,
                        Field::AliasType,
                        &raw,
                        format!("无效的别名类型 '{}'（可选: make / model）", raw),
                    );
                    None
                }
            },
        };

        if !scope.is_clean() {
            out.diagnostics.extend(scope.diagnostics);
            return;
        }

        out.aliases.push(AliasRow {
            source: scope.source.clone(),
            action,
            alias: scope.text(row, Field::Alias),
            canonical_name: scope.text(row, Field::CanonicalName),
            alias_type,
        });
    }
}
