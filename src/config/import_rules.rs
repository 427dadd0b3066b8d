// ==========================================
// 零件目录导入 - 导入规则参数
// ==========================================
// 职责: 校验引擎使用的常量（SKU 前缀、年份边界、字段长度、竞品品牌列）
// 来源: ConfigManager 从 config_kv 读取，缺省时使用 Default
// ==========================================

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// 默认竞品品牌列（表头文本，大小写不敏感）
pub const DEFAULT_COMPETITOR_BRANDS: &[&str] = &[
    "NATIONAL", "ATV", "SYD", "TMK", "GROB", "RACE", "OEM", "OEM_2", "GMB", "GSP", "FAG",
];

/// 交叉引用删除标记
pub const DELETE_MARKER: &str = "[DELETE]";

// ==========================================
// FieldLimits - 字段最大存储长度（字符数）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    pub acr_sku: usize,
    pub part_type: usize,
    pub position_type: usize,
    pub abs_type: usize,
    pub bolt_pattern: usize,
    pub drive_type: usize,
    pub specifications: usize,
    pub image_url: usize,
    pub make: usize,
    pub model: usize,
    pub alias: usize,
    pub canonical_name: usize,
    pub competitor_sku: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            acr_sku: 50,
            part_type: 100,
            position_type: 50,
            abs_type: 50,
            bolt_pattern: 50,
            drive_type: 50,
            specifications: 1000,
            image_url: 500,
            make: 100,
            model: 100,
            alias: 100,
            canonical_name: 100,
            competitor_sku: 50,
        }
    }
}

impl FieldLimits {
    /// 按配置键名覆写单个上限；未知键返回 false
    pub fn set(&mut self, field: &str, value: usize) -> bool {
        let slot = match field {
            "acr_sku" => &mut self.acr_sku,
            "part_type" => &mut self.part_type,
            "position_type" => &mut self.position_type,
            "abs_type" => &mut self.abs_type,
            "bolt_pattern" => &mut self.bolt_pattern,
            "drive_type" => &mut self.drive_type,
            "specifications" => &mut self.specifications,
            "image_url" => &mut self.image_url,
            "make" => &mut self.make,
            "model" => &mut self.model,
            "alias" => &mut self.alias,
            "canonical_name" => &mut self.canonical_name,
            "competitor_sku" => &mut self.competitor_sku,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub const FIELD_NAMES: [&'static str; 13] = [
        "acr_sku",
        "part_type",
        "position_type",
        "abs_type",
        "bolt_pattern",
        "drive_type",
        "specifications",
        "image_url",
        "make",
        "model",
        "alias",
        "canonical_name",
        "competitor_sku",
    ];
}

// ==========================================
// ImportRules
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRules {
    pub sku_prefix: String,
    pub min_year: i32,
    pub max_year: i32,
    pub limits: FieldLimits,
    pub competitor_brands: Vec<String>, // 已规范化为大写
}

impl Default for ImportRules {
    fn default() -> Self {
        Self {
            sku_prefix: "ACR".to_string(),
            min_year: 1900,
            max_year: chrono::Local::now().year() + 2,
            limits: FieldLimits::default(),
            competitor_brands: DEFAULT_COMPETITOR_BRANDS
                .iter()
                .map(|b| b.to_string())
                .collect(),
        }
    }
}

impl ImportRules {
    /// 表头是否为竞品品牌列，返回规范化品牌名
    pub fn brand_for_header(&self, header: &str) -> Option<String> {
        let normalized = normalize_brand(header);
        self.competitor_brands
            .iter()
            .find(|b| **b == normalized)
            .cloned()
    }

    pub fn year_in_bounds(&self, year: i32) -> bool {
        year >= self.min_year && year <= self.max_year
    }
}

/// 品牌名规范化：大写，空格/连字符统一为下划线
pub fn normalize_brand(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_header_matching() {
        let rules = ImportRules::default();
        assert_eq!(rules.brand_for_header("National"), Some("NATIONAL".to_string()));
        assert_eq!(rules.brand_for_header(" oem 2 "), Some("OEM_2".to_string()));
        assert_eq!(rules.brand_for_header("Make"), None);
    }

    #[test]
    fn test_field_limit_override() {
        let mut limits = FieldLimits::default();
        assert!(limits.set("make", 20));
        assert_eq!(limits.make, 20);
        assert!(!limits.set("unknown_field", 1));
    }
}
