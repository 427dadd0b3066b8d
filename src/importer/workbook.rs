// ==========================================
// 零件目录导入 - 工作簿读取
// ==========================================
// 支持: Excel (.xlsx)
// 输出: 按工作表组织的原始单元格文本网格（保留 1 起始行号）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::normalize::clean_cell;
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

// ==========================================
// 原始网格
// ==========================================

/// 单行原始单元格（列下标 = 工作表绝对列号，0 起始）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row_number: usize, // 1 起始
    pub cells: Vec<Option<String>>,
}

impl RawRow {
    pub fn cell(&self, col: usize) -> Option<&str> {
        self.cells.get(col).and_then(|c| c.as_deref())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<RawRow>,
}

impl RawSheet {
    /// 由文本网格构造（第 i 个元素为第 i+1 行；空串视为空单元格）
    pub fn from_rows<R, C>(name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| RawRow {
                row_number: idx + 1,
                cells: cells
                    .into_iter()
                    .map(|c| clean_cell(Some(c.as_ref())))
                    .collect(),
            })
            .collect();

        Self {
            name: name.to_string(),
            rows,
        }
    }

    pub fn row(&self, row_number: usize) -> Option<&RawRow> {
        self.rows.iter().find(|r| r.row_number == row_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawWorkbook {
    pub sheets: Vec<RawSheet>,
}

impl RawWorkbook {
    pub fn new(sheets: Vec<RawSheet>) -> Self {
        Self { sheets }
    }

    /// 按名称查找工作表（大小写与首尾空白不敏感）
    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        let wanted = name.trim().to_lowercase();
        self.sheets
            .iter()
            .find(|s| s.name.trim().to_lowercase() == wanted)
    }
}

// ==========================================
// WorkbookParser Trait
// ==========================================
pub trait WorkbookParser: Send + Sync {
    /// 从内存字节解析
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawWorkbook>;

    /// 从文件解析
    fn parse_file(&self, file_path: &Path) -> ImportResult<RawWorkbook> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        // 检查扩展名
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let bytes = std::fs::read(file_path)?;
        self.parse_bytes(&bytes)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelWorkbookParser;

impl WorkbookParser for ExcelWorkbookParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawWorkbook> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in sheet_names {
            let range = workbook.worksheet_range(&name)?;

            // Range 仅覆盖已用区域，按起点换算绝对行列号
            let (start_row, start_col) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));

            let rows: Vec<RawRow> = range
                .rows()
                .enumerate()
                .map(|(idx, cells)| {
                    let mut out = vec![None; start_col];
                    out.extend(cells.iter().map(cell_to_string));
                    RawRow {
                        row_number: start_row + idx + 1,
                        cells: out,
                    }
                })
                .collect();

            debug!(sheet = %name, rows = rows.len(), "工作表读取完成");
            sheets.push(RawSheet { name, rows });
        }

        Ok(RawWorkbook { sheets })
    }
}

/// 单元格转文本：整数值浮点去掉小数部分，空白视为 None
fn cell_to_string(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    };
    clean_cell(Some(&text))
}
