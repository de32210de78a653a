// ==========================================
// 管道材料导入系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: Excel (.xlsx/.xls，取第一个工作表) / CSV (.csv)
// 输出: 表头 + 数据行（保留原始行号，完全空白行丢弃）
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::takeoff_importer_trait::FileParser;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

// ==========================================
// TabularData - 解析后的表格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularData {
    pub headers: Vec<String>,
    pub rows: Vec<TabularRow>,
    pub byte_len: usize, // 源文件字节数
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularRow {
    pub row_number: usize, // 1 起始，不含表头
    pub values: Vec<String>,
}

impl TabularData {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn check_exists(path: &Path) -> ImporterResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn file_len(path: &Path) -> ImporterResult<usize> {
    Ok(std::fs::metadata(path)?.len() as usize)
}

/// 收集一行：TRIM 每个单元格，完全空白返回 None
fn collect_row(row_number: usize, cells: impl Iterator<Item = String>) -> Option<TabularRow> {
    let values: Vec<String> = cells.map(|c| c.trim().to_string()).collect();
    if values.iter().all(|v| v.is_empty()) {
        return None;
    }
    Some(TabularRow { row_number, values })
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImporterResult<TabularData> {
        check_exists(file_path)?;

        // 无扩展名的临时文件按 CSV 处理
        let ext = extension_of(file_path);
        if !ext.is_empty() && ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            if let Some(row) = collect_row(idx + 1, record.iter().map(str::to_string)) {
                rows.push(row);
            }
        }

        Ok(TabularData {
            headers,
            rows,
            byte_len: file_len(file_path)?,
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImporterResult<TabularData> {
        check_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无表头行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let rows = sheet_rows
            .enumerate()
            .filter_map(|(idx, cells)| collect_row(idx + 1, cells.iter().map(|c| c.to_string())))
            .collect();

        Ok(TabularData {
            headers,
            rows,
            byte_len: file_len(file_path)?,
        })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path) -> ImporterResult<TabularData> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse(file_path),
            "xlsx" | "xls" => ExcelParser.parse(file_path),
            other => {
                check_exists(file_path)?;
                Err(ImportError::UnsupportedFormat(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "Drawing,Type,QTY,Cmdty Code").unwrap();
        writeln!(temp_file, "P-001,valve,2,V100").unwrap();
        writeln!(temp_file, " P-002 ,pipe,10,PIPE-A").unwrap();

        let data = CsvParser.parse(temp_file.path()).unwrap();

        assert_eq!(data.headers, vec!["Drawing", "Type", "QTY", "Cmdty Code"]);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.rows[1].values[0], "P-002");
        assert_eq!(data.rows[1].row_number, 2);
        assert!(data.byte_len > 0);
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows_keeps_numbering() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "Drawing,QTY").unwrap();
        writeln!(temp_file, "P-001,1").unwrap();
        writeln!(temp_file, ",").unwrap();
        writeln!(temp_file, "P-003,3").unwrap();

        let data = CsvParser.parse(temp_file.path()).unwrap();

        assert_eq!(data.row_count(), 2);
        assert_eq!(data.rows[1].row_number, 3);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }
}
