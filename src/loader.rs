// 📂 Loader - CSV / Excel files into tables
// Thin ingestion plumbing: headers are renamed by exact match, never guessed

use crate::config::AuditConfig;
use crate::error::ReferenceDataError;
use crate::reference::{ReferenceTables, COMBINATION_RULES, MATERIAL_MASTER, POSITION_MAP};
use crate::table::{CellValue, Table};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

// ============================================================================
// CSV
// ============================================================================

/// Read a CSV file with a header row. Blank rows are skipped, ragged rows padded.
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(&headers);

    for (idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", idx + 1))?;
        let row: Vec<CellValue> = record.iter().map(|v| CellValue::text(v.trim())).collect();

        if row.iter().all(|c| c.is_blank()) {
            continue;
        }
        table.push_row(row);
    }

    Ok(table)
}

// ============================================================================
// EXCEL
// ============================================================================

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.trim()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        other => CellValue::text(other.to_string().trim()),
    }
}

fn table_from_range(range: &Range<Data>) -> Table {
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect(),
        None => return Table::default(),
    };

    let mut table = Table::new(&headers);
    for data_row in rows {
        let row: Vec<CellValue> = data_row.iter().map(cell_value).collect();
        if row.iter().all(|c| c.is_blank()) {
            continue;
        }
        table.push_row(row);
    }

    table
}

/// Read one named sheet. `Ok(None)` when the workbook has no such sheet.
pub fn read_sheet(path: &Path, sheet: &str) -> Result<Option<Table>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;

    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Ok(None);
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| anyhow!("Failed to read sheet {}: {}", sheet, e))?;

    Ok(Some(table_from_range(&range)))
}

/// Read the first sheet of a workbook
pub fn read_first_sheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook has no sheets: {:?}", path))?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| anyhow!("Failed to read sheet {}: {}", first, e))?;

    Ok(table_from_range(&range))
}

// ============================================================================
// REFERENCE + INVENTORY
// ============================================================================

/// Read the three control sheets from the configured workbook and rename their headers
pub fn load_reference_tables(config: &AuditConfig) -> Result<ReferenceTables> {
    let path = config.control_workbook.as_path();
    let sheets = [
        (&config.sheets.material_master, MATERIAL_MASTER, &config.columns.material_master),
        (&config.sheets.combination_rules, COMBINATION_RULES, &config.columns.combination_rules),
        (&config.sheets.position_map, POSITION_MAP, &config.columns.position_map),
    ];

    let mut bundle = HashMap::new();
    for (sheet, canonical, renames) in sheets {
        let mut table = read_sheet(path, sheet)?.ok_or_else(|| ReferenceDataError::MissingTable {
            table: sheet.clone(),
        })?;
        table.rename_columns(renames);
        info!(sheet = %sheet, rows = table.row_count(), "control sheet read");
        bundle.insert(canonical.to_string(), table);
    }

    Ok(ReferenceTables::from_bundle(bundle)?)
}

/// Read an inventory extract (.csv, .xlsx, .xls) and rename its headers
pub fn load_inventory(path: &Path, config: &AuditConfig) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut table = match ext.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xls" => read_first_sheet(path)?,
        other => {
            return Err(anyhow!(
                "Unsupported inventory format: {:?} (expected .csv, .xlsx or .xls)",
                other
            ))
        }
    };

    table.rename_columns(&config.columns.inventory);
    info!(path = ?path, rows = table.row_count(), "inventory read");
    Ok(table)
}

// ============================================================================
// TESTS
// ============================================================================
