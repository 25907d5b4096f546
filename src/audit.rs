// 🧾 Batch Auditor - evaluate every inventory row, keep input order
// Annotated output = source columns + verdict columns, plus a status tally

use crate::compliance::{ComplianceEvaluator, InventoryRecord, Mode, Status, Verdict};
use crate::error::InventoryError;
use crate::reference::ReferenceRepository;
use crate::table::{CellValue, Table};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::thread;
use tracing::{debug, info, warn};

pub const COL_MATERIAL_CODE: &str = "material_code";
pub const COL_LOCATION: &str = "location";
pub const COL_DECLARED_WAREHOUSE_TYPE: &str = "declared_warehouse_type";

pub const COL_STATUS: &str = "status";
pub const COL_OBSERVATION: &str = "observation";
pub const COL_SUGGESTED_CORRECTION: &str = "suggested_correction";
pub const COL_WAREHOUSE_NAME: &str = "warehouse_name";

/// Columns the annotated output appends; an inventory may not already carry them
pub const APPENDED_COLUMNS: [&str; 4] = [
    COL_STATUS,
    COL_OBSERVATION,
    COL_SUGGESTED_CORRECTION,
    COL_WAREHOUSE_NAME,
];

/// Below this many records per worker, parallel evaluation is not worth a thread
const DEFAULT_MIN_CHUNK: usize = 512;

// ============================================================================
// INVENTORY EXTRACTION
// ============================================================================

/// Read canonical inventory columns out of a table, one record per row
pub fn records_from_table(table: &Table) -> Result<Vec<InventoryRecord>, InventoryError> {
    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| InventoryError::MissingColumn {
                column: name.to_string(),
            })
    };

    let material_idx = column(COL_MATERIAL_CODE)?;
    let location_idx = column(COL_LOCATION)?;
    let declared_idx = column(COL_DECLARED_WAREHOUSE_TYPE)?;

    if let Some(clash) = APPENDED_COLUMNS.iter().find(|c| table.has_column(c)) {
        return Err(InventoryError::ReservedColumn {
            column: clash.to_string(),
        });
    }

    let text = |row: usize, idx: usize| {
        table
            .cell(row, idx)
            .map(|c| c.as_text().trim().to_string())
            .unwrap_or_default()
    };

    Ok((0..table.row_count())
        .map(|row| InventoryRecord {
            row,
            material_code: text(row, material_idx),
            location: table
                .cell(row, location_idx)
                .cloned()
                .unwrap_or(CellValue::Empty),
            declared_warehouse_type: text(row, declared_idx),
        })
        .collect())
}

// ============================================================================
// TALLY
// ============================================================================

/// Status → count, in the order statuses first appear
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    entries: Vec<(Status, usize)>,
}

impl Tally {
    pub fn new() -> Self {
        Tally::default()
    }

    pub fn record(&mut self, status: Status) {
        self.add(status, 1);
    }

    fn add(&mut self, status: Status, count: usize) {
        match self.entries.iter_mut().find(|(s, _)| *s == status) {
            Some((_, n)) => *n += count,
            None => self.entries.push((status, count)),
        }
    }

    /// Fold a later partial tally into this one
    pub fn merge(&mut self, other: &Tally) {
        for (status, count) in &other.entries {
            self.add(*status, *count);
        }
    }

    pub fn count(&self, status: Status) -> usize {
        self.entries
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn entries(&self) -> &[(Status, usize)] {
        &self.entries
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(status, n)| format!("{} {}: {}", status.glyph(), status.code(), n))
            .collect();
        format!("{} records | {}", self.total(), parts.join(", "))
    }
}

// ============================================================================
// ANNOTATED TABLE
// ============================================================================

/// Source inventory plus one verdict per row, row-for-row
#[derive(Debug, Clone)]
pub struct AnnotatedTable {
    pub mode: Mode,
    pub source: Table,
    pub records: Vec<InventoryRecord>,
    pub verdicts: Vec<Verdict>,
    /// Resolved warehouse names, present only when the reference data carries names
    pub warehouse_names: Option<Vec<String>>,
    pub tally: Tally,
}

impl AnnotatedTable {
    pub fn row_count(&self) -> usize {
        self.verdicts.len()
    }

    /// Output column order. With warehouse names, the declared-type column moves to the end.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .source
            .column_names()
            .into_iter()
            .filter(|c| self.warehouse_names.is_none() || *c != COL_DECLARED_WAREHOUSE_TYPE)
            .map(|c| c.to_string())
            .collect();

        names.push(COL_STATUS.to_string());
        names.push(COL_OBSERVATION.to_string());
        names.push(COL_SUGGESTED_CORRECTION.to_string());

        if self.warehouse_names.is_some() {
            names.push(COL_WAREHOUSE_NAME.to_string());
            names.push(COL_DECLARED_WAREHOUSE_TYPE.to_string());
        }

        names
    }

    /// Rendered cells of one output row, matching `column_names`
    pub fn row(&self, row: usize) -> Vec<String> {
        let declared_idx = self.source.column_index(COL_DECLARED_WAREHOUSE_TYPE);
        let mut cells: Vec<String> = self
            .source
            .row(row)
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| self.warehouse_names.is_none() || Some(*idx) != declared_idx)
            .map(|(_, cell)| cell.as_text())
            .collect();

        if let Some(verdict) = self.verdicts.get(row) {
            cells.push(verdict.status.code().to_string());
            cells.push(verdict.observation.clone());
            cells.push(verdict.suggested_correction.clone());
        }

        if let Some(names) = &self.warehouse_names {
            cells.push(names.get(row).cloned().unwrap_or_default());
            let declared = declared_idx
                .and_then(|idx| self.source.cell(row, idx))
                .map(|c| c.as_text())
                .unwrap_or_default();
            cells.push(declared);
        }

        cells
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.column_names())
            .context("Failed to write CSV header")?;
        for row in 0..self.row_count() {
            wtr.write_record(self.row(row))
                .with_context(|| format!("Failed to write CSV row {}", row + 1))?;
        }
        wtr.flush().context("Failed to flush CSV output")?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create output file: {:?}", path))?;
        self.write_csv(file)
    }
}

// ============================================================================
// BATCH AUDITOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct BatchAuditor {
    workers: usize,
    min_chunk: usize,
}

impl Default for BatchAuditor {
    fn default() -> Self {
        BatchAuditor {
            workers: 1,
            min_chunk: DEFAULT_MIN_CHUNK,
        }
    }
}

impl BatchAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate on up to `workers` threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Minimum records per worker before splitting
    pub fn with_min_chunk(mut self, min_chunk: usize) -> Self {
        self.min_chunk = min_chunk.max(1);
        self
    }

    pub fn audit_normative(
        &self,
        inventory: &Table,
        repo: &ReferenceRepository,
    ) -> Result<AnnotatedTable, InventoryError> {
        self.audit(inventory, repo, Mode::Normative)
    }

    pub fn audit_operational(
        &self,
        inventory: &Table,
        repo: &ReferenceRepository,
    ) -> Result<AnnotatedTable, InventoryError> {
        self.audit(inventory, repo, Mode::Operational)
    }

    pub fn audit(
        &self,
        inventory: &Table,
        repo: &ReferenceRepository,
        mode: Mode,
    ) -> Result<AnnotatedTable, InventoryError> {
        let records = records_from_table(inventory)?;
        let (verdicts, tally) = self.evaluate_all(&records, repo, mode);

        let warehouse_names: Option<Vec<String>> = repo.has_warehouse_names().then(|| {
            records
                .iter()
                .map(|r| {
                    repo.warehouse_name(&r.declared_warehouse_type)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        });

        info!(mode = mode.name(), "audit finished: {}", tally.summary());

        Ok(AnnotatedTable {
            mode,
            source: inventory.clone(),
            records,
            verdicts,
            warehouse_names,
            tally,
        })
    }

    /// Verdicts in input order plus the merged tally
    pub fn evaluate_all(
        &self,
        records: &[InventoryRecord],
        repo: &ReferenceRepository,
        mode: Mode,
    ) -> (Vec<Verdict>, Tally) {
        let chunk_len = records.len().div_ceil(self.workers).max(self.min_chunk);

        if self.workers <= 1 || records.len() <= chunk_len {
            return evaluate_chunk(records, repo, mode);
        }

        debug!(
            records = records.len(),
            workers = self.workers,
            chunk_len,
            "evaluating in parallel"
        );

        thread::scope(|scope| {
            let handles: Vec<_> = records
                .chunks(chunk_len)
                .map(|chunk| scope.spawn(move || evaluate_chunk(chunk, repo, mode)))
                .collect();

            let mut verdicts = Vec::with_capacity(records.len());
            let mut tally = Tally::new();

            // Joined in spawn order, so chunks line back up with the input
            for handle in handles {
                match handle.join() {
                    Ok((chunk_verdicts, chunk_tally)) => {
                        verdicts.extend(chunk_verdicts);
                        tally.merge(&chunk_tally);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }

            (verdicts, tally)
        })
    }
}

fn evaluate_chunk(
    records: &[InventoryRecord],
    repo: &ReferenceRepository,
    mode: Mode,
) -> (Vec<Verdict>, Tally) {
    let evaluator = ComplianceEvaluator::new(repo);
    let mut tally = Tally::new();

    let verdicts = records
        .iter()
        .map(|record| {
            let verdict = match evaluator.evaluate(record, mode) {
                Ok(v) => v,
                Err(err) => {
                    warn!(row = record.row + 1, material = %record.material_code, "evaluation failed: {}", err);
                    Verdict::from_error(&err)
                }
            };
            debug!(row = record.row + 1, status = %verdict.status, "record evaluated");
            tally.record(verdict.status);
            verdict
        })
        .collect();

    (verdicts, tally)
}

/// Normative audit with default settings
pub fn audit_normative(inventory: &Table, repo: &ReferenceRepository) -> Result<AnnotatedTable, InventoryError> {
    BatchAuditor::default().audit_normative(inventory, repo)
}

/// Operational audit with default settings
pub fn audit_operational(inventory: &Table, repo: &ReferenceRepository) -> Result<AnnotatedTable, InventoryError> {
    BatchAuditor::default().audit_operational(inventory, repo)
}

// ============================================================================
// AUDIT REPORT (JSON export)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVerdict {
    pub row: usize,
    pub material_code: String,
    pub location: String,
    pub declared_warehouse_type: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeReport {
    pub mode: Mode,
    pub tally: Tally,
    pub records: Vec<RecordVerdict>,
}

impl From<&AnnotatedTable> for ModeReport {
    fn from(table: &AnnotatedTable) -> Self {
        ModeReport {
            mode: table.mode,
            tally: table.tally.clone(),
            records: table
                .records
                .iter()
                .zip(&table.verdicts)
                .map(|(r, v)| RecordVerdict {
                    row: r.row + 1,
                    material_code: r.material_code.clone(),
                    location: r.location.as_text(),
                    declared_warehouse_type: r.declared_warehouse_type.clone(),
                    verdict: v.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: String,
    pub audited_at: DateTime<Utc>,
    pub inventory_rows: usize,
    pub results: Vec<ModeReport>,
}

impl AuditReport {
    pub fn new(tables: &[&AnnotatedTable]) -> Self {
        AuditReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            audited_at: Utc::now(),
            inventory_rows: tables.first().map(|t| t.row_count()).unwrap_or(0),
            results: tables.iter().map(|t| ModeReport::from(*t)).collect(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize audit report")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write audit report: {:?}", path))?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_keeps_first_appearance_order() {
        let mut tally = Tally::new();
        tally.record(Status::OutOfBounds);
        tally.record(Status::Compliant);
        tally.record(Status::OutOfBounds);

        assert_eq!(
            tally.entries(),
            &[(Status::OutOfBounds, 2), (Status::Compliant, 1)]
        );
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.count(Status::MaterialNotFound), 0);
    }

    #[test]
    fn test_tally_merge_adds_per_status() {
        let mut first = Tally::new();
        first.record(Status::Compliant);

        let mut second = Tally::new();
        second.record(Status::MaterialNotFound);
        second.record(Status::Compliant);

        first.merge(&second);

        assert_eq!(
            first.entries(),
            &[(Status::Compliant, 2), (Status::MaterialNotFound, 1)]
        );
    }

    #[test]
    fn test_records_from_table_requires_columns() {
        let table = Table::new(&[COL_MATERIAL_CODE, COL_LOCATION]);
        let err = records_from_table(&table).unwrap_err();

        assert_eq!(
            err,
            InventoryError::MissingColumn {
                column: COL_DECLARED_WAREHOUSE_TYPE.to_string()
            }
        );
    }

    #[test]
    fn test_records_from_table_rejects_appended_column_names() {
        for reserved in APPENDED_COLUMNS {
            let table = Table::new(&[COL_MATERIAL_CODE, COL_LOCATION, COL_DECLARED_WAREHOUSE_TYPE, reserved]);
            let err = records_from_table(&table).unwrap_err();

            assert_eq!(
                err,
                InventoryError::ReservedColumn {
                    column: reserved.to_string()
                }
            );
        }
    }

    #[test]
    fn test_records_from_table_trims_codes() {
        let mut table = Table::new(&[COL_MATERIAL_CODE, COL_LOCATION, COL_DECLARED_WAREHOUSE_TYPE]);
        table.push_row(vec![" 1000 ".into(), CellValue::Number(150.0), "1".into()]);

        let records = records_from_table(&table).unwrap();

        assert_eq!(records[0].material_code, "1000");
        assert_eq!(records[0].location, CellValue::Number(150.0));
        assert_eq!(records[0].declared_warehouse_type, "1");
    }
}
