// Warehouse Auditor - Core Library
// Storage-compliance audit of ERP inventory extracts against control tables

pub mod table;       // Column-typed tables handed over by ingestion
pub mod codes;       // Zero-padded code normalization
pub mod error;       // Load-time and per-record error types
pub mod zones;       // Zone Resolver - position ranges
pub mod reference;   // Reference Repository - control tables
pub mod compliance;  // Compliance Evaluator - statuses and verdicts
pub mod audit;       // Batch Auditor - annotated tables and tallies
pub mod loader;      // CSV / Excel ingestion
pub mod config;      // Audit configuration
pub mod logging;     // tracing setup

// Re-export commonly used types
pub use table::{CellValue, Column, Table};
pub use codes::{pad_code, CodeWidths};
pub use error::{AuditError, AuditResult, EvaluationError, InventoryError, ReferenceDataError};
pub use zones::{PositionValue, ZoneRange, ZoneResolver};
pub use reference::{CombinationRule, MaterialEntry, ReferenceRepository, ReferenceTables};
pub use compliance::{ComplianceEvaluator, InventoryRecord, Mode, Severity, Status, Verdict};
pub use audit::{
    audit_normative, audit_operational, records_from_table,
    AnnotatedTable, AuditReport, BatchAuditor, Tally,
};
pub use loader::{load_inventory, load_reference_tables, read_csv};
pub use config::{AuditConfig, ConfigManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load and validate reference data, then run both audits over the inventory.
/// Reference data is checked once, before any record is evaluated.
pub fn run_audit(
    reference: &ReferenceTables,
    inventory: &Table,
    config: &AuditConfig,
) -> AuditResult<(AnnotatedTable, AnnotatedTable)> {
    let repo = ReferenceRepository::load(reference, config.widths)?;
    let auditor = BatchAuditor::new().with_workers(config.workers);

    let normative = auditor.audit_normative(inventory, &repo)?;
    let operational = auditor.audit_operational(inventory, &repo)?;

    Ok((normative, operational))
}
