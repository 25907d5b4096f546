// ⛔ Audit error types
// Load-time failures are fatal; evaluation failures stay with their record

use thiserror::Error;

/// Reference data could not be loaded. Aborts the audit before any record is evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceDataError {
    #[error("reference table missing: {table}")]
    MissingTable { table: String },

    #[error("reference table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    #[error("reference table {table}, row {row}: column {column} is blank")]
    BlankCode {
        table: String,
        column: String,
        row: usize,
    },

    #[error("reference table {table}, row {row}: {column} value {value:?} is wider than {width} characters")]
    CodeTooWide {
        table: String,
        column: String,
        row: usize,
        value: String,
        width: usize,
    },
}

/// A single record could not be evaluated because of a malformed reference row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("combination rule row {row} ({warehouse_type} + {classification_code}) has a malformed zone list: {raw:?}")]
    MalformedZoneList {
        warehouse_type: String,
        classification_code: String,
        row: usize,
        raw: String,
    },
}

/// The inventory table does not carry the canonical columns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryError {
    #[error("inventory table is missing required column {column}")]
    MissingColumn { column: String },

    #[error("inventory table already has a column named {column}, which the audit appends")]
    ReservedColumn { column: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error(transparent)]
    ReferenceData(#[from] ReferenceDataError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
