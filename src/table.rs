// 📋 Tables - rectangular, column-typed data handed over by ingestion
// Reference sheets and inventory extracts both arrive in this shape

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single cell. Spreadsheets hand us numbers, CSV hands us text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// Build a text cell; whitespace-only input becomes `Empty`
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Empty => true,
        }
    }

    /// Text form used for code lookups and string ordering.
    /// Integral numbers render without a fractional part ("150", not "150.0").
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Empty => String::new(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

/// Column-major table. Every column has the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Table {
            columns: headers
                .iter()
                .map(|h| Column {
                    name: h.as_ref().trim().to_string(),
                    values: Vec::new(),
                })
                .collect(),
            row_count: 0,
        }
    }

    /// Append a row. Short rows are padded with empty cells, extra cells are dropped.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        self.row_count += 1;
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Cell at (row, column index)
    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.columns.get(column).and_then(|c| c.values.get(row))
    }

    /// All cells of one row in column order
    pub fn row(&self, row: usize) -> Vec<CellValue> {
        self.columns
            .iter()
            .map(|c| c.values.get(row).cloned().unwrap_or(CellValue::Empty))
            .collect()
    }

    /// Rename columns by exact (trimmed) header match. Unknown headers are left alone.
    pub fn rename_columns(&mut self, renames: &BTreeMap<String, String>) {
        for column in &mut self.columns {
            if let Some(canonical) = renames.get(column.name.trim()) {
                column.name = canonical.clone();
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_pads_and_truncates() {
        let mut table = Table::new(&["a", "b", "c"]);
        table.push_row(vec!["1".into()]);
        table.push_row(vec!["1".into(), "2".into(), "3".into(), "4".into()]);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 2), Some(&CellValue::Empty));
        assert_eq!(table.row(1).len(), 3);
    }

    #[test]
    fn test_number_text_form() {
        assert_eq!(CellValue::Number(150.0).as_text(), "150");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
        assert_eq!(CellValue::text("  ").as_text(), "");
        assert!(CellValue::text("   ").is_blank());
    }

    #[test]
    fn test_rename_columns_exact_match() {
        let mut table = Table::new(&["MATERIAL", "Ubicacion "]);
        let mut renames = BTreeMap::new();
        renames.insert("MATERIAL".to_string(), "material_code".to_string());
        renames.insert("Ubicacion".to_string(), "location".to_string());
        renames.insert("MAT".to_string(), "ignored".to_string());

        table.rename_columns(&renames);

        assert!(table.has_column("material_code"));
        assert!(table.has_column("location"));
        assert!(!table.has_column("ignored"));
    }
}
