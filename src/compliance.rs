// ✅ Compliance Evaluator - one inventory record → one verdict
// Normative mode: location vs permitted zones
// Operational mode: declared warehouse type vs material master

use crate::codes::pad_code;
use crate::error::EvaluationError;
use crate::reference::ReferenceRepository;
use crate::table::CellValue;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// STATUS
// ============================================================================

/// Closed set of verdict statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Compliant,
    ValidButWrongCombination,
    OutOfBounds,
    MaterialNotFound,
    NoValidCombination,
    OperationallyCorrect,
    OperationalMismatch,
    EvaluationError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Compliant,
        Status::ValidButWrongCombination,
        Status::OutOfBounds,
        Status::MaterialNotFound,
        Status::NoValidCombination,
        Status::OperationallyCorrect,
        Status::OperationalMismatch,
        Status::EvaluationError,
    ];

    /// Stable code used in exported tables
    pub fn code(&self) -> &'static str {
        match self {
            Status::Compliant => "COMPLIANT",
            Status::ValidButWrongCombination => "VALID_BUT_WRONG_COMBINATION",
            Status::OutOfBounds => "OUT_OF_BOUNDS",
            Status::MaterialNotFound => "MATERIAL_NOT_FOUND",
            Status::NoValidCombination => "NO_VALID_COMBINATION",
            Status::OperationallyCorrect => "OPERATIONALLY_CORRECT",
            Status::OperationalMismatch => "OPERATIONAL_MISMATCH",
            Status::EvaluationError => "EVALUATION_ERROR",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Status::Compliant => "Compliant",
            Status::ValidButWrongCombination => "Valid zone, wrong combination",
            Status::OutOfBounds => "Out of bounds",
            Status::MaterialNotFound => "Material not found",
            Status::NoValidCombination => "No valid combination",
            Status::OperationallyCorrect => "Operationally correct",
            Status::OperationalMismatch => "Operational mismatch",
            Status::EvaluationError => "Evaluation error",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Status::Compliant | Status::OperationallyCorrect => Severity::Ok,
            Status::ValidButWrongCombination | Status::EvaluationError => Severity::Warning,
            Status::OutOfBounds
            | Status::MaterialNotFound
            | Status::NoValidCombination
            | Status::OperationalMismatch => Severity::Critical,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self.severity() {
            Severity::Ok => "🟢",
            Severity::Warning => "🟡",
            Severity::Critical => "🔴",
        }
    }

    pub fn suggested_correction(&self) -> &'static str {
        match self {
            Status::Compliant | Status::OperationallyCorrect => "no correction required",
            Status::ValidButWrongCombination => {
                "relocate to a zone permitted for this warehouse type and classification"
            }
            Status::OutOfBounds => "review classification and assigned warehouse type",
            Status::MaterialNotFound => "register the material in the material master",
            Status::NoValidCombination => {
                "add a combination rule for this warehouse type and classification"
            }
            Status::OperationalMismatch => {
                "align the declared warehouse type with the material master"
            }
            Status::EvaluationError => "fix the malformed reference data row",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    pub observation: String,
    pub suggested_correction: String,
}

impl Verdict {
    pub fn new(status: Status, observation: impl Into<String>) -> Self {
        Verdict {
            status,
            observation: observation.into(),
            suggested_correction: status.suggested_correction().to_string(),
        }
    }

    /// Verdict for a record whose evaluation failed on malformed reference data
    pub fn from_error(err: &EvaluationError) -> Self {
        Verdict::new(Status::EvaluationError, err.to_string())
    }
}

// ============================================================================
// INVENTORY RECORD
// ============================================================================

/// One physical stock line from the inventory extract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// 0-based row in the source table
    pub row: usize,
    pub material_code: String,
    pub location: CellValue,
    pub declared_warehouse_type: String,
}

impl InventoryRecord {
    pub fn new(material_code: &str, location: CellValue, declared_warehouse_type: &str) -> Self {
        InventoryRecord {
            row: 0,
            material_code: material_code.trim().to_string(),
            location,
            declared_warehouse_type: declared_warehouse_type.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Normative,
    Operational,
}

impl Mode {
    pub fn name(&self) -> &str {
        match self {
            Mode::Normative => "Normative",
            Mode::Operational => "Operational",
        }
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

pub struct ComplianceEvaluator<'a> {
    repo: &'a ReferenceRepository,
}

impl<'a> ComplianceEvaluator<'a> {
    pub fn new(repo: &'a ReferenceRepository) -> Self {
        ComplianceEvaluator { repo }
    }

    pub fn evaluate(&self, record: &InventoryRecord, mode: Mode) -> Result<Verdict, EvaluationError> {
        match mode {
            Mode::Normative => self.evaluate_normative(record),
            Mode::Operational => Ok(self.evaluate_operational(record)),
        }
    }

    /// Location against the zones permitted for the material's classification
    /// and default warehouse type
    pub fn evaluate_normative(&self, record: &InventoryRecord) -> Result<Verdict, EvaluationError> {
        let material = match self.repo.find_material(&record.material_code) {
            Some(m) => m,
            None => return Ok(material_not_found()),
        };

        let permitted = self
            .repo
            .find_combination_rules(&material.default_warehouse_type, &material.classification_code)?;

        if permitted.is_empty() {
            return Ok(Verdict::new(
                Status::NoValidCombination,
                "no valid warehouse+classification combination exists",
            ));
        }

        let actual = self.repo.zone_ranges_for(&record.location);

        let verdict = if permitted.intersection(&actual).next().is_some() {
            Verdict::new(Status::Compliant, "location correct per regulation")
        } else if !actual.is_empty() {
            Verdict::new(
                Status::ValidButWrongCombination,
                "location is a recognized zone but not valid for this combination",
            )
        } else {
            Verdict::new(Status::OutOfBounds, "location outside all permitted zones")
        };

        Ok(verdict)
    }

    /// Declared warehouse type against the material master's default
    pub fn evaluate_operational(&self, record: &InventoryRecord) -> Verdict {
        let material = match self.repo.find_material(&record.material_code) {
            Some(m) => m,
            None => return material_not_found(),
        };

        // A missing declaration never pads into a valid code
        if record.declared_warehouse_type.trim().is_empty() {
            return Verdict::new(
                Status::OperationalMismatch,
                format!(
                    "declared warehouse type (blank) ≠ master {}",
                    material.default_warehouse_type
                ),
            );
        }

        let declared = pad_code(
            &record.declared_warehouse_type,
            self.repo.widths().warehouse_type,
        );

        if declared == material.default_warehouse_type {
            Verdict::new(Status::OperationallyCorrect, "operational data correct")
        } else {
            Verdict::new(
                Status::OperationalMismatch,
                format!(
                    "declared warehouse type {} ≠ master {}",
                    declared, material.default_warehouse_type
                ),
            )
        }
    }
}

fn material_not_found() -> Verdict {
    Verdict::new(
        Status::MaterialNotFound,
        "material does not exist in master data",
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeWidths;
    use crate::reference::*;
    use crate::table::Table;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(headers);
        for r in rows {
            t.push_row(r.iter().map(|v| CellValue::text(v)).collect());
        }
        t
    }

    fn repo() -> ReferenceRepository {
        let tables = ReferenceTables {
            material_master: table(
                &[COL_MATERIAL_CODE, COL_CLASSIFICATION_CODE, COL_DEFAULT_WAREHOUSE_TYPE],
                &[
                    &["1000", "000000000000007", "001"],
                    &["3000", "000000000000008", "001"],
                    &["4000", "000000000000009", "004"],
                ],
            ),
            combination_rules: table(
                &[COL_WAREHOUSE_TYPE, COL_CLASSIFICATION_CODE, COL_PERMITTED_ZONES],
                &[&["001", "000000000000007", "A,B"], &["004", "000000000000009", ","]],
            ),
            position_map: table(
                &[COL_ZONE_ID, COL_POSITION_FROM, COL_POSITION_TO],
                &[&["A", "100", "200"], &["C", "300", "400"]],
            ),
        };
        ReferenceRepository::load(&tables, CodeWidths::default()).unwrap()
    }

    fn record(material: &str, location: &str, declared: &str) -> InventoryRecord {
        InventoryRecord::new(material, CellValue::text(location), declared)
    }

    #[test]
    fn test_normative_compliant() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo)
            .evaluate_normative(&record("1000", "150", "001"))
            .unwrap();

        assert_eq!(verdict.status, Status::Compliant);
        assert_eq!(verdict.suggested_correction, "no correction required");
    }

    #[test]
    fn test_normative_wrong_combination() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo)
            .evaluate_normative(&record("1000", "350", "001"))
            .unwrap();

        assert_eq!(verdict.status, Status::ValidButWrongCombination);
    }

    #[test]
    fn test_normative_out_of_bounds() {
        let repo = repo();
        let evaluator = ComplianceEvaluator::new(&repo);

        for location in ["500", "", "ZZ-9"] {
            let verdict = evaluator
                .evaluate_normative(&record("1000", location, "001"))
                .unwrap();
            assert_eq!(verdict.status, Status::OutOfBounds, "location {:?}", location);
            assert_eq!(
                verdict.suggested_correction,
                "review classification and assigned warehouse type"
            );
        }
    }

    #[test]
    fn test_normative_material_not_found_ignores_location() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo)
            .evaluate_normative(&record("9999", "150", "001"))
            .unwrap();

        assert_eq!(verdict.status, Status::MaterialNotFound);
    }

    #[test]
    fn test_normative_no_valid_combination() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo)
            .evaluate_normative(&record("3000", "150", "001"))
            .unwrap();

        assert_eq!(verdict.status, Status::NoValidCombination);
    }

    #[test]
    fn test_normative_malformed_rule_is_error() {
        let repo = repo();
        let err = ComplianceEvaluator::new(&repo)
            .evaluate_normative(&record("4000", "150", "004"))
            .unwrap_err();

        let verdict = Verdict::from_error(&err);
        assert_eq!(verdict.status, Status::EvaluationError);
        assert!(verdict.observation.contains("row 2"));
    }

    #[test]
    fn test_operational_correct_with_unpadded_declared_type() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo).evaluate_operational(&record("1000", "", "1"));

        assert_eq!(verdict.status, Status::OperationallyCorrect);
    }

    #[test]
    fn test_operational_mismatch_names_both_types() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo).evaluate_operational(&record("1000", "", "002"));

        assert_eq!(verdict.status, Status::OperationalMismatch);
        assert!(verdict.observation.contains("001"));
        assert!(verdict.observation.contains("002"));
    }

    #[test]
    fn test_operational_blank_declared_type() {
        let tables = ReferenceTables {
            material_master: table(
                &[COL_MATERIAL_CODE, COL_CLASSIFICATION_CODE, COL_DEFAULT_WAREHOUSE_TYPE],
                &[&["1000", "7", "0"]],
            ),
            combination_rules: table(
                &[COL_WAREHOUSE_TYPE, COL_CLASSIFICATION_CODE, COL_PERMITTED_ZONES],
                &[],
            ),
            position_map: table(&[COL_ZONE_ID, COL_POSITION_FROM, COL_POSITION_TO], &[]),
        };
        let repo = ReferenceRepository::load(&tables, CodeWidths::default()).unwrap();
        let evaluator = ComplianceEvaluator::new(&repo);

        for declared in ["", "   "] {
            let verdict = evaluator.evaluate_operational(&record("1000", "1", declared));
            assert_eq!(verdict.status, Status::OperationalMismatch, "declared {:?}", declared);
            assert_eq!(verdict.observation, "declared warehouse type (blank) ≠ master 000");
        }

        // An explicit zero still matches the padded master type
        let verdict = evaluator.evaluate_operational(&record("1000", "1", "0"));
        assert_eq!(verdict.status, Status::OperationallyCorrect);
    }

    #[test]
    fn test_operational_material_not_found() {
        let repo = repo();
        let verdict = ComplianceEvaluator::new(&repo).evaluate_operational(&record("nope", "", "001"));

        assert_eq!(verdict.status, Status::MaterialNotFound);
    }

    #[test]
    fn test_every_status_has_code_glyph_and_correction() {
        for status in Status::ALL {
            assert!(!status.code().is_empty());
            assert!(!status.glyph().is_empty());
            assert!(!status.suggested_correction().is_empty());
        }
        assert_eq!(Status::OutOfBounds.glyph(), "🔴");
        assert_eq!(Status::Compliant.glyph(), "🟢");
    }

    #[test]
    fn test_status_serializes_as_code() {
        let json = serde_json::to_string(&Status::ValidButWrongCombination).unwrap();
        assert_eq!(json, "\"VALID_BUT_WRONG_COMBINATION\"");
    }
}
