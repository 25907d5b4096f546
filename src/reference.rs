// 📚 Reference Repository - control tables as prebuilt indexes
// Material master, warehouse/classification combinations, position map

use crate::codes::{fits_width, pad_code, CodeWidths};
use crate::error::{EvaluationError, ReferenceDataError};
use crate::table::{CellValue, Table};
use crate::zones::{ZoneRange, ZoneResolver};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

// ============================================================================
// CANONICAL NAMES
// ============================================================================

pub const MATERIAL_MASTER: &str = "material_master";
pub const COMBINATION_RULES: &str = "combination_rules";
pub const POSITION_MAP: &str = "position_map";

pub const COL_MATERIAL_CODE: &str = "material_code";
pub const COL_CLASSIFICATION_CODE: &str = "classification_code";
pub const COL_DEFAULT_WAREHOUSE_TYPE: &str = "default_warehouse_type";
pub const COL_WAREHOUSE_TYPE: &str = "warehouse_type";
pub const COL_PERMITTED_ZONES: &str = "permitted_zones";
pub const COL_WAREHOUSE_NAME: &str = "warehouse_name";
pub const COL_ZONE_ID: &str = "zone_id";
pub const COL_POSITION_FROM: &str = "position_from";
pub const COL_POSITION_TO: &str = "position_to";

static NO_ZONES: BTreeSet<String> = BTreeSet::new();

// ============================================================================
// ENTRIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub material_code: String,
    /// Zero-padded to the classification width
    pub classification_code: String,
    /// Zero-padded to the warehouse-type width
    pub default_warehouse_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationRule {
    /// 1-based data row in the combination table
    pub row: usize,
    pub warehouse_type: String,
    pub classification_code: String,
    pub permitted_zones: BTreeSet<String>,
    pub raw_zones: String,
}

impl CombinationRule {
    /// A zone list that yields no zone ids after trimming is malformed
    pub fn is_malformed(&self) -> bool {
        self.permitted_zones.is_empty()
    }
}

/// Split a comma-separated zone list, trimming tokens and dropping empty ones
pub fn parse_zone_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|z| z.trim())
        .filter(|z| !z.is_empty())
        .map(|z| z.to_string())
        .collect()
}

#[derive(Debug, Clone, Default)]
struct RuleGroup {
    zones: BTreeSet<String>,
    malformed: Vec<CombinationRule>,
}

// ============================================================================
// REFERENCE TABLES (input bundle)
// ============================================================================

/// The three control tables, already renamed to canonical columns
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub material_master: Table,
    pub combination_rules: Table,
    pub position_map: Table,
}

impl ReferenceTables {
    /// Pick the three tables out of a bundle keyed by canonical table name
    pub fn from_bundle(mut bundle: HashMap<String, Table>) -> Result<Self, ReferenceDataError> {
        let mut take = |name: &str| {
            bundle
                .remove(name)
                .ok_or_else(|| ReferenceDataError::MissingTable {
                    table: name.to_string(),
                })
        };

        Ok(ReferenceTables {
            material_master: take(MATERIAL_MASTER)?,
            combination_rules: take(COMBINATION_RULES)?,
            position_map: take(POSITION_MAP)?,
        })
    }
}

// ============================================================================
// REFERENCE REPOSITORY
// ============================================================================

/// Read-only after construction; safe to share across worker threads
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    widths: CodeWidths,
    materials: HashMap<String, MaterialEntry>,
    rules: HashMap<(String, String), RuleGroup>,
    warehouse_names: HashMap<String, String>,
    resolver: ZoneResolver,
}

impl ReferenceRepository {
    /// Validate and index the control tables. Any missing column or bad code is fatal.
    pub fn load(tables: &ReferenceTables, widths: CodeWidths) -> Result<Self, ReferenceDataError> {
        let materials = index_materials(&tables.material_master, widths)?;
        let (rules, warehouse_names) = index_rules(&tables.combination_rules, widths)?;
        let resolver = build_resolver(&tables.position_map)?;

        info!(
            materials = materials.len(),
            combinations = rules.len(),
            zone_ranges = resolver.range_count(),
            warehouse_names = warehouse_names.len(),
            "reference data loaded"
        );

        Ok(ReferenceRepository {
            widths,
            materials,
            rules,
            warehouse_names,
            resolver,
        })
    }

    pub fn widths(&self) -> CodeWidths {
        self.widths
    }

    /// Material master entry by trimmed material code
    pub fn find_material(&self, material_code: &str) -> Option<&MaterialEntry> {
        self.materials.get(material_code.trim())
    }

    /// Union of permitted zones for the pair; empty when no rule matches.
    /// Both codes are padded before lookup, so "5" and "005" resolve alike.
    pub fn find_combination_rules(
        &self,
        warehouse_type: &str,
        classification_code: &str,
    ) -> Result<&BTreeSet<String>, EvaluationError> {
        let key = (
            pad_code(warehouse_type, self.widths.warehouse_type),
            pad_code(classification_code, self.widths.classification),
        );

        match self.rules.get(&key) {
            None => Ok(&NO_ZONES),
            Some(group) => match group.malformed.first() {
                Some(rule) => Err(EvaluationError::MalformedZoneList {
                    warehouse_type: rule.warehouse_type.clone(),
                    classification_code: rule.classification_code.clone(),
                    row: rule.row,
                    raw: rule.raw_zones.clone(),
                }),
                None => Ok(&group.zones),
            },
        }
    }

    /// Zones whose position ranges contain the location
    pub fn zone_ranges_for(&self, location: &CellValue) -> BTreeSet<String> {
        self.resolver.zones_containing(location)
    }

    /// Display name of a warehouse type, if the combination table carries names
    pub fn warehouse_name(&self, warehouse_type: &str) -> Option<&str> {
        self.warehouse_names
            .get(&pad_code(warehouse_type, self.widths.warehouse_type))
            .map(|s| s.as_str())
    }

    pub fn has_warehouse_names(&self) -> bool {
        !self.warehouse_names.is_empty()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn combination_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// INDEX BUILDERS
// ============================================================================

fn require_column(table: &Table, table_name: &str, column: &str) -> Result<usize, ReferenceDataError> {
    table
        .column_index(column)
        .ok_or_else(|| ReferenceDataError::MissingColumn {
            table: table_name.to_string(),
            column: column.to_string(),
        })
}

fn padded_code(
    table: &Table,
    table_name: &str,
    column: &str,
    col_idx: usize,
    row: usize,
    width: usize,
) -> Result<String, ReferenceDataError> {
    let raw = table.cell(row, col_idx).map(|c| c.as_text()).unwrap_or_default();
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ReferenceDataError::BlankCode {
            table: table_name.to_string(),
            column: column.to_string(),
            row: row + 1,
        });
    }
    if !fits_width(raw, width) {
        return Err(ReferenceDataError::CodeTooWide {
            table: table_name.to_string(),
            column: column.to_string(),
            row: row + 1,
            value: raw.to_string(),
            width,
        });
    }

    Ok(pad_code(raw, width))
}

fn index_materials(
    table: &Table,
    widths: CodeWidths,
) -> Result<HashMap<String, MaterialEntry>, ReferenceDataError> {
    let material_idx = require_column(table, MATERIAL_MASTER, COL_MATERIAL_CODE)?;
    let class_idx = require_column(table, MATERIAL_MASTER, COL_CLASSIFICATION_CODE)?;
    let type_idx = require_column(table, MATERIAL_MASTER, COL_DEFAULT_WAREHOUSE_TYPE)?;

    let mut materials = HashMap::new();

    for row in 0..table.row_count() {
        let material_code = table
            .cell(row, material_idx)
            .map(|c| c.as_text().trim().to_string())
            .unwrap_or_default();

        if material_code.is_empty() {
            warn!(row = row + 1, "material master row without material code ignored");
            continue;
        }

        let classification_code = padded_code(
            table,
            MATERIAL_MASTER,
            COL_CLASSIFICATION_CODE,
            class_idx,
            row,
            widths.classification,
        )?;
        let default_warehouse_type = padded_code(
            table,
            MATERIAL_MASTER,
            COL_DEFAULT_WAREHOUSE_TYPE,
            type_idx,
            row,
            widths.warehouse_type,
        )?;

        // First occurrence wins
        if materials.contains_key(&material_code) {
            debug!(material = %material_code, row = row + 1, "duplicate material ignored");
            continue;
        }

        materials.insert(
            material_code.clone(),
            MaterialEntry {
                material_code,
                classification_code,
                default_warehouse_type,
            },
        );
    }

    Ok(materials)
}

#[allow(clippy::type_complexity)]
fn index_rules(
    table: &Table,
    widths: CodeWidths,
) -> Result<(HashMap<(String, String), RuleGroup>, HashMap<String, String>), ReferenceDataError> {
    let type_idx = require_column(table, COMBINATION_RULES, COL_WAREHOUSE_TYPE)?;
    let class_idx = require_column(table, COMBINATION_RULES, COL_CLASSIFICATION_CODE)?;
    let zones_idx = require_column(table, COMBINATION_RULES, COL_PERMITTED_ZONES)?;
    let name_idx = table.column_index(COL_WAREHOUSE_NAME);

    let mut rules: HashMap<(String, String), RuleGroup> = HashMap::new();
    let mut warehouse_names = HashMap::new();

    for row in 0..table.row_count() {
        let warehouse_type = padded_code(
            table,
            COMBINATION_RULES,
            COL_WAREHOUSE_TYPE,
            type_idx,
            row,
            widths.warehouse_type,
        )?;
        let classification_code = padded_code(
            table,
            COMBINATION_RULES,
            COL_CLASSIFICATION_CODE,
            class_idx,
            row,
            widths.classification,
        )?;
        let raw_zones = table
            .cell(row, zones_idx)
            .map(|c| c.as_text())
            .unwrap_or_default();

        // Later rows override earlier names for the same warehouse type
        if let Some(name) = name_idx
            .and_then(|idx| table.cell(row, idx))
            .filter(|c| !c.is_blank())
        {
            warehouse_names.insert(warehouse_type.clone(), name.as_text().trim().to_string());
        }

        let rule = CombinationRule {
            row: row + 1,
            permitted_zones: parse_zone_list(&raw_zones),
            warehouse_type,
            classification_code,
            raw_zones,
        };

        let group = rules
            .entry((rule.warehouse_type.clone(), rule.classification_code.clone()))
            .or_default();

        if rule.is_malformed() {
            warn!(
                row = rule.row,
                warehouse_type = %rule.warehouse_type,
                classification = %rule.classification_code,
                raw = %rule.raw_zones,
                "combination rule has no zone ids"
            );
            group.malformed.push(rule);
        } else {
            group.zones.extend(rule.permitted_zones.iter().cloned());
        }
    }

    Ok((rules, warehouse_names))
}

fn build_resolver(table: &Table) -> Result<ZoneResolver, ReferenceDataError> {
    let zone_idx = require_column(table, POSITION_MAP, COL_ZONE_ID)?;
    let from_idx = require_column(table, POSITION_MAP, COL_POSITION_FROM)?;
    let to_idx = require_column(table, POSITION_MAP, COL_POSITION_TO)?;

    let mut ranges = Vec::with_capacity(table.row_count());

    for row in 0..table.row_count() {
        let zone_id = table
            .cell(row, zone_idx)
            .map(|c| c.as_text())
            .unwrap_or_default();

        if zone_id.trim().is_empty() {
            warn!(row = row + 1, "position map row without zone id ignored");
            continue;
        }

        let empty = CellValue::Empty;
        ranges.push(ZoneRange::new(
            &zone_id,
            table.cell(row, from_idx).unwrap_or(&empty),
            table.cell(row, to_idx).unwrap_or(&empty),
        ));
    }

    Ok(ZoneResolver::new(ranges))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(headers);
        for r in rows {
            t.push_row(r.iter().map(|v| CellValue::text(v)).collect());
        }
        t
    }

    fn sample_tables() -> ReferenceTables {
        ReferenceTables {
            material_master: table(
                &[COL_MATERIAL_CODE, COL_CLASSIFICATION_CODE, COL_DEFAULT_WAREHOUSE_TYPE],
                &[&["1000", "7", "1"], &["1000", "8", "2"], &["2000", "000000000000009", "002"]],
            ),
            combination_rules: table(
                &[COL_WAREHOUSE_TYPE, COL_CLASSIFICATION_CODE, COL_PERMITTED_ZONES, COL_WAREHOUSE_NAME],
                &[
                    &["1", "7", "A, B", "Cold room"],
                    &["001", "000000000000007", "C,,", "Cold storage"],
                    &["2", "9", " , ", ""],
                ],
            ),
            position_map: table(
                &[COL_ZONE_ID, COL_POSITION_FROM, COL_POSITION_TO],
                &[&["A", "100", "200"], &["", "0", "999"], &["C", "300", "400"]],
            ),
        }
    }

    #[test]
    fn test_parse_zone_list_drops_empty_tokens() {
        let zones = parse_zone_list(" A ,, B ,");
        assert_eq!(zones.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(parse_zone_list(" , ").is_empty());
    }

    #[test]
    fn test_material_lookup_first_wins_and_pads() {
        let repo = ReferenceRepository::load(&sample_tables(), CodeWidths::default()).unwrap();
        let entry = repo.find_material(" 1000 ").unwrap();

        assert_eq!(entry.classification_code, "000000000000007");
        assert_eq!(entry.default_warehouse_type, "001");
        assert!(repo.find_material("9999").is_none());
    }

    #[test]
    fn test_rules_union_and_padding_normalization() {
        let repo = ReferenceRepository::load(&sample_tables(), CodeWidths::default()).unwrap();

        let padded = repo
            .find_combination_rules("001", "000000000000007")
            .unwrap()
            .clone();
        let short = repo.find_combination_rules("1", "7").unwrap().clone();

        assert_eq!(padded, short);
        assert_eq!(padded.into_iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unknown_combination_is_empty_not_error() {
        let repo = ReferenceRepository::load(&sample_tables(), CodeWidths::default()).unwrap();
        assert!(repo.find_combination_rules("003", "7").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_zone_list_is_evaluation_error() {
        let repo = ReferenceRepository::load(&sample_tables(), CodeWidths::default()).unwrap();
        let err = repo.find_combination_rules("002", "9").unwrap_err();

        match err {
            EvaluationError::MalformedZoneList { row, .. } => assert_eq!(row, 3),
        }
    }

    #[test]
    fn test_warehouse_names_later_rows_win() {
        let repo = ReferenceRepository::load(&sample_tables(), CodeWidths::default()).unwrap();

        assert!(repo.has_warehouse_names());
        assert_eq!(repo.warehouse_name("1"), Some("Cold storage"));
        assert_eq!(repo.warehouse_name("002"), None);
    }

    #[test]
    fn test_blank_zone_rows_are_skipped() {
        let repo = ReferenceRepository::load(&sample_tables(), CodeWidths::default()).unwrap();
        let zones = repo.zone_ranges_for(&CellValue::text("350"));
        assert_eq!(zones.into_iter().collect::<Vec<_>>(), vec!["C"]);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let mut tables = sample_tables();
        tables.position_map = table(&[COL_ZONE_ID, COL_POSITION_FROM], &[]);

        let err = ReferenceRepository::load(&tables, CodeWidths::default()).unwrap_err();
        assert_eq!(
            err,
            ReferenceDataError::MissingColumn {
                table: POSITION_MAP.to_string(),
                column: COL_POSITION_TO.to_string(),
            }
        );
        assert!(err.to_string().contains("position_to"));
    }

    #[test]
    fn test_code_too_wide_is_fatal() {
        let mut tables = sample_tables();
        tables.material_master = table(
            &[COL_MATERIAL_CODE, COL_CLASSIFICATION_CODE, COL_DEFAULT_WAREHOUSE_TYPE],
            &[&["1000", "7", "0001"]],
        );

        let err = ReferenceRepository::load(&tables, CodeWidths::default()).unwrap_err();
        assert!(matches!(err, ReferenceDataError::CodeTooWide { row: 1, width: 3, .. }));
    }

    #[test]
    fn test_blank_code_is_fatal() {
        let mut tables = sample_tables();
        tables.combination_rules = table(
            &[COL_WAREHOUSE_TYPE, COL_CLASSIFICATION_CODE, COL_PERMITTED_ZONES],
            &[&["001", "", "A"]],
        );

        let err = ReferenceRepository::load(&tables, CodeWidths::default()).unwrap_err();
        assert!(matches!(err, ReferenceDataError::BlankCode { .. }));
    }

    #[test]
    fn test_bundle_requires_all_tables() {
        let mut bundle = HashMap::new();
        bundle.insert(MATERIAL_MASTER.to_string(), Table::default());
        bundle.insert(POSITION_MAP.to_string(), Table::default());

        let err = ReferenceTables::from_bundle(bundle).unwrap_err();
        assert_eq!(
            err,
            ReferenceDataError::MissingTable {
                table: COMBINATION_RULES.to_string()
            }
        );
    }
}
