// ⚙️ Audit configuration
// Where the control workbook lives and how its headers map onto canonical columns

use crate::audit::{COL_DECLARED_WAREHOUSE_TYPE, COL_LOCATION, COL_MATERIAL_CODE};
use crate::codes::CodeWidths;
use crate::reference::*;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides the config file location
pub const CONFIG_ENV: &str = "WAREHOUSE_AUDITOR_CONFIG";

// ============================================================================
// CONFIG TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub material_master: String,
    pub combination_rules: String,
    pub position_map: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            material_master: "MAESTRO_MATERIALES".to_string(),
            combination_rules: "COMBINACIONES".to_string(),
            position_map: "MAPEO_POSICIONES".to_string(),
        }
    }
}

/// Source header → canonical column, per table. Matching is exact after trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub material_master: BTreeMap<String, String>,
    pub combination_rules: BTreeMap<String, String>,
    pub position_map: BTreeMap<String, String>,
    pub inventory: BTreeMap<String, String>,
}

fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            material_master: renames(&[
                ("MATERIAL", COL_MATERIAL_CODE),
                ("JERARQUIA", COL_CLASSIFICATION_CODE),
                ("IND TP ALM ENTRADA", COL_DEFAULT_WAREHOUSE_TYPE),
            ]),
            combination_rules: renames(&[
                ("TP_ALMACEN", COL_WAREHOUSE_TYPE),
                ("JERRARQUIA", COL_CLASSIFICATION_CODE),
                ("MAPEO_POSICIONES", COL_PERMITTED_ZONES),
                ("NOMBRE_ALMACEN", COL_WAREHOUSE_NAME),
            ]),
            position_map: renames(&[
                ("ZONA", COL_ZONE_ID),
                ("Posición Desde", COL_POSITION_FROM),
                ("Posición Hasta", COL_POSITION_TO),
            ]),
            inventory: renames(&[
                ("Material", COL_MATERIAL_CODE),
                ("Ubicacion", COL_LOCATION),
                ("Tipo_Almacen", COL_DECLARED_WAREHOUSE_TYPE),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub control_workbook: PathBuf,
    pub sheets: SheetNames,
    pub columns: ColumnMapping,
    pub widths: CodeWidths,
    /// Worker threads for batch evaluation (1 = sequential)
    pub workers: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            control_workbook: PathBuf::from("tablas_control.xlsx"),
            sheets: SheetNames::default(),
            columns: ColumnMapping::default(),
            widths: CodeWidths::default(),
            workers: 1,
        }
    }
}

// ============================================================================
// CONFIG MANAGER
// ============================================================================

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// `$WAREHOUSE_AUDITOR_CONFIG`, else the platform config dir, else ./config.json
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        directories::ProjectDirs::from("com", "warehouse-auditor", "WarehouseAuditor")
            .map(|d| d.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Missing file → defaults
    pub fn load(&self) -> Result<AuditConfig> {
        if !self.config_path.exists() {
            debug!(path = ?self.config_path, "no config file, using defaults");
            return Ok(AuditConfig::default());
        }

        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", self.config_path))?;
        Ok(config)
    }

    pub fn save(&self, config: &AuditConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("absent.json"));

        let config = manager.load().unwrap();
        assert_eq!(config, AuditConfig::default());
        assert_eq!(config.widths.classification, 15);
        assert_eq!(config.widths.warehouse_type, 3);
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("nested").join("config.json"));

        let mut config = AuditConfig::default();
        config.workers = 4;
        config.sheets.position_map = "POSITIONS".to_string();

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "workers": 8, "widths": { "classification": 10, "warehouse_type": 3 } }"#).unwrap();

        let config = ConfigManager::new(path).load().unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.widths.classification, 10);
        assert_eq!(config.sheets, SheetNames::default());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(ConfigManager::new(path).load().is_err());
    }
}
