//! Run configuration.
//!
//! One store backs every front end: a TOML file for the command line, or an
//! in-memory value when the caller already holds the settings. Command-line
//! overrides go through [`ConfigStore::set`] like any other change.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::owners::MalformedPolicy;
use crate::reconcile::MergeOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub input_csv: PathBuf,
    pub input_geojson: PathBuf,
    pub output_geojson: PathBuf,
    /// Owner parcels without a geometry.
    pub inconsistencies_csv: PathBuf,
    /// Geometries without owner data.
    pub inconsistencies_geojson: PathBuf,
    /// Intermediate grouped owners file.
    pub grouped_csv: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from("inputs/parcelles.csv"),
            input_geojson: PathBuf::from("inputs/parcelles.geojson"),
            output_geojson: PathBuf::from("outputs/parcelles_proprietaires.geojson"),
            inconsistencies_csv: PathBuf::from("outputs/inconsistencies_csv.csv"),
            inconsistencies_geojson: PathBuf::from("outputs/inconsistencies_json.csv"),
            grouped_csv: PathBuf::from("outputs/parcelles_edited.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub id_csv_column: String,
    pub prop_name: String,
    /// Empty disables the per-owner properties.
    pub individual_prop_name: String,
    pub csv_separator: String,
    pub skip_malformed: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            id_csv_column: "Bg Emplacement".to_string(),
            prop_name: "Propriétaires".to_string(),
            individual_prop_name: "Propriétaire".to_string(),
            csv_separator: ";".to_string(),
            skip_malformed: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: Paths,
    pub options: Options,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn merge_options(&self) -> MergeOptions {
        let base = self.options.individual_prop_name.trim();
        MergeOptions {
            owners_property: self.options.prop_name.clone(),
            individual_property: (!base.is_empty()).then(|| base.to_string()),
        }
    }

    pub fn malformed_policy(&self) -> MalformedPolicy {
        if self.options.skip_malformed {
            MalformedPolicy::SkipAndReport
        } else {
            MalformedPolicy::Abort
        }
    }
}

/// Every recognized setting, named as on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    InputCsv,
    InputGeojson,
    OutputGeojson,
    InconsistenciesCsv,
    InconsistenciesGeojson,
    GroupedCsv,
    IdCsvColumn,
    PropName,
    IndividualPropName,
    CsvSeparator,
    SkipMalformed,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::InputCsv,
        ConfigKey::InputGeojson,
        ConfigKey::OutputGeojson,
        ConfigKey::InconsistenciesCsv,
        ConfigKey::InconsistenciesGeojson,
        ConfigKey::GroupedCsv,
        ConfigKey::IdCsvColumn,
        ConfigKey::PropName,
        ConfigKey::IndividualPropName,
        ConfigKey::CsvSeparator,
        ConfigKey::SkipMalformed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InputCsv => "input-csv",
            Self::InputGeojson => "input-geojson",
            Self::OutputGeojson => "output-geojson",
            Self::InconsistenciesCsv => "inconsistencies-csv",
            Self::InconsistenciesGeojson => "inconsistencies-geojson",
            Self::GroupedCsv => "grouped-csv",
            Self::IdCsvColumn => "id-csv-column",
            Self::PropName => "prop-name",
            Self::IndividualPropName => "individual-prop-name",
            Self::CsvSeparator => "csv-separator",
            Self::SkipMalformed => "skip-malformed",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.replace('_', "-").to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| Error::Config(format!("unknown setting '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backing {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    settings: Settings,
    backing: Backing,
}

impl ConfigStore {
    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::reading(path, e))?;
        let settings = Settings::from_toml(&text)?;
        info!("Config file read successfully: {}", path.display());
        Ok(Self {
            settings,
            backing: Backing::File(path.to_path_buf()),
        })
    }

    pub fn in_memory(settings: Settings) -> Self {
        Self {
            settings,
            backing: Backing::InMemory,
        }
    }

    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get(&self, key: ConfigKey) -> String {
        let paths = &self.settings.paths;
        let options = &self.settings.options;
        match key {
            ConfigKey::InputCsv => paths.input_csv.display().to_string(),
            ConfigKey::InputGeojson => paths.input_geojson.display().to_string(),
            ConfigKey::OutputGeojson => paths.output_geojson.display().to_string(),
            ConfigKey::InconsistenciesCsv => paths.inconsistencies_csv.display().to_string(),
            ConfigKey::InconsistenciesGeojson => {
                paths.inconsistencies_geojson.display().to_string()
            }
            ConfigKey::GroupedCsv => paths.grouped_csv.display().to_string(),
            ConfigKey::IdCsvColumn => options.id_csv_column.clone(),
            ConfigKey::PropName => options.prop_name.clone(),
            ConfigKey::IndividualPropName => options.individual_prop_name.clone(),
            ConfigKey::CsvSeparator => options.csv_separator.clone(),
            ConfigKey::SkipMalformed => options.skip_malformed.to_string(),
        }
    }

    /// Changes one setting in memory. Call [`ConfigStore::save`] to persist it.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let paths = &mut self.settings.paths;
        let options = &mut self.settings.options;
        match key {
            ConfigKey::InputCsv => paths.input_csv = value.into(),
            ConfigKey::InputGeojson => paths.input_geojson = value.into(),
            ConfigKey::OutputGeojson => paths.output_geojson = value.into(),
            ConfigKey::InconsistenciesCsv => paths.inconsistencies_csv = value.into(),
            ConfigKey::InconsistenciesGeojson => paths.inconsistencies_geojson = value.into(),
            ConfigKey::GroupedCsv => paths.grouped_csv = value.into(),
            ConfigKey::IdCsvColumn => options.id_csv_column = value.to_string(),
            ConfigKey::PropName => options.prop_name = value.to_string(),
            ConfigKey::IndividualPropName => options.individual_prop_name = value.to_string(),
            ConfigKey::CsvSeparator => {
                info!("CSV separator set to: {}", value);
                options.csv_separator = value.to_string();
            }
            ConfigKey::SkipMalformed => {
                options.skip_malformed = value.parse().map_err(|_| {
                    Error::Config(format!("{key} expects true or false, got '{value}'"))
                })?;
            }
        }
        Ok(())
    }

    /// Replaces every setting at once.
    pub fn update(&mut self, settings: Settings) {
        self.settings = settings;
        info!("Configuration updated");
    }

    /// Writes the settings back to their file. Nothing to do in memory.
    pub fn save(&self) -> Result<()> {
        match &self.backing {
            Backing::File(path) => {
                let text = self.settings.to_toml()?;
                fs::write(path, text).map_err(|e| Error::writing(path, e))
            }
            Backing::InMemory => Ok(()),
        }
    }
}
