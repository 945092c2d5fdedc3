use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::ColorMap;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// An outcome measure and the payment measure it is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurePair {
    pub outcome: String,
    pub payment: String,
}

/// Source file names, resolved against [`PipelineConfig::data_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub spending: PathBuf,
    pub complications: PathBuf,
    pub payment: PathBuf,
    pub hospital_info: PathBuf,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            spending: "Medicare_Hospital_Spending_Per_Patient-Hospital.csv".into(),
            complications: "Complications_and_Deaths-Hospital.csv".into(),
            payment: "Payment_and_Value_of_Care-Hospital.csv".into(),
            hospital_info: "Hospital_General_Information.csv".into(),
        }
    }
}

/// Everything a run needs besides the data itself.  Every field is optional
/// in the JSON form; omitted ones keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Two-letter state codes to compare.
    pub selected_states: BTreeSet<String>,
    /// Highlighted facilities, in legend order.
    pub selected_hospitals: Vec<String>,
    /// Facility name → CSS colour name or `#rrggbb`.
    pub hospital_color_map: BTreeMap<String, String>,
    /// Colour for every facility not in the map.
    pub default_color: String,
    /// Outcome measures to chart, in panel order.
    pub measures: Vec<MeasurePair>,
    pub data_dir: PathBuf,
    pub inputs: InputFiles,
    pub output_dir: PathBuf,
}

const DEFAULT_HOSPITALS: [(&str, &str); 3] = [
    ("BOSTON MEDICAL CENTER", "red"),
    ("MASSACHUSETTS GENERAL HOSPITAL", "green"),
    ("CAMBRIDGE HEALTH ALLIANCE", "blue"),
];

const DEFAULT_MEASURES: [(&str, &str); 4] = [
    (
        "Rate of complications for hip/knee replacement patients",
        "Payment for hip/knee replacement patients",
    ),
    (
        "Death rate for heart attack patients",
        "Payment for heart attack patients",
    ),
    (
        "Death rate for heart failure patients",
        "Payment for heart failure patients",
    ),
    (
        "Death rate for pneumonia patients",
        "Payment for pneumonia patients",
    ),
];

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selected_states: ["MA", "NY"].into_iter().map(String::from).collect(),
            selected_hospitals: DEFAULT_HOSPITALS
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
            hospital_color_map: DEFAULT_HOSPITALS
                .iter()
                .map(|(name, color)| (name.to_string(), color.to_string()))
                .collect(),
            default_color: "lightgrey".into(),
            measures: DEFAULT_MEASURES
                .iter()
                .map(|(outcome, payment)| MeasurePair {
                    outcome: outcome.to_string(),
                    payment: payment.to_string(),
                })
                .collect(),
            data_dir: PathBuf::from("."),
            inputs: InputFiles::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations a run cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selected_states.is_empty() {
            return Err(ConfigError::Empty("state"));
        }
        if self.measures.is_empty() {
            return Err(ConfigError::Empty("measure"));
        }
        ColorMap::from_config(self)?;
        Ok(())
    }

    /// Outcome measure name → payment measure name.
    pub fn measure_mapping(&self) -> BTreeMap<String, String> {
        self.measures
            .iter()
            .map(|m| (m.outcome.clone(), m.payment.clone()))
            .collect()
    }

    pub fn outcome_measures(&self) -> Vec<String> {
        self.measures.iter().map(|m| m.outcome.clone()).collect()
    }

    /// Selected states in panel order.
    pub fn state_order(&self) -> Vec<String> {
        self.selected_states.iter().cloned().collect()
    }

    pub fn input_path(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn output_path(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }
}
