use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{Age, ADULT_AGE};

/// Seed used when neither the configuration nor the command line set one.
pub const DEFAULT_SEED: u64 = 12345;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Resolution {
    #[value(name = "MSOA11")]
    MSOA11,
    #[value(name = "OA11")]
    OA11,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::MSOA11 => write!(f, "MSOA11"),
            Resolution::OA11 => write!(f, "OA11"),
        }
    }
}

/// Subnational population projection variant the person table was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Projection {
    /// Principal
    #[serde(rename = "ppp")]
    #[value(name = "ppp")]
    PPP,
    /// High fertility, life expectancy and migration
    #[serde(rename = "hhh")]
    #[value(name = "hhh")]
    HHH,
    /// Low fertility, life expectancy and migration
    #[serde(rename = "lll")]
    #[value(name = "lll")]
    LLL,
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Projection::PPP => write!(f, "ppp"),
            Projection::HHH => write!(f, "hhh"),
            Projection::LLL => write!(f, "lll"),
        }
    }
}

pub type YearInt = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Year(pub YearInt);

impl std::fmt::Display for Year {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub person_resolution: Resolution,
    pub household_resolution: Resolution,
    pub projection: Projection,
    #[serde(default)]
    pub strict: bool,
    pub year: Year,
    pub data_dir: PathBuf,
    #[serde(default)]
    pub persistent_data_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_adult_age")]
    pub adult_age: Age,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_adult_age() -> Age {
    ADULT_AGE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            person_resolution: Resolution::MSOA11,
            household_resolution: Resolution::OA11,
            projection: Projection::PPP,
            strict: false,
            year: Year(2011),
            data_dir: PathBuf::from("data/"),
            persistent_data_dir: None,
            output_dir: None,
            seed: DEFAULT_SEED,
            adult_age: ADULT_AGE,
        }
    }
}

impl Config {
    /// Reads a JSON model configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn persistent_data(&self) -> PathBuf {
        self.persistent_data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("persistent_data/"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("outputs/"))
    }

    pub fn household_file(&self, region: &str) -> PathBuf {
        self.data_dir.join(format!(
            "ssm_hh_{}_{}_{}.csv",
            region, self.household_resolution, self.year
        ))
    }

    pub fn person_file(&self, region: &str) -> PathBuf {
        self.data_dir.join(format!(
            "ssm_{}_{}_{}_{}.csv",
            region, self.person_resolution, self.projection, self.year
        ))
    }

    /// Prefers the gzipped lookup, falling back to plain CSV.
    pub fn geog_lookup_file(&self) -> PathBuf {
        let gz = self.persistent_data().join("gb_geog_lookup.csv.gz");
        if gz.is_file() {
            gz
        } else {
            self.persistent_data().join("gb_geog_lookup.csv")
        }
    }

    pub fn assigned_person_file(&self, region: &str) -> PathBuf {
        self.output_dir().join(format!(
            "rs_ass_{}_{}_{}.csv",
            region, self.person_resolution, self.year
        ))
    }

    pub fn assigned_household_file(&self, region: &str) -> PathBuf {
        self.output_dir().join(format!(
            "rs_ass_hh_{}_{}_{}.csv",
            region, self.household_resolution, self.year
        ))
    }
}
