use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    codes::{AgeBand, Eth, EthMapping, Sex},
    error::AssignmentError,
    household::HID,
    Age, MSOA,
};

id_type!(
    /// Row index of the person table.
    PID
);
id_type!(
    /// Row index of an empirical role distribution.
    HRPID
);

/// Person row as produced by the upstream population synthesis, before the fine ethnicity
/// is reduced to the coarse scheme.
#[derive(Clone, Debug, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "PID")]
    pub pid: PID,
    #[serde(rename = "Area")]
    pub msoa: MSOA,
    #[serde(rename = "DC1117EW_C_SEX")]
    pub sex: Sex,
    #[serde(rename = "DC1117EW_C_AGE")]
    pub age: Age,
    #[serde(rename = "DC2101EW_C_ETHPUK11")]
    pub eth: i32,
    #[serde(rename = "HID", default)]
    pub hid: Option<HID>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = "PID")]
    pub pid: PID,
    #[serde(rename = "Area")]
    pub msoa: MSOA,
    #[serde(rename = "DC1117EW_C_SEX")]
    pub sex: Sex,
    #[serde(rename = "DC1117EW_C_AGE")]
    pub age: Age,
    #[serde(rename = "DC2101EW_C_ETHPUK11")]
    pub eth: Eth,
    #[serde(rename = "HID", default)]
    pub hid: Option<HID>,
}

impl Person {
    pub fn from_record(
        record: PersonRecord,
        mapping: &EthMapping,
    ) -> Result<Self, AssignmentError> {
        Ok(Self {
            pid: record.pid,
            msoa: record.msoa,
            sex: record.sex,
            age: record.age,
            eth: mapping.map(record.eth)?,
            hid: record.hid,
        })
    }

    pub fn profile(&self) -> Profile {
        Profile {
            age: self.age,
            sex: self.sex,
            eth: self.eth,
        }
    }

    pub fn band(&self, adult_age: Age) -> AgeBand {
        AgeBand::of(self.age, adult_age)
    }

    pub fn is_assigned(&self) -> bool {
        self.hid.is_some()
    }
}

/// Demographic target a sampled role resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Profile {
    pub age: Age,
    pub sex: Sex,
    pub eth: Eth,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "age: {}, sex: {}, eth: {}",
            self.age,
            self.sex.code(),
            self.eth.code()
        )
    }
}

/// Household reference person by household category.
#[derive(Clone, Debug, Deserialize)]
pub struct HRPerson {
    pub age: Age,
    pub sex: Sex,
    #[serde(rename = "ethhuk11")]
    pub eth: Eth,
    pub n: usize,
}

impl HRPerson {
    pub fn profile(&self) -> Profile {
        Profile {
            age: self.age,
            sex: self.sex,
            eth: self.eth,
        }
    }
}

/// Partner by HRP age and ethnicity.
#[derive(Clone, Debug, Deserialize)]
pub struct PartnerHRPerson {
    pub agehrp: Age,
    #[serde(rename = "ethhuk11")]
    pub eth: Eth,
    pub age: Age,
    #[serde(deserialize_with = "deserialize_flag")]
    pub samesex: bool,
    pub ethnicityew: Eth,
    pub n: usize,
}

impl PartnerHRPerson {
    /// Partner sex follows the HRP when `samesex`, otherwise the opposite sex.
    pub fn profile(&self, hrp_sex: Sex) -> Profile {
        Profile {
            age: self.age,
            sex: if self.samesex {
                hrp_sex
            } else {
                hrp_sex.opposite()
            },
            eth: self.ethnicityew,
        }
    }
}

/// Dependent child by HRP age and ethnicity.
#[derive(Clone, Debug, Deserialize)]
pub struct ChildHRPerson {
    pub agehrp: Age,
    #[serde(rename = "ethhuk11")]
    pub eth: Eth,
    pub age: Age,
    pub sex: Sex,
    pub ethnicityew: Eth,
    pub n: usize,
}

impl ChildHRPerson {
    pub fn profile(&self) -> Profile {
        Profile {
            age: self.age,
            sex: self.sex,
            eth: self.ethnicityew,
        }
    }
}

// R and pandas write booleans in several spellings.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = String::deserialize(deserializer)?;
    match value.trim() {
        "true" | "TRUE" | "True" | "1" => Ok(true),
        "false" | "FALSE" | "False" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
    }
}
