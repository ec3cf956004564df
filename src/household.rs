use serde::{Deserialize, Serialize};

use crate::{
    codes::{CommunalBand, HouseholdSize, HouseholdType},
    person::PID,
    OA,
};

id_type!(
    /// Row index of the household table.
    HID
);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Household {
    #[serde(rename = "HID")]
    pub hid: HID,
    #[serde(rename = "Area")]
    pub oa: OA,
    #[serde(rename = "LC4408_C_AHTHUK11")]
    pub htype: HouseholdType,
    #[serde(rename = "LC4404_C_SIZHUK11")]
    pub size: HouseholdSize,
    /// QS420EW communal establishment cell, -1 when not communal.
    #[serde(rename = "QS420_CELL")]
    pub communal_type: i32,
    #[serde(rename = "CommunalSize")]
    pub communal_size: i32,
    #[serde(rename = "HRPID", default)]
    pub hrpid: Option<PID>,
    #[serde(rename = "FILLED", default)]
    pub filled: bool,
}

impl Household {
    pub fn communal_band(&self) -> Option<CommunalBand> {
        CommunalBand::of(self.communal_type)
    }

    pub fn is_communal(&self) -> bool {
        self.communal_band().is_some()
    }

    /// A private household that needs a reference person.
    pub fn is_occupied(&self) -> bool {
        self.htype.is_occupied() && !self.is_communal()
    }

    /// Declared communal occupancy; negative sentinels count as empty.
    pub fn communal_occupancy(&self) -> usize {
        usize::try_from(self.communal_size).unwrap_or(0)
    }
}
