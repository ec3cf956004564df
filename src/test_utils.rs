//! In-memory builders shared by the unit tests.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use typed_index_collections::TiVec;

use crate::{
    codes::{Eth, HouseholdSize, HouseholdType, Sex},
    household::{Household, HID},
    lookup::AreaLookup,
    person::{ChildHRPerson, HRPerson, PartnerHRPerson, Person, PID},
    sampler::{Distributions, HrpCategory},
    Age, MSOA, OA,
};

lazy_static! {
    pub static ref ENV_LOGGER: () = {
        let _ = env_logger::builder().is_test(true).try_init();
    };
}

pub fn person(pid: usize, msoa: &str, age: u32, sex: Sex, eth: Eth) -> Person {
    Person {
        pid: PID(pid),
        msoa: MSOA::from(msoa),
        sex,
        age: Age(age),
        eth,
        hid: None,
    }
}

pub fn household(hid: usize, oa: &str, htype: HouseholdType, size: HouseholdSize) -> Household {
    Household {
        hid: HID(hid),
        oa: OA::from(oa),
        htype,
        size,
        communal_type: -1,
        communal_size: -1,
        hrpid: None,
        filled: false,
    }
}

pub fn communal(hid: usize, oa: &str, cell: i32, size: i32) -> Household {
    Household {
        communal_type: cell,
        communal_size: size,
        ..household(hid, oa, HouseholdType::Unoccupied, HouseholdSize::NotApplicable)
    }
}

pub fn lookup(pairs: &[(&str, &str)]) -> AreaLookup {
    pairs
        .iter()
        .map(|(oa, msoa)| (OA::from(*oa), MSOA::from(*msoa)))
        .collect()
}

pub fn hrp(age: u32, sex: Sex, eth: Eth, n: usize) -> HRPerson {
    HRPerson {
        age: Age(age),
        sex,
        eth,
        n,
    }
}

pub fn partner(
    agehrp: u32,
    eth: Eth,
    age: u32,
    samesex: bool,
    ethnicityew: Eth,
    n: usize,
) -> PartnerHRPerson {
    PartnerHRPerson {
        agehrp: Age(agehrp),
        eth,
        age: Age(age),
        samesex,
        ethnicityew,
        n,
    }
}

pub fn child(
    agehrp: u32,
    eth: Eth,
    age: u32,
    sex: Sex,
    ethnicityew: Eth,
    n: usize,
) -> ChildHRPerson {
    ChildHRPerson {
        agehrp: Age(agehrp),
        eth,
        age: Age(age),
        sex,
        ethnicityew,
        n,
    }
}

/// Distributions whose HRP tables hold one row per category.
pub fn distributions(
    single: HRPerson,
    couple: HRPerson,
    single_parent: HRPerson,
    mixed: HRPerson,
    partners: Vec<PartnerHRPerson>,
    children: Vec<ChildHRPerson>,
) -> Distributions {
    let hrp = BTreeMap::from([
        (HrpCategory::Single, TiVec::from(vec![single])),
        (HrpCategory::Couple, TiVec::from(vec![couple])),
        (HrpCategory::SingleParent, TiVec::from(vec![single_parent])),
        (HrpCategory::Mixed, TiVec::from(vec![mixed])),
    ]);
    Distributions::new(hrp, TiVec::from(partners), TiVec::from(children))
}
