//! Eligibility queries over the live store. Every call re-reads the current assignment
//! state; nothing is cached between calls.

use std::{collections::BTreeSet, ops::RangeInclusive};

use crate::{
    codes::{Eth, HouseholdSize, HouseholdType, Sex},
    household::{Household, HID},
    person::{Person, PID},
    store::Store,
    Age, MSOA, OA,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate<T> {
    Any,
    Eq(T),
    In(Vec<T>),
    Range(RangeInclusive<T>),
}

impl<T> Default for Predicate<T> {
    fn default() -> Self {
        Predicate::Any
    }
}

impl<T: PartialOrd> Predicate<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Eq(expected) => expected == value,
            Predicate::In(values) => values.contains(value),
            Predicate::Range(range) => range.contains(value),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PersonQuery {
    pub age: Predicate<Age>,
    pub sex: Predicate<Sex>,
    pub eth: Predicate<Eth>,
    pub unassigned: bool,
}

impl PersonQuery {
    pub fn unassigned() -> Self {
        Self {
            unassigned: true,
            ..Default::default()
        }
    }

    pub fn ages(mut self, ages: RangeInclusive<Age>) -> Self {
        self.age = Predicate::Range(ages);
        self
    }

    pub fn sex(mut self, sex: Sex) -> Self {
        self.sex = Predicate::Eq(sex);
        self
    }

    pub fn eth(mut self, eth: Eth) -> Self {
        self.eth = Predicate::Eq(eth);
        self
    }

    pub fn matches(&self, person: &Person) -> bool {
        (!self.unassigned || !person.is_assigned())
            && self.age.matches(&person.age)
            && self.sex.matches(&person.sex)
            && self.eth.matches(&person.eth)
    }

    /// Matching persons of `msoa`, in table order.
    pub fn select(&self, store: &Store, msoa: &MSOA) -> Vec<PID> {
        store
            .people_in(msoa)
            .iter()
            .copied()
            .filter(|&pid| self.matches(&store.p_data[pid]))
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct HouseholdQuery {
    pub htype: Predicate<HouseholdType>,
    pub size: Predicate<HouseholdSize>,
    /// `Some(true)` for communal establishments only, `Some(false)` to exclude them.
    pub communal: Option<bool>,
    pub unfilled: bool,
    pub without_hrp: bool,
}

impl HouseholdQuery {
    /// Private households expecting a reference person.
    pub fn occupied() -> Self {
        Self::default()
            .htypes(&HouseholdType::OCCUPIED)
            .communal(false)
    }

    pub fn htype(mut self, htype: HouseholdType) -> Self {
        self.htype = Predicate::Eq(htype);
        self
    }

    pub fn htypes(mut self, htypes: &[HouseholdType]) -> Self {
        self.htype = Predicate::In(htypes.to_vec());
        self
    }

    pub fn size(mut self, size: Predicate<HouseholdSize>) -> Self {
        self.size = size;
        self
    }

    pub fn communal(mut self, communal: bool) -> Self {
        self.communal = Some(communal);
        self
    }

    pub fn unfilled(mut self) -> Self {
        self.unfilled = true;
        self
    }

    pub fn without_hrp(mut self) -> Self {
        self.without_hrp = true;
        self
    }

    pub fn matches(&self, household: &Household) -> bool {
        self.htype.matches(&household.htype)
            && self.size.matches(&household.size)
            && self
                .communal
                .map_or(true, |communal| household.is_communal() == communal)
            && (!self.unfilled || !household.filled)
            && (!self.without_hrp || household.hrpid.is_none())
    }

    /// Matching households located in `oas`, in table order.
    pub fn select(&self, store: &Store, oas: &BTreeSet<OA>) -> Vec<HID> {
        store
            .households_in(oas)
            .into_iter()
            .filter(|&hid| self.matches(&store.h_data[hid]))
            .collect()
    }

    /// Matching households anywhere in the region, whatever their area.
    pub fn select_all(&self, store: &Store) -> Vec<HID> {
        store
            .h_data
            .iter()
            .filter(|household| self.matches(household))
            .map(|household| household.hid)
            .collect()
    }
}
