//! Person and household tables with their mutable assignment state.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use typed_index_collections::TiVec;

use crate::{
    error::AssignmentError,
    household::{Household, HID},
    person::{Person, PID},
    MSOA, OA,
};

#[derive(Clone, Debug)]
pub struct Store {
    pub p_data: TiVec<PID, Person>,
    pub h_data: TiVec<HID, Household>,
    people_by_msoa: BTreeMap<MSOA, Vec<PID>>,
    households_by_oa: BTreeMap<OA, Vec<HID>>,
}

impl Store {
    /// Indexes both tables by area. Ids must equal row positions.
    pub fn new(
        p_data: TiVec<PID, Person>,
        h_data: TiVec<HID, Household>,
    ) -> Result<Self, AssignmentError> {
        let mut people_by_msoa: BTreeMap<MSOA, Vec<PID>> = BTreeMap::new();
        for (pid, person) in p_data.iter_enumerated() {
            if person.pid != pid {
                return Err(AssignmentError::IdMismatch {
                    table: "person",
                    row: pid.0,
                    id: person.pid.0,
                });
            }
            people_by_msoa
                .entry(person.msoa.clone())
                .or_default()
                .push(pid);
        }
        let mut households_by_oa: BTreeMap<OA, Vec<HID>> = BTreeMap::new();
        for (hid, household) in h_data.iter_enumerated() {
            if household.hid != hid {
                return Err(AssignmentError::IdMismatch {
                    table: "household",
                    row: hid.0,
                    id: household.hid.0,
                });
            }
            households_by_oa
                .entry(household.oa.clone())
                .or_default()
                .push(hid);
        }
        Ok(Self {
            p_data,
            h_data,
            people_by_msoa,
            households_by_oa,
        })
    }

    /// MSOAs with at least one person, in sorted order.
    pub fn msoas(&self) -> impl Iterator<Item = &MSOA> {
        self.people_by_msoa.keys()
    }

    /// Everyone living in `msoa`, in table order.
    pub fn people_in(&self, msoa: &MSOA) -> &[PID] {
        self.people_by_msoa
            .get(msoa)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every household located in one of `oas`, in table order.
    pub fn households_in(&self, oas: &BTreeSet<OA>) -> Vec<HID> {
        let mut hids: Vec<HID> = oas
            .iter()
            .filter_map(|oa| self.households_by_oa.get(oa))
            .flatten()
            .copied()
            .collect();
        hids.sort_unstable();
        hids
    }

    pub fn is_assigned(&self, pid: PID) -> bool {
        self.p_data.get(pid).is_some_and(Person::is_assigned)
    }

    /// Sets the person's household. A person is assigned at most once.
    pub fn assign(&mut self, pid: PID, hid: HID) -> Result<(), AssignmentError> {
        if self.h_data.get(hid).is_none() {
            return Err(AssignmentError::UnknownHousehold(hid));
        }
        let person = self
            .p_data
            .get_mut(pid)
            .ok_or(AssignmentError::UnknownPerson(pid))?;
        if let Some(existing) = person.hid {
            return Err(AssignmentError::AlreadyAssigned { pid, hid: existing });
        }
        person.hid = Some(hid);
        Ok(())
    }

    /// Records an occupant of `hid` as its reference person. Set at most once.
    pub fn set_hrp(&mut self, hid: HID, pid: PID) -> Result<(), AssignmentError> {
        let occupant_of = self
            .p_data
            .get(pid)
            .ok_or(AssignmentError::UnknownPerson(pid))?
            .hid;
        if occupant_of != Some(hid) {
            return Err(AssignmentError::NotAnOccupant { pid, hid });
        }
        let household = self
            .h_data
            .get_mut(hid)
            .ok_or(AssignmentError::UnknownHousehold(hid))?;
        if let Some(existing) = household.hrpid {
            return Err(AssignmentError::HrpAlreadySet { hid, pid: existing });
        }
        household.hrpid = Some(pid);
        Ok(())
    }

    pub fn mark_filled(&mut self, hid: HID) {
        if let Some(household) = self.h_data.get_mut(hid) {
            household.filled = true;
        }
    }

    /// Occupants of every household with at least one, in table order.
    pub fn occupants(&self) -> BTreeMap<HID, Vec<PID>> {
        let mut occupants: BTreeMap<HID, Vec<PID>> = BTreeMap::new();
        for person in self.p_data.iter() {
            if let Some(hid) = person.hid {
                occupants.entry(hid).or_default().push(person.pid);
            }
        }
        occupants
    }

    pub fn info_stats(&self) {
        let assigned_people = self.p_data.iter().filter(|p| p.is_assigned()).count();
        let occupied = self.h_data.iter().filter(|h| h.is_occupied()).count();
        let filled = self
            .h_data
            .iter()
            .filter(|h| h.is_occupied() && h.filled)
            .count();
        let unoccupied = self
            .h_data
            .iter()
            .filter(|h| !h.htype.is_occupied())
            .count();
        debug!(
            "{0:25}: {1:6} ({2:3.2}%)",
            "People",
            assigned_people,
            percent(assigned_people, self.p_data.len())
        );
        debug!(
            "{0:25}: {1:6}",
            "Remaining people",
            self.p_data.len() - assigned_people
        );
        debug!(
            "{0:25}: {1:6} ({2:3.2}%)",
            "Households",
            filled,
            percent(filled, occupied)
        );
        debug!(
            "{0:25}: {1:6} (+{2:6})",
            "Remaining households",
            occupied - filled,
            unoccupied
        );
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.
    } else {
        100. * part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codes::{Eth, HouseholdSize, HouseholdType, Sex},
        test_utils::{household, person},
    };

    fn store() -> Store {
        Store::new(
            TiVec::from(vec![
                person(0, "M1", 40, Sex::Male, Eth::WhiteBritish),
                person(1, "M2", 30, Sex::Female, Eth::Asian),
                person(2, "M1", 10, Sex::Female, Eth::WhiteBritish),
            ]),
            TiVec::from(vec![
                household(0, "O2", HouseholdType::SingleOccupant, HouseholdSize::One),
                household(1, "O1", HouseholdType::LoneParent, HouseholdSize::Two),
                household(2, "O3", HouseholdType::SingleOccupant, HouseholdSize::One),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_area_indices() {
        let store = store();
        assert_eq!(
            store.msoas().cloned().collect::<Vec<_>>(),
            vec![MSOA::from("M1"), MSOA::from("M2")]
        );
        assert_eq!(store.people_in(&"M1".into()), &[PID(0), PID(2)]);
        assert!(store.people_in(&"M9".into()).is_empty());
        let oas = BTreeSet::from([OA::from("O1"), OA::from("O2")]);
        assert_eq!(store.households_in(&oas), vec![HID(0), HID(1)]);
    }

    #[test]
    fn test_id_mismatch() {
        let err = Store::new(
            TiVec::from(vec![person(1, "M1", 40, Sex::Male, Eth::WhiteBritish)]),
            TiVec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::IdMismatch {
                table: "person",
                row: 0,
                id: 1
            }
        ));
    }

    #[test]
    fn test_single_assignment() {
        let mut store = store();
        store.assign(PID(0), HID(1)).unwrap();
        assert!(store.is_assigned(PID(0)));
        let err = store.assign(PID(0), HID(0)).unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::AlreadyAssigned {
                pid: PID(0),
                hid: HID(1)
            }
        ));
        assert_eq!(store.p_data[PID(0)].hid, Some(HID(1)));
        assert!(store.assign(PID(7), HID(0)).is_err());
        assert!(store.assign(PID(1), HID(7)).is_err());
    }

    #[test]
    fn test_set_hrp_once() {
        let mut store = store();
        assert!(matches!(
            store.set_hrp(HID(1), PID(0)),
            Err(AssignmentError::NotAnOccupant { .. })
        ));
        store.assign(PID(0), HID(1)).unwrap();
        store.assign(PID(2), HID(1)).unwrap();
        store.set_hrp(HID(1), PID(0)).unwrap();
        assert!(matches!(
            store.set_hrp(HID(1), PID(2)),
            Err(AssignmentError::HrpAlreadySet { pid: PID(0), .. })
        ));
        assert_eq!(store.h_data[HID(1)].hrpid, Some(PID(0)));
        assert_eq!(store.occupants()[&HID(1)], vec![PID(0), PID(2)]);
    }

    #[test]
    fn test_mark_filled() {
        let mut store = store();
        store.mark_filled(HID(2));
        store.mark_filled(HID(2));
        assert!(store.h_data[HID(2)].filled);
        assert!(!store.h_data[HID(0)].filled);
    }
}
