//! Resolution of a sampled profile to a concrete unassigned person.
//!
//! Persons are indexed once, in table order, by exact profile, by (band, sex) and by band
//! alone. Assigned persons are skipped lazily when a queue is read, so the indices never
//! have to be rebuilt as the store changes.

use std::{collections::BTreeMap, fmt};

use hashbrown::HashMap;
use log::debug;
use typed_index_collections::TiVec;

use crate::{
    codes::{AgeBand, Eth, Sex},
    error::AssignmentError,
    household::HID,
    person::{Person, Profile, PID},
    store::Store,
    Age, MSOA,
};

/// Persons sharing a key, in table order, read from the first unassigned one.
#[derive(Clone, Debug, Default)]
struct Cursor {
    pids: Vec<PID>,
    head: usize,
}

impl Cursor {
    fn peek(&mut self, p_data: &TiVec<PID, Person>) -> Option<PID> {
        while let Some(&pid) = self.pids.get(self.head) {
            if !p_data[pid].is_assigned() {
                return Some(pid);
            }
            self.head += 1;
        }
        None
    }
}

/// Earliest unassigned person at the age closest to `target`.
fn closest(
    by_age: &mut BTreeMap<Age, Cursor>,
    target: Age,
    p_data: &TiVec<PID, Person>,
) -> Option<PID> {
    by_age
        .iter_mut()
        .filter_map(|(age, cursor)| Some((age.distance(target), cursor.peek(p_data)?)))
        .min()
        .map(|(_, pid)| pid)
}

/// Step of the relaxation ladder that produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRung {
    Exact,
    RelaxedEth,
    RelaxedSex,
}

impl fmt::Display for MatchRung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRung::Exact => write!(f, "exact"),
            MatchRung::RelaxedEth => write!(f, "relaxed eth"),
            MatchRung::RelaxedSex => write!(f, "relaxed sex"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub pid: PID,
    pub rung: MatchRung,
}

#[derive(Clone, Debug)]
pub struct Queues {
    adult_age: Age,
    exact: HashMap<(MSOA, Age, Sex, Eth), Cursor>,
    by_sex: HashMap<(MSOA, AgeBand, Sex), BTreeMap<Age, Cursor>>,
    by_band: HashMap<(MSOA, AgeBand), BTreeMap<Age, Cursor>>,
}

impl Queues {
    pub fn new(store: &Store, adult_age: Age) -> Self {
        let mut queues = Self {
            adult_age,
            exact: HashMap::new(),
            by_sex: HashMap::new(),
            by_band: HashMap::new(),
        };
        for person in store.p_data.iter().filter(|person| !person.is_assigned()) {
            let band = person.band(adult_age);
            queues
                .exact
                .entry((person.msoa.clone(), person.age, person.sex, person.eth))
                .or_default()
                .pids
                .push(person.pid);
            queues
                .by_sex
                .entry((person.msoa.clone(), band, person.sex))
                .or_default()
                .entry(person.age)
                .or_default()
                .pids
                .push(person.pid);
            queues
                .by_band
                .entry((person.msoa.clone(), band))
                .or_default()
                .entry(person.age)
                .or_default()
                .pids
                .push(person.pid);
        }
        queues
    }

    /// Walks the ladder for `profile` among the unassigned persons of `msoa` in `band`.
    ///
    /// 1. exact age, sex and ethnicity, first in table order;
    /// 2. same sex, closest age, ties by table order;
    /// 3. any sex, closest age, ties by table order.
    pub fn find(
        &mut self,
        p_data: &TiVec<PID, Person>,
        msoa: &MSOA,
        profile: &Profile,
        band: AgeBand,
    ) -> Option<Match> {
        if AgeBand::of(profile.age, self.adult_age) == band {
            if let Some(pid) = self
                .exact
                .get_mut(&(msoa.clone(), profile.age, profile.sex, profile.eth))
                .and_then(|cursor| cursor.peek(p_data))
            {
                return Some(Match {
                    pid,
                    rung: MatchRung::Exact,
                });
            }
        }
        if let Some(pid) = self
            .by_sex
            .get_mut(&(msoa.clone(), band, profile.sex))
            .and_then(|by_age| closest(by_age, profile.age, p_data))
        {
            return Some(Match {
                pid,
                rung: MatchRung::RelaxedEth,
            });
        }
        self.by_band
            .get_mut(&(msoa.clone(), band))
            .and_then(|by_age| closest(by_age, profile.age, p_data))
            .map(|pid| Match {
                pid,
                rung: MatchRung::RelaxedSex,
            })
    }

    /// Finds a person for `profile` and assigns them to `hid` in the same step.
    pub fn claim(
        &mut self,
        store: &mut Store,
        msoa: &MSOA,
        profile: &Profile,
        band: AgeBand,
        hid: HID,
    ) -> Result<Option<Match>, AssignmentError> {
        let Some(matched) = self.find(&store.p_data, msoa, profile, band) else {
            return Ok(None);
        };
        store.assign(matched.pid, hid)?;
        debug!("{} -> {hid} ({}) for {profile}", matched.pid, matched.rung);
        Ok(Some(matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codes::{HouseholdSize, HouseholdType},
        test_utils::{household, person},
        ADULT_AGE,
    };

    fn profile(age: u32, sex: Sex, eth: Eth) -> Profile {
        Profile {
            age: Age(age),
            sex,
            eth,
        }
    }

    fn store() -> Store {
        Store::new(
            TiVec::from(vec![
                person(0, "M1", 30, Sex::Male, Eth::WhiteBritish),
                person(1, "M1", 33, Sex::Male, Eth::Asian),
                person(2, "M1", 29, Sex::Female, Eth::Asian),
                person(3, "M1", 31, Sex::Female, Eth::WhiteBritish),
                person(4, "M1", 10, Sex::Male, Eth::WhiteBritish),
                person(5, "M2", 30, Sex::Male, Eth::WhiteBritish),
            ]),
            TiVec::from(vec![household(
                0,
                "O1",
                HouseholdType::MultiPerson,
                HouseholdSize::FourOrMore,
            )]),
        )
        .unwrap()
    }

    #[test]
    fn test_relaxation_ladder() {
        let mut store = store();
        let mut queues = Queues::new(&store, ADULT_AGE);
        let m1 = MSOA::from("M1");
        let target = profile(30, Sex::Male, Eth::WhiteBritish);
        let mut claim = |store: &mut Store| {
            queues
                .claim(store, &m1, &target, AgeBand::Adult, HID(0))
                .unwrap()
        };

        assert_eq!(
            claim(&mut store),
            Some(Match {
                pid: PID(0),
                rung: MatchRung::Exact
            })
        );
        assert_eq!(
            claim(&mut store),
            Some(Match {
                pid: PID(1),
                rung: MatchRung::RelaxedEth
            })
        );
        // Ages 29 and 31 are equally close: table order decides.
        assert_eq!(
            claim(&mut store),
            Some(Match {
                pid: PID(2),
                rung: MatchRung::RelaxedSex
            })
        );
        assert_eq!(
            claim(&mut store),
            Some(Match {
                pid: PID(3),
                rung: MatchRung::RelaxedSex
            })
        );
        // The child and the person in M2 are never eligible.
        assert_eq!(claim(&mut store), None);
        assert!(!store.is_assigned(PID(4)));
        assert!(!store.is_assigned(PID(5)));
    }

    #[test]
    fn test_child_band() {
        let mut store = store();
        let mut queues = Queues::new(&store, ADULT_AGE);
        let m1 = MSOA::from("M1");
        let matched = queues
            .claim(
                &mut store,
                &m1,
                &profile(5, Sex::Female, Eth::Black),
                AgeBand::Child,
                HID(0),
            )
            .unwrap();
        assert_eq!(
            matched,
            Some(Match {
                pid: PID(4),
                rung: MatchRung::RelaxedSex
            })
        );
        assert_eq!(store.p_data[PID(4)].hid, Some(HID(0)));
    }

    #[test]
    fn test_never_returns_assigned() {
        let mut store = store();
        let mut queues = Queues::new(&store, ADULT_AGE);
        store.assign(PID(0), HID(0)).unwrap();
        let matched = queues
            .find(
                &store.p_data,
                &"M1".into(),
                &profile(30, Sex::Male, Eth::WhiteBritish),
                AgeBand::Adult,
            )
            .unwrap();
        assert_eq!(matched.pid, PID(1));
        assert_eq!(matched.rung, MatchRung::RelaxedEth);
    }

    #[test]
    fn test_exact_requires_band() {
        let mut store = store();
        let mut queues = Queues::new(&store, ADULT_AGE);
        // A 30 year old target in the child band falls through to the closest child.
        let matched = queues
            .claim(
                &mut store,
                &"M1".into(),
                &profile(30, Sex::Male, Eth::WhiteBritish),
                AgeBand::Child,
                HID(0),
            )
            .unwrap()
            .unwrap();
        assert_eq!(matched.pid, PID(4));
        assert_eq!(matched.rung, MatchRung::RelaxedEth);
    }
}
