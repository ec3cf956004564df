//! Post-run consistency counts.

use std::{collections::BTreeMap, fmt};

use log::info;

use crate::{
    codes::{AgeBand, HouseholdSize, HouseholdType},
    store::Store,
    Age, MSOA,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Communal,
    Hrp,
    Partner,
    SingleParentChild,
    CoupleChild,
    MultiPerson,
    SurplusAdults,
    SurplusChildren,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Communal => "communal",
            Stage::Hrp => "HRP",
            Stage::Partner => "partner",
            Stage::SingleParentChild => "single-parent child",
            Stage::CoupleChild => "couple child",
            Stage::MultiPerson => "multi-person",
            Stage::SurplusAdults => "surplus adults",
            Stage::SurplusChildren => "surplus children",
        };
        write!(f, "{name}")
    }
}

/// A recoverable shortfall recorded in relaxed mode.
#[derive(Clone, Debug, PartialEq)]
pub struct Shortfall {
    pub stage: Stage,
    pub msoa: MSOA,
    pub detail: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub occupied_without_hrp: usize,
    pub occupied_unfilled: usize,
    pub occupied_total: usize,
    pub communal_unfilled: usize,
    pub unfilled_by_type_size: BTreeMap<(HouseholdType, HouseholdSize), usize>,
    pub adults_unassigned: usize,
    pub adults_total: usize,
    pub children_unassigned: usize,
    pub children_total: usize,
    pub shortfalls_by_stage: BTreeMap<Stage, usize>,
}

impl Report {
    pub fn new(store: &Store, shortfalls: &[Shortfall], adult_age: Age) -> Self {
        let mut report = Report::default();
        for household in store.h_data.iter() {
            if household.is_communal() {
                report.communal_unfilled += usize::from(!household.filled);
            } else if household.is_occupied() {
                report.occupied_total += 1;
                report.occupied_without_hrp += usize::from(household.hrpid.is_none());
                if !household.filled {
                    report.occupied_unfilled += 1;
                    *report
                        .unfilled_by_type_size
                        .entry((household.htype, household.size))
                        .or_default() += 1;
                }
            }
        }
        for person in store.p_data.iter() {
            let unassigned = usize::from(!person.is_assigned());
            match person.band(adult_age) {
                AgeBand::Adult => {
                    report.adults_total += 1;
                    report.adults_unassigned += unassigned;
                }
                AgeBand::Child => {
                    report.children_total += 1;
                    report.children_unassigned += unassigned;
                }
            }
        }
        for shortfall in shortfalls {
            *report
                .shortfalls_by_stage
                .entry(shortfall.stage)
                .or_default() += 1;
        }
        report
    }

    /// Unfilled households of the given types whose size lies in `sizes`.
    pub fn unfilled(&self, htypes: &[HouseholdType], sizes: &[HouseholdSize]) -> usize {
        self.unfilled_by_type_size
            .iter()
            .filter(|((htype, size), _)| htypes.contains(htype) && sizes.contains(size))
            .map(|(_, count)| count)
            .sum()
    }

    pub fn log(&self) {
        use HouseholdSize::*;
        let single_parent = [HouseholdType::LoneParent];
        let multi = [HouseholdType::MultiPerson];

        info!("---");
        info!("Checking...");
        info!("---");
        info!(
            "Occupied households without HRP: {}",
            self.occupied_without_hrp
        );
        info!(
            "Occupied households not filled: {} of {}",
            self.occupied_unfilled, self.occupied_total
        );
        info!("Communal residences not filled: {}", self.communal_unfilled);
        info!(
            "Single-occupant households not filled: {}",
            self.unfilled(&[HouseholdType::SingleOccupant], &[One])
        );
        info!(
            "Single-parent one-child households not filled: {}",
            self.unfilled(&single_parent, &[Two])
        );
        info!(
            "Single-parent two-child households not filled: {}",
            self.unfilled(&single_parent, &[Three])
        );
        info!(
            "Single-parent 3+ households not filled: {}",
            self.unfilled(&single_parent, &[FourOrMore])
        );
        info!(
            "Couple households with no children not filled: {}",
            self.unfilled(&HouseholdType::COUPLES, &[Two])
        );
        info!(
            "Couple households with one child not filled: {}",
            self.unfilled(&HouseholdType::COUPLES, &[Three])
        );
        info!(
            "Couple households with 2+ children not filled: {}",
            self.unfilled(&HouseholdType::COUPLES, &[FourOrMore])
        );
        info!(
            "Mixed (2,3) households not filled: {}",
            self.unfilled(&multi, &[Two, Three])
        );
        info!(
            "Mixed (4+) households not filled: {}",
            self.unfilled(&multi, &[FourOrMore])
        );
        info!(
            "Adults not assigned {} of {}",
            self.adults_unassigned, self.adults_total
        );
        info!(
            "Children not assigned {} of {}",
            self.children_unassigned, self.children_total
        );
        for (stage, count) in self.shortfalls_by_stage.iter() {
            info!("Shortfalls in {stage}: {count}");
        }
    }
}
