//! Closed enumerations for the census categorical codes used by the person, household and
//! distribution tables, each with an explicit code <-> label table.

use std::{fmt, ops::RangeInclusive};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{error::AssignmentError, Age};

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $code:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = AssignmentError;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    code => Err(AssignmentError::InvalidCode {
                        category: stringify!($name),
                        code,
                    }),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.label(), self.code())
            }
        }
    };
}

coded_enum! {
    /// DC1117EW_C_SEX
    pub enum Sex {
        Male = 1 => "Male",
        Female = 2 => "Female",
    }
}

impl Sex {
    pub fn opposite(self) -> Sex {
        match self {
            Sex::Male => Sex::Female,
            Sex::Female => Sex::Male,
        }
    }
}

coded_enum! {
    /// Coarse ethnicity shared by the household table (LC4202EW_C_ETHHUK11) and the
    /// microdata distributions.
    pub enum Eth {
        NotStated = 1 => "All categories / not stated",
        WhiteBritish = 2 => "White: English/Welsh/Scottish/Northern Irish/British",
        WhiteIrish = 3 => "White: Irish",
        WhiteOther = 4 => "White: Other White",
        Mixed = 5 => "Mixed/multiple ethnic group",
        Asian = 6 => "Asian/Asian British",
        Black = 7 => "Black/African/Caribbean/Black British",
        Other = 8 => "Other ethnic group",
    }
}

coded_enum! {
    /// LC4408_C_AHTHUK11
    pub enum HouseholdType {
        Unoccupied = -1 => "Unoccupied or communal",
        SingleOccupant = 1 => "One person household",
        MarriedCouple = 2 => "Married or same-sex civil partnership couple household",
        CohabitingCouple = 3 => "Cohabiting couple household",
        LoneParent = 4 => "Lone parent household",
        MultiPerson = 5 => "Multi-person household",
    }
}

impl HouseholdType {
    pub const COUPLES: [HouseholdType; 2] =
        [HouseholdType::MarriedCouple, HouseholdType::CohabitingCouple];
    pub const OCCUPIED: [HouseholdType; 5] = [
        HouseholdType::SingleOccupant,
        HouseholdType::MarriedCouple,
        HouseholdType::CohabitingCouple,
        HouseholdType::LoneParent,
        HouseholdType::MultiPerson,
    ];
    /// Household types that can take surplus children.
    pub const WITH_CHILDREN: [HouseholdType; 4] = [
        HouseholdType::MarriedCouple,
        HouseholdType::CohabitingCouple,
        HouseholdType::LoneParent,
        HouseholdType::MultiPerson,
    ];

    pub fn is_occupied(self) -> bool {
        self != HouseholdType::Unoccupied
    }
}

coded_enum! {
    /// LC4404EW_C_SIZHUK11
    pub enum HouseholdSize {
        NotApplicable = -1 => "Not applicable",
        One = 1 => "1 person in household",
        Two = 2 => "2 people in household",
        Three = 3 => "3 people in household",
        FourOrMore = 4 => "4 or more people in household",
    }
}

/// Coarse age band used to keep children and adults apart when matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBand {
    Child,
    Adult,
}

impl AgeBand {
    pub fn of(age: Age, adult_age: Age) -> AgeBand {
        if age > adult_age {
            AgeBand::Adult
        } else {
            AgeBand::Child
        }
    }

    pub fn ages(self, adult_age: Age) -> RangeInclusive<Age> {
        match self {
            AgeBand::Child => Age::MIN..=adult_age,
            AgeBand::Adult => Age(adult_age.0 + 1)..=Age::MAX,
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeBand::Child => write!(f, "child"),
            AgeBand::Adult => write!(f, "adult"),
        }
    }
}

/// Age pool a communal establishment (QS420EW cell) is filled from.
///
/// Cells 2, 6, 11 and 14 are medical and care establishments, 22 to 26 defence, prison,
/// probation, detention and education, 27 and over hotels, hostels and the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommunalBand {
    ElderlyCare,
    YoungAdult,
    GeneralAdult,
}

impl CommunalBand {
    /// `None` for the "not communal" sentinel.
    pub fn of(cell: i32) -> Option<CommunalBand> {
        match cell {
            cell if cell < 0 => None,
            cell if cell < 22 => Some(CommunalBand::ElderlyCare),
            cell if cell < 27 => Some(CommunalBand::YoungAdult),
            _ => Some(CommunalBand::GeneralAdult),
        }
    }

    pub fn ages(self, adult_age: Age) -> RangeInclusive<Age> {
        match self {
            CommunalBand::ElderlyCare => Age(76)..=Age::MAX,
            CommunalBand::YoungAdult => Age(19)..=Age(25),
            CommunalBand::GeneralAdult => AgeBand::Adult.ages(adult_age),
        }
    }
}

impl fmt::Display for CommunalBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommunalBand::ElderlyCare => write!(f, "elderly care"),
            CommunalBand::YoungAdult => write!(f, "young adult"),
            CommunalBand::GeneralAdult => write!(f, "general adult"),
        }
    }
}

// DC2101EW_C_ETHPUK11 -> coarse
const ENGLAND_WALES_ETH: [(i32, Eth); 19] = [
    (-1, Eth::NotStated),
    (2, Eth::WhiteBritish),
    (3, Eth::WhiteIrish),
    (4, Eth::WhiteOther),
    (5, Eth::WhiteOther),
    (7, Eth::Mixed),
    (8, Eth::Mixed),
    (9, Eth::Mixed),
    (10, Eth::Mixed),
    (12, Eth::Asian),
    (13, Eth::Asian),
    (14, Eth::Asian),
    (15, Eth::Asian),
    (16, Eth::Asian),
    (18, Eth::Black),
    (19, Eth::Black),
    (20, Eth::Black),
    (22, Eth::Other),
    (23, Eth::Other),
];

// Scottish census ethnicity -> coarse
const SCOTLAND_ETH: [(i32, Eth); 7] = [
    (-1, Eth::WhiteBritish),
    (1, Eth::WhiteBritish),
    (8, Eth::WhiteIrish),
    (9, Eth::WhiteOther),
    (15, Eth::Mixed),
    (18, Eth::Asian),
    (22, Eth::Other),
];

/// Fixed many-to-one mapping from the fine person ethnicity scheme to [`Eth`].
#[derive(Clone, Debug)]
pub struct EthMapping(HashMap<i32, Eth>);

impl EthMapping {
    pub fn england_wales() -> Self {
        Self(ENGLAND_WALES_ETH.into_iter().collect())
    }

    pub fn scotland() -> Self {
        Self(SCOTLAND_ETH.into_iter().collect())
    }

    /// Scottish LAD codes start with 'S'.
    pub fn for_region(region: &str) -> Self {
        if region.starts_with('S') {
            Self::scotland()
        } else {
            Self::england_wales()
        }
    }

    pub fn map(&self, fine: i32) -> Result<Eth, AssignmentError> {
        self.0
            .get(&fine)
            .copied()
            .ok_or(AssignmentError::InvalidCode {
                category: "fine ethnicity",
                code: fine,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ADULT_AGE;

    #[test]
    fn test_codes_round_trip() {
        for htype in HouseholdType::ALL {
            assert_eq!(HouseholdType::try_from(htype.code()).unwrap(), *htype);
        }
        for eth in Eth::ALL {
            assert_eq!(Eth::try_from(i32::from(*eth)).unwrap(), *eth);
        }
        assert_eq!(HouseholdSize::try_from(-1).unwrap(), HouseholdSize::NotApplicable);
        assert_eq!(Sex::try_from(2).unwrap().label(), "Female");
    }

    #[test]
    fn test_invalid_code() {
        let err = HouseholdType::try_from(6).unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::InvalidCode {
                category: "HouseholdType",
                code: 6
            }
        ));
        assert!(Eth::try_from(0).is_err());
        assert!(Sex::try_from(3).is_err());
    }

    #[test]
    fn test_opposite_sex() {
        assert_eq!(Sex::Male.opposite(), Sex::Female);
        assert_eq!(Sex::Female.opposite(), Sex::Male);
    }

    #[test]
    fn test_size_ordering() {
        let three_plus = HouseholdSize::Three..=HouseholdSize::FourOrMore;
        assert!(three_plus.contains(&HouseholdSize::FourOrMore));
        assert!(!three_plus.contains(&HouseholdSize::Two));
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(AgeBand::of(Age(16), ADULT_AGE), AgeBand::Child);
        assert_eq!(AgeBand::of(Age(17), ADULT_AGE), AgeBand::Adult);
        assert!(AgeBand::Adult.ages(ADULT_AGE).contains(&Age(86)));
        assert!(!AgeBand::Adult.ages(ADULT_AGE).contains(&Age(16)));
        assert!(AgeBand::Child.ages(Age(18)).contains(&Age(18)));
    }

    #[test]
    fn test_communal_bands() {
        assert_eq!(CommunalBand::of(-1), None);
        assert_eq!(CommunalBand::of(2), Some(CommunalBand::ElderlyCare));
        assert_eq!(CommunalBand::of(14), Some(CommunalBand::ElderlyCare));
        assert_eq!(CommunalBand::of(22), Some(CommunalBand::YoungAdult));
        assert_eq!(CommunalBand::of(26), Some(CommunalBand::YoungAdult));
        assert_eq!(CommunalBand::of(27), Some(CommunalBand::GeneralAdult));
        assert!(!CommunalBand::ElderlyCare.ages(ADULT_AGE).contains(&Age(75)));
        assert!(CommunalBand::YoungAdult.ages(ADULT_AGE).contains(&Age(19)));
        assert!(!CommunalBand::YoungAdult.ages(ADULT_AGE).contains(&Age(26)));
    }

    #[test]
    fn test_eth_mapping() {
        let ew = EthMapping::england_wales();
        assert_eq!(ew.map(5).unwrap(), Eth::WhiteOther);
        assert_eq!(ew.map(16).unwrap(), Eth::Asian);
        assert_eq!(ew.map(-1).unwrap(), Eth::NotStated);
        assert!(ew.map(6).is_err());

        let sc = EthMapping::for_region("S12000046");
        assert_eq!(sc.map(1).unwrap(), Eth::WhiteBritish);
        assert_eq!(sc.map(22).unwrap(), Eth::Other);
        assert!(sc.map(2).is_err());
    }
}
