//! Weighted draws of demographic profiles from the empirical role distributions.

use std::{collections::BTreeMap, fmt, hash::Hash, path::Path};

use hashbrown::HashMap;
use log::warn;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use typed_index_collections::TiVec;

use crate::{
    codes::{Eth, HouseholdType},
    person::{ChildHRPerson, HRPerson, PartnerHRPerson, Profile, HRPID},
    read_csv, Age,
};

/// A distribution row carrying an observation count.
pub trait Weighted {
    fn weight(&self) -> usize;
}

/// A distribution row conditioned on the household reference person.
pub trait ConditionedOnHrp: Weighted {
    fn hrp_age(&self) -> Age;
    fn hrp_eth(&self) -> Eth;
}

impl Weighted for HRPerson {
    fn weight(&self) -> usize {
        self.n
    }
}

impl Weighted for PartnerHRPerson {
    fn weight(&self) -> usize {
        self.n
    }
}

impl ConditionedOnHrp for PartnerHRPerson {
    fn hrp_age(&self) -> Age {
        self.agehrp
    }

    fn hrp_eth(&self) -> Eth {
        self.eth
    }
}

impl Weighted for ChildHRPerson {
    fn weight(&self) -> usize {
        self.n
    }
}

impl ConditionedOnHrp for ChildHRPerson {
    fn hrp_age(&self) -> Age {
        self.agehrp
    }

    fn hrp_eth(&self) -> Eth {
        self.eth
    }
}

/// Rows sharing a conditioning key, sampled proportionally to their weights.
#[derive(Clone, Debug)]
pub struct Bucket {
    ids: Vec<HRPID>,
    index: WeightedIndex<usize>,
}

impl Bucket {
    /// `None` when there are no entries or all weights are zero.
    pub fn new(entries: Vec<(HRPID, usize)>) -> Option<Self> {
        let (ids, weights): (Vec<HRPID>, Vec<usize>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(weights).ok()?;
        Some(Self { ids, index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HRPID {
        self.ids[self.index.sample(rng)]
    }

    /// `n` draws with replacement.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<HRPID> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// Buckets by conditioning key. Entries keep table order within a bucket.
#[derive(Clone, Debug)]
pub struct Conditional<K> {
    buckets: HashMap<K, Bucket>,
}

impl<K: Eq + Hash> Conditional<K> {
    pub fn build<T: Weighted>(rows: &TiVec<HRPID, T>, key: impl Fn(&T) -> K) -> Self {
        let mut entries: HashMap<K, Vec<(HRPID, usize)>> = HashMap::new();
        for (hrpid, row) in rows.iter_enumerated() {
            entries
                .entry(key(row))
                .or_default()
                .push((hrpid, row.weight()));
        }
        let buckets = entries
            .into_iter()
            .filter_map(|(key, entries)| Some((key, Bucket::new(entries)?)))
            .collect();
        Self { buckets }
    }

    pub fn get(&self, key: &K) -> Option<&Bucket> {
        self.buckets.get(key)
    }
}

/// Conditioning key a draw was made under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conditioning {
    AgeEth,
    Age,
}

impl fmt::Display for Conditioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conditioning::AgeEth => write!(f, "age and ethnicity"),
            Conditioning::Age => write!(f, "age"),
        }
    }
}

/// Partner or child rows keyed on the reference person's age and ethnicity, relaxing
/// to age alone when the joint bucket is empty.
#[derive(Clone, Debug)]
pub struct RoleDistribution<T> {
    role: &'static str,
    rows: TiVec<HRPID, T>,
    by_age_eth: Conditional<(Age, Eth)>,
    by_age: Conditional<Age>,
}

impl<T: ConditionedOnHrp> RoleDistribution<T> {
    pub fn new(role: &'static str, rows: TiVec<HRPID, T>) -> Self {
        let by_age_eth = Conditional::build(&rows, |row| (row.hrp_age(), row.hrp_eth()));
        let by_age = Conditional::build(&rows, |row| row.hrp_age());
        Self {
            role,
            rows,
            by_age_eth,
            by_age,
        }
    }

    /// One draw conditioned on `hrp`, `None` when no bucket matches even after relaxing.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        hrp: &Profile,
        rng: &mut R,
    ) -> Option<(&T, Conditioning)> {
        let (bucket, conditioning) = match self.by_age_eth.get(&(hrp.age, hrp.eth)) {
            Some(bucket) => (bucket, Conditioning::AgeEth),
            None => {
                warn!(
                    "{}-HRP not sampled: {} - resample without eth",
                    self.role, hrp
                );
                (self.by_age.get(&hrp.age)?, Conditioning::Age)
            }
        };
        Some((&self.rows[bucket.sample(rng)], conditioning))
    }
}

/// Household categories with their own HRP distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HrpCategory {
    Single,
    Couple,
    SingleParent,
    Mixed,
}

impl HrpCategory {
    pub const ALL: [HrpCategory; 4] = [
        HrpCategory::Single,
        HrpCategory::Couple,
        HrpCategory::SingleParent,
        HrpCategory::Mixed,
    ];

    pub fn household_types(self) -> &'static [HouseholdType] {
        match self {
            HrpCategory::Single => &[HouseholdType::SingleOccupant],
            HrpCategory::Couple => &HouseholdType::COUPLES,
            HrpCategory::SingleParent => &[HouseholdType::LoneParent],
            HrpCategory::Mixed => &[HouseholdType::MultiPerson],
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            HrpCategory::Single => "hrp_sgl_dist.csv",
            HrpCategory::Couple => "hrp_cpl_dist.csv",
            HrpCategory::SingleParent => "hrp_sp_dist.csv",
            HrpCategory::Mixed => "hrp_dist.csv",
        }
    }
}

impl fmt::Display for HrpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HrpCategory::Single => write!(f, "sgl"),
            HrpCategory::Couple => write!(f, "cpl"),
            HrpCategory::SingleParent => write!(f, "sp"),
            HrpCategory::Mixed => write!(f, "mix"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HrpDistribution {
    rows: TiVec<HRPID, HRPerson>,
    bucket: Option<Bucket>,
}

impl HrpDistribution {
    pub fn new(rows: TiVec<HRPID, HRPerson>) -> Self {
        let bucket = Bucket::new(
            rows.iter_enumerated()
                .map(|(hrpid, row)| (hrpid, row.weight()))
                .collect(),
        );
        Self { rows, bucket }
    }
}

#[derive(Clone, Debug)]
pub struct Distributions {
    hrp: BTreeMap<HrpCategory, HrpDistribution>,
    pub partner: RoleDistribution<PartnerHRPerson>,
    pub child: RoleDistribution<ChildHRPerson>,
}

impl Distributions {
    /// Categories missing from `hrp` get an empty distribution.
    pub fn new(
        mut hrp: BTreeMap<HrpCategory, TiVec<HRPID, HRPerson>>,
        partners: TiVec<HRPID, PartnerHRPerson>,
        children: TiVec<HRPID, ChildHRPerson>,
    ) -> Self {
        let hrp = HrpCategory::ALL
            .into_iter()
            .map(|category| {
                let rows = hrp.remove(&category).unwrap_or_default();
                (category, HrpDistribution::new(rows))
            })
            .collect();
        Self {
            hrp,
            partner: RoleDistribution::new("Partner", partners),
            child: RoleDistribution::new("Child", children),
        }
    }

    /// Reads the six distribution tables from `dir`.
    pub fn read(dir: &Path) -> anyhow::Result<Self> {
        let hrp = HrpCategory::ALL
            .into_iter()
            .map(|category| Ok((category, read_csv(dir.join(category.file_name()))?)))
            .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
        let partners = read_csv(dir.join("partner_hrp_dist.csv"))?;
        let children = read_csv(dir.join("child_hrp_dist.csv"))?;
        Ok(Self::new(hrp, partners, children))
    }

    /// `n` HRP profiles for `category`, drawn with replacement. `None` when the
    /// distribution has no positive weight.
    pub fn sample_hrps<R: Rng + ?Sized>(
        &self,
        category: HrpCategory,
        n: usize,
        rng: &mut R,
    ) -> Option<Vec<Profile>> {
        let dist = self.hrp.get(&category)?;
        let bucket = dist.bucket.as_ref()?;
        Some(
            bucket
                .sample_n(n, rng)
                .into_iter()
                .map(|hrpid| dist.rows[hrpid].profile())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        codes::Sex,
        test_utils::{child, distributions, hrp, partner},
    };

    fn profile(age: u32, sex: Sex, eth: Eth) -> Profile {
        Profile {
            age: Age(age),
            sex,
            eth,
        }
    }

    #[test]
    fn test_empty_buckets() {
        assert!(Bucket::new(vec![]).is_none());
        assert!(Bucket::new(vec![(HRPID(0), 0), (HRPID(1), 0)]).is_none());
        assert!(Bucket::new(vec![(HRPID(0), 0), (HRPID(1), 3)]).is_some());
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let bucket = Bucket::new(vec![(HRPID(0), 0), (HRPID(1), 3), (HRPID(2), 0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(bucket.sample_n(100, &mut rng).iter().all(|&id| id == HRPID(1)));
    }

    #[test]
    fn test_partner_relaxation() {
        let dist = RoleDistribution::new(
            "Partner",
            TiVec::from(vec![
                partner(40, Eth::WhiteBritish, 38, false, Eth::WhiteBritish, 5),
                partner(50, Eth::Asian, 47, false, Eth::Asian, 5),
                partner(60, Eth::Black, 58, false, Eth::Black, 0),
            ]),
        );
        let mut rng = StdRng::seed_from_u64(0);

        let (row, conditioning) = dist
            .sample(&profile(40, Sex::Male, Eth::WhiteBritish), &mut rng)
            .unwrap();
        assert_eq!(row.age, Age(38));
        assert_eq!(conditioning, Conditioning::AgeEth);

        let (row, conditioning) = dist
            .sample(&profile(50, Sex::Female, Eth::WhiteBritish), &mut rng)
            .unwrap();
        assert_eq!(row.age, Age(47));
        assert_eq!(conditioning, Conditioning::Age);

        // Zero total weight forms no bucket at either level.
        assert!(dist
            .sample(&profile(60, Sex::Male, Eth::Black), &mut rng)
            .is_none());
        assert!(dist
            .sample(&profile(70, Sex::Male, Eth::WhiteBritish), &mut rng)
            .is_none());
    }

    #[test]
    fn test_child_conditioned_on_hrp() {
        let dist = RoleDistribution::new(
            "Child",
            TiVec::from(vec![
                child(30, Eth::WhiteBritish, 5, Sex::Male, Eth::WhiteBritish, 2),
                child(30, Eth::Mixed, 3, Sex::Female, Eth::Mixed, 2),
            ]),
        );
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let (row, _) = dist
                .sample(&profile(30, Sex::Female, Eth::Mixed), &mut rng)
                .unwrap();
            assert_eq!(row.profile(), profile(3, Sex::Female, Eth::Mixed));
        }
    }

    #[test]
    fn test_sample_hrps() {
        let dists = distributions(
            hrp(40, Sex::Male, Eth::WhiteBritish, 1),
            hrp(35, Sex::Female, Eth::Asian, 1),
            hrp(30, Sex::Female, Eth::WhiteBritish, 0),
            hrp(50, Sex::Male, Eth::WhiteBritish, 1),
            vec![],
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(0);
        let sample = dists.sample_hrps(HrpCategory::Couple, 3, &mut rng).unwrap();
        assert_eq!(sample, vec![profile(35, Sex::Female, Eth::Asian); 3]);
        assert!(dists
            .sample_hrps(HrpCategory::SingleParent, 1, &mut rng)
            .is_none());
        assert!(dists
            .sample_hrps(HrpCategory::Mixed, 1, &mut rng)
            .is_some());
    }

    #[test]
    fn test_same_seed_same_draws() {
        let bucket = Bucket::new((0..10).map(|i| (HRPID(i), i + 1)).collect()).unwrap();
        let a = bucket.sample_n(50, &mut StdRng::seed_from_u64(12345));
        let b = bucket.sample_n(50, &mut StdRng::seed_from_u64(12345));
        assert_eq!(a, b);
    }

    #[test]
    fn test_category_household_types() {
        assert_eq!(
            HrpCategory::Couple.household_types(),
            &[HouseholdType::MarriedCouple, HouseholdType::CohabitingCouple]
        );
        assert_eq!(HrpCategory::Mixed.file_name(), "hrp_dist.csv");
        assert_eq!(HrpCategory::SingleParent.to_string(), "sp");
    }
}
