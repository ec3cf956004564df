use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use csv::Writer;
use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use typed_index_collections::TiVec;

use crate::{
    codes::{AgeBand, EthMapping, HouseholdSize, HouseholdType},
    config::Config,
    digest,
    error::AssignmentError,
    household::{Household, HID},
    lookup::AreaLookup,
    person::{Person, PersonRecord, Profile, PID},
    pool::{HouseholdQuery, PersonQuery, Predicate},
    queues::{Match, Queues},
    read_csv,
    report::{Report, Shortfall, Stage},
    sampler::{Distributions, HrpCategory},
    store::Store,
    Age, MSOA, OA,
};

/// An MSOA with the OAs it contains.
#[derive(Clone, Debug)]
pub struct Area {
    pub msoa: MSOA,
    pub oas: BTreeSet<OA>,
}

#[derive(Clone, Copy, Debug)]
enum Parent {
    Single,
    Couple,
}

#[derive(Debug)]
pub struct Assignment {
    pub region: String,
    pub config: Config,
    pub store: Store,
    pub lookup: AreaLookup,
    pub dists: Distributions,
    pub queues: Queues,
    pub strict: bool,
    pub adult_age: Age,
    pub shortfalls: Vec<Shortfall>,
    pub rng: StdRng,
}

fn write_csv<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> anyhow::Result<()> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl Assignment {
    pub fn new(region: &str, rng_seed: u64, config: &Config) -> anyhow::Result<Assignment> {
        let eth_mapping = EthMapping::for_region(region);
        let records: TiVec<PID, PersonRecord> = read_csv(config.person_file(region))?;
        let p_data = records
            .into_iter()
            .map(|record| Person::from_record(record, &eth_mapping))
            .collect::<Result<TiVec<PID, Person>, _>>()?;
        let h_data: TiVec<HID, Household> = read_csv(config.household_file(region))?;
        let lookup = AreaLookup::read(config.geog_lookup_file())?;
        let dists = Distributions::read(&config.persistent_data())?;
        info!(
            "Loaded {} people, {} households and {} OAs for {}",
            p_data.len(),
            h_data.len(),
            lookup.len(),
            region
        );
        let store = Store::new(p_data, h_data)?;
        Ok(Self::from_parts(region, config, store, lookup, dists, rng_seed))
    }

    /// Assembles an assignment from tables already in memory.
    pub fn from_parts(
        region: &str,
        config: &Config,
        store: Store,
        lookup: AreaLookup,
        dists: Distributions,
        rng_seed: u64,
    ) -> Assignment {
        if config.strict {
            info!("Strict mode: any shortfall aborts the run");
        } else {
            info!("Relaxed mode: shortfalls are logged and recorded");
        }
        let queues = Queues::new(&store, config.adult_age);
        Self {
            region: region.to_owned(),
            config: config.clone(),
            store,
            lookup,
            dists,
            queues,
            strict: config.strict,
            adult_age: config.adult_age,
            shortfalls: vec![],
            rng: StdRng::seed_from_u64(rng_seed),
        }
    }

    /// Generate digest for people and households.
    pub fn digest(&self) -> anyhow::Result<String> {
        digest((
            self.store.p_data.iter().collect::<Vec<_>>(),
            self.store.h_data.iter().collect::<Vec<_>>(),
        ))
    }

    pub fn area(&self, msoa: &MSOA) -> Area {
        Area {
            msoa: msoa.clone(),
            oas: self.lookup.oas(msoa),
        }
    }

    fn shortfall(
        &mut self,
        stage: Stage,
        area: &Area,
        detail: String,
    ) -> Result<(), AssignmentError> {
        if self.strict {
            return Err(AssignmentError::Shortfall {
                stage,
                msoa: area.msoa.clone(),
                detail,
            });
        }
        warn!("{} shortfall in {}: {}", stage, area.msoa, detail);
        self.shortfalls.push(Shortfall {
            stage,
            msoa: area.msoa.clone(),
            detail,
        });
        Ok(())
    }

    fn claim(
        &mut self,
        area: &Area,
        profile: &Profile,
        band: AgeBand,
        hid: HID,
    ) -> Result<Option<Match>, AssignmentError> {
        self.queues
            .claim(&mut self.store, &area.msoa, profile, band, hid)
    }

    fn reference_person(&self, hid: HID) -> Result<Profile, AssignmentError> {
        let pid = self
            .store
            .h_data
            .get(hid)
            .ok_or(AssignmentError::UnknownHousehold(hid))?
            .hrpid
            .ok_or(AssignmentError::NoReferencePerson(hid))?;
        Ok(self
            .store
            .p_data
            .get(pid)
            .ok_or(AssignmentError::UnknownPerson(pid))?
            .profile())
    }

    fn fill_communal(&mut self, area: &Area) -> Result<(), AssignmentError> {
        let hids = HouseholdQuery::default()
            .communal(true)
            .unfilled()
            .select(&self.store, &area.oas);
        for hid in hids {
            let household = &self.store.h_data[hid];
            let Some(band) = household.communal_band() else {
                continue;
            };
            let nocc = household.communal_occupancy();
            if nocc > 0 {
                let pool = PersonQuery::unassigned()
                    .ages(band.ages(self.adult_age))
                    .select(&self.store, &area.msoa);
                let pids: Vec<PID> = pool
                    .choose_multiple(&mut self.rng, nocc)
                    .copied()
                    .collect();
                for &pid in pids.iter() {
                    self.store.assign(pid, hid)?;
                }
                if pids.len() < nocc {
                    self.shortfall(
                        Stage::Communal,
                        area,
                        format!(
                            "cannot fill {hid} ({band}): {} of {nocc} occupants available",
                            pids.len()
                        ),
                    )?;
                }
            }
            self.store.mark_filled(hid);
        }
        Ok(())
    }

    fn sample_hrp(&mut self, area: &Area) -> Result<(), AssignmentError> {
        for category in HrpCategory::ALL {
            let hids = HouseholdQuery::occupied()
                .htypes(category.household_types())
                .without_hrp()
                .select(&self.store, &area.oas);
            if hids.is_empty() {
                continue;
            }

            let Some(sample) = self
                .dists
                .sample_hrps(category, hids.len(), &mut self.rng)
            else {
                self.shortfall(
                    Stage::Hrp,
                    area,
                    format!(
                        "empty {category} HRP distribution for {} households",
                        hids.len()
                    ),
                )?;
                continue;
            };

            for (profile, hid) in sample.into_iter().zip(hids) {
                let band = AgeBand::of(profile.age, self.adult_age);
                if band == AgeBand::Child {
                    warn!("HRP is child: {profile}");
                }
                match self.claim(area, &profile, band, hid)? {
                    Some(matched) => {
                        self.store.set_hrp(hid, matched.pid)?;
                        if self.store.h_data[hid].htype == HouseholdType::SingleOccupant {
                            self.store.mark_filled(hid);
                        }
                    }
                    None => self.shortfall(
                        Stage::Hrp,
                        area,
                        format!("no match for HRP of {hid}: {profile}"),
                    )?,
                }
            }
        }
        Ok(())
    }

    /// Every occupied household of the area must have an HRP once HRPs are sampled.
    fn check_hrp(&self, area: &Area) -> Result<(), AssignmentError> {
        let missing = HouseholdQuery::occupied()
            .without_hrp()
            .select(&self.store, &area.oas);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AssignmentError::MissingHrp {
                area: area.msoa.to_string(),
                count: missing.len(),
            })
        }
    }

    fn sample_partner(&mut self, area: &Area) -> Result<(), AssignmentError> {
        let hids = HouseholdQuery::occupied()
            .htypes(&HouseholdType::COUPLES)
            .unfilled()
            .select(&self.store, &area.oas);
        for hid in hids {
            let hrp = self.reference_person(hid)?;
            let sampled = self
                .dists
                .partner
                .sample(&hrp, &mut self.rng)
                .map(|(partner, conditioning)| (partner.profile(hrp.sex), conditioning));
            let Some((profile, conditioning)) = sampled else {
                self.shortfall(
                    Stage::Partner,
                    area,
                    format!("Partner-HRP not sampled for {hid}: {hrp}"),
                )?;
                continue;
            };
            debug!("Partner for {hid} drawn on {conditioning}: {profile}");
            match self.claim(area, &profile, AgeBand::Adult, hid)? {
                Some(_) => {
                    if self.store.h_data[hid].size == HouseholdSize::Two {
                        self.store.mark_filled(hid);
                    }
                }
                None => self.shortfall(
                    Stage::Partner,
                    area,
                    format!("no partner match for {hid}: {profile} (drawn on {conditioning})"),
                )?,
            }
        }
        Ok(())
    }

    fn sample_child(
        &mut self,
        area: &Area,
        size: HouseholdSize,
        mark_filled: bool,
        parent: Parent,
    ) -> Result<(), AssignmentError> {
        let (htypes, stage) = match parent {
            Parent::Single => (&[HouseholdType::LoneParent][..], Stage::SingleParentChild),
            Parent::Couple => (&HouseholdType::COUPLES[..], Stage::CoupleChild),
        };
        let hids = HouseholdQuery::occupied()
            .htypes(htypes)
            .size(Predicate::Eq(size))
            .unfilled()
            .select(&self.store, &area.oas);
        for hid in hids {
            let hrp = self.reference_person(hid)?;
            let sampled = self
                .dists
                .child
                .sample(&hrp, &mut self.rng)
                .map(|(child, conditioning)| (child.profile(), conditioning));
            let Some((profile, conditioning)) = sampled else {
                self.shortfall(
                    stage,
                    area,
                    format!("Child-HRP not sampled for {hid}: {hrp}"),
                )?;
                continue;
            };
            debug!("Child for {hid} drawn on {conditioning}: {profile}");
            match self.claim(area, &profile, AgeBand::Child, hid)? {
                Some(_) => {
                    if mark_filled {
                        self.store.mark_filled(hid);
                    }
                }
                None => self.shortfall(
                    stage,
                    area,
                    format!("child not found for {hid}: {profile} (drawn on {conditioning})"),
                )?,
            }
        }
        Ok(())
    }

    /// One more adult for every unfilled multi-person household of size `nocc` or more.
    fn fill_multi(
        &mut self,
        area: &Area,
        nocc: HouseholdSize,
        mark_filled: bool,
    ) -> Result<(), AssignmentError> {
        let hids = HouseholdQuery::occupied()
            .htype(HouseholdType::MultiPerson)
            .size(Predicate::Range(nocc..=HouseholdSize::FourOrMore))
            .unfilled()
            .select(&self.store, &area.oas);
        if hids.is_empty() {
            return Ok(());
        }
        let adults = PersonQuery::unassigned()
            .ages(AgeBand::Adult.ages(self.adult_age))
            .select(&self.store, &area.msoa);
        let pids: Vec<PID> = adults
            .choose_multiple(&mut self.rng, hids.len())
            .copied()
            .collect();
        for (&pid, &hid) in pids.iter().zip(hids.iter()) {
            self.store.assign(pid, hid)?;
            // Filled once the declared size is reached
            if mark_filled && self.store.h_data[hid].size == nocc {
                self.store.mark_filled(hid);
            }
        }
        if pids.len() < hids.len() {
            self.shortfall(
                Stage::MultiPerson,
                area,
                format!(
                    "out of multi-people, need {} households for {}",
                    hids.len(),
                    pids.len()
                ),
            )?;
        }
        Ok(())
    }

    /// Places every person matching `people` in a household drawn uniformly, with
    /// replacement, from `households`.
    fn assign_surplus(
        &mut self,
        area: &Area,
        stage: Stage,
        people: PersonQuery,
        households: HouseholdQuery,
    ) -> Result<(), AssignmentError> {
        let pids = people.select(&self.store, &area.msoa);
        if pids.is_empty() {
            return Ok(());
        }
        let hids = households.select(&self.store, &area.oas);
        if hids.is_empty() {
            return self.shortfall(
                stage,
                area,
                format!("no candidate household for {} people", pids.len()),
            );
        }
        for pid in pids {
            if let Some(&hid) = hids.choose(&mut self.rng) {
                self.store.assign(pid, hid)?;
            }
        }
        Ok(())
    }

    fn assign_surplus_adults(&mut self, area: &Area) -> Result<(), AssignmentError> {
        self.assign_surplus(
            area,
            Stage::SurplusAdults,
            PersonQuery::unassigned().ages(AgeBand::Adult.ages(self.adult_age)),
            HouseholdQuery::occupied()
                .htype(HouseholdType::MultiPerson)
                .unfilled(),
        )
    }

    fn assign_surplus_children(&mut self, area: &Area) -> Result<(), AssignmentError> {
        self.assign_surplus(
            area,
            Stage::SurplusChildren,
            PersonQuery::unassigned().ages(AgeBand::Child.ages(self.adult_age)),
            HouseholdQuery::occupied()
                .htypes(&HouseholdType::WITH_CHILDREN)
                .unfilled(),
        )
    }

    /// Runs every stage, in order, over a single area.
    pub fn run_area(&mut self, area: &Area) -> Result<(), AssignmentError> {
        info!(">>> MSOA: {}", area.msoa);
        info!(
            ">>> OAs : {}",
            area.oas
                .iter()
                .map(|oa| oa.0.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        info!(">>> Assigning people to communal establishments");
        self.fill_communal(area)?;
        self.store.info_stats();

        info!(">>> Assigning HRPs");
        self.sample_hrp(area)?;
        self.check_hrp(area)?;
        self.store.info_stats();

        info!(">>> Assigning partners to HRPs where appropriate");
        self.sample_partner(area)?;
        self.store.info_stats();

        info!(">>> Assigning child 1 to single-parent households");
        self.sample_child(area, HouseholdSize::Two, true, Parent::Single)?;
        self.store.info_stats();

        info!(">>> Assigning child 2 to single-parent households");
        self.sample_child(area, HouseholdSize::Three, true, Parent::Single)?;
        self.store.info_stats();

        info!(">>> Assigning child 3 to single-parent households");
        self.sample_child(area, HouseholdSize::FourOrMore, false, Parent::Single)?;
        self.store.info_stats();

        info!(">>> Assigning child 1 to couple households");
        self.sample_child(area, HouseholdSize::Three, true, Parent::Couple)?;
        self.store.info_stats();

        info!(">>> Assigning child 2 to couple households");
        self.sample_child(area, HouseholdSize::FourOrMore, false, Parent::Couple)?;
        self.store.info_stats();

        info!(">>> Multi-person households");
        self.fill_multi(area, HouseholdSize::Two, true)?;
        self.fill_multi(area, HouseholdSize::Three, true)?;
        self.fill_multi(area, HouseholdSize::FourOrMore, false)?;
        self.store.info_stats();

        info!(">>> Assigning surplus adults");
        self.assign_surplus_adults(area)?;
        self.store.info_stats();

        info!(">>> Assigning surplus children");
        self.assign_surplus_children(area)?;
        self.store.info_stats();
        Ok(())
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        // Deterministic ordering
        let msoas: Vec<MSOA> = self.store.msoas().cloned().collect();
        for msoa in msoas.iter() {
            let area = self.area(msoa);
            if area.oas.is_empty() {
                warn!("No OAs for {msoa} in the area lookup");
            }
            self.run_area(&area)?;
        }
        // Households outside every visited area
        let missing = HouseholdQuery::occupied()
            .without_hrp()
            .select_all(&self.store);
        if !missing.is_empty() {
            warn!(
                "{} occupied households not reached by any MSOA with persons, first {}",
                missing.len(),
                missing[0]
            );
            return Err(AssignmentError::MissingHrp {
                area: self.region.clone(),
                count: missing.len(),
            }
            .into());
        }
        if !self.shortfalls.is_empty() {
            warn!(
                "{} shortfalls recorded for {}",
                self.shortfalls.len(),
                self.region
            );
        }
        Ok(())
    }

    pub fn check(&self) -> Report {
        let report = Report::new(&self.store, &self.shortfalls, self.adult_age);
        report.log();
        report
    }

    /// Writes the assigned person and household tables, returning their paths.
    pub fn write(&self) -> anyhow::Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(self.config.output_dir())?;
        let p_path = self.config.assigned_person_file(&self.region);
        write_csv(&p_path, self.store.p_data.iter())?;
        let h_path = self.config.assigned_household_file(&self.region);
        write_csv(&h_path, self.store.h_data.iter())?;
        info!("Written {} and {}", p_path.display(), h_path.display());
        Ok((p_path, h_path))
    }
}
