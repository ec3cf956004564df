//! Static OA -> MSOA geography lookup.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use hashbrown::HashMap;
use polars::prelude::*;

use crate::{error::AssignmentError, MSOA, OA};

#[derive(Clone, Debug, Default)]
pub struct AreaLookup {
    oas_by_msoa: BTreeMap<MSOA, BTreeSet<OA>>,
    msoa_by_oa: HashMap<OA, MSOA>,
}

fn read_geog_lookup(path: &Path) -> anyhow::Result<DataFrame> {
    let mut df = CsvReader::from_path(path)?.finish()?;
    df.rename("OA", "oa")?.rename("MSOA", "msoa")?;
    Ok(df)
}

impl AreaLookup {
    /// Reads a lookup with `OA` and `MSOA` columns, plain or gzipped.
    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AssignmentError::MissingInput(path.to_owned()).into());
        }
        let df = read_geog_lookup(path)?;
        let oas = df.column("oa")?.str()?;
        let msoas = df.column("msoa")?.str()?;
        Ok(oas
            .into_iter()
            .zip(msoas)
            .filter_map(|(oa, msoa)| Some((OA::from(oa?), MSOA::from(msoa?))))
            .collect())
    }

    /// OAs within `msoa`, empty when the MSOA is not in the lookup.
    pub fn oas(&self, msoa: &MSOA) -> BTreeSet<OA> {
        self.oas_by_msoa.get(msoa).cloned().unwrap_or_default()
    }

    pub fn msoa_of(&self, oa: &OA) -> Option<&MSOA> {
        self.msoa_by_oa.get(oa)
    }

    pub fn len(&self) -> usize {
        self.msoa_by_oa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.msoa_by_oa.is_empty()
    }
}

impl FromIterator<(OA, MSOA)> for AreaLookup {
    fn from_iter<I: IntoIterator<Item = (OA, MSOA)>>(iter: I) -> Self {
        let mut lookup = AreaLookup::default();
        for (oa, msoa) in iter {
            lookup
                .oas_by_msoa
                .entry(msoa.clone())
                .or_default()
                .insert(oa.clone());
            lookup.msoa_by_oa.insert(oa, msoa);
        }
        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_geog_lookup() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gb_geog_lookup.csv");
        std::fs::write(
            &path,
            "OA,LSOA,MSOA,LAD\n\
             E00000001,E01000001,E02000001,E09000001\n\
             E00000002,E01000001,E02000001,E09000001\n\
             E00000003,E01000002,E02000002,E09000001\n",
        )?;
        let lookup = AreaLookup::read(&path)?;
        assert_eq!(lookup.len(), 3);
        assert_eq!(
            lookup.oas(&"E02000001".into()),
            BTreeSet::from([OA::from("E00000001"), OA::from("E00000002")])
        );
        assert_eq!(
            lookup.msoa_of(&"E00000003".into()),
            Some(&MSOA::from("E02000002"))
        );
        assert!(lookup.oas(&"E02999999".into()).is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_lookup() {
        let err = AreaLookup::read("no/such/lookup.csv").unwrap_err();
        assert!(err.downcast_ref::<AssignmentError>().is_some());
    }
}
