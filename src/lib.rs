//! Assignment of synthetic people (fine demographic detail at MSOA resolution) to
//! synthetic households (coarse detail at OA resolution).

use std::{fmt, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use typed_index_collections::TiVec;

/// Declares a `usize` row-index newtype usable as a `TiVec` key.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl From<$name> for usize {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", stringify!($name), self.0)
            }
        }
    };
}

pub mod assignment;
pub mod codes;
pub mod config;
pub mod error;
pub mod household;
pub mod lookup;
pub mod person;
pub mod pool;
pub mod queues;
pub mod report;
pub mod sampler;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use codes::{AgeBand, Eth, HouseholdSize, HouseholdType, Sex};
pub use error::AssignmentError;

/// Persons strictly older than this are treated as adults.
pub const ADULT_AGE: Age = Age(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Age(pub u32);

impl Age {
    pub const MIN: Age = Age(0);
    pub const MAX: Age = Age(u32::MAX);

    pub fn distance(self, other: Age) -> u32 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Middle layer super output area: the coarse geography of the person table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MSOA(pub String);

/// Output area: the fine geography of the household table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OA(pub String);

macro_rules! area_code {
    ($name:ident) => {
        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

area_code!(MSOA);
area_code!(OA);

/// Reads a headed CSV file into a typed table, one record per row.
pub fn read_csv<P: AsRef<Path>, K, V: DeserializeOwned>(path: P) -> anyhow::Result<TiVec<K, V>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AssignmentError::MissingInput(path.to_owned()).into());
    }
    Ok(csv::Reader::from_path(path)?
        .deserialize()
        .collect::<Result<TiVec<K, V>, _>>()?)
}

/// SHA-256 (hex) of the JSON serialization of `value`.
pub fn digest<T: Serialize>(value: T) -> anyhow::Result<String> {
    let bytes = serde_json::to_vec(&value)?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}
