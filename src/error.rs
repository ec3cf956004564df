use std::path::PathBuf;

use thiserror::Error;

use crate::{household::HID, person::PID, report::Stage, MSOA};

#[derive(Error, Debug)]
pub enum AssignmentError {
    #[error("Required input not found: {0}")]
    MissingInput(PathBuf),
    #[error("Invalid {category} code: {code}")]
    InvalidCode { category: &'static str, code: i32 },
    #[error("Row {row} of the {table} table has id {id}: ids must follow row order")]
    IdMismatch {
        table: &'static str,
        row: usize,
        id: usize,
    },
    #[error("Unknown person: {0}")]
    UnknownPerson(PID),
    #[error("Unknown household: {0}")]
    UnknownHousehold(HID),
    #[error("{pid} is already assigned to {hid}")]
    AlreadyAssigned { pid: PID, hid: HID },
    #[error("{hid} already has reference person {pid}")]
    HrpAlreadySet { hid: HID, pid: PID },
    #[error("{pid} cannot be reference person of {hid}: not an occupant")]
    NotAnOccupant { pid: PID, hid: HID },
    #[error("{0} has no reference person")]
    NoReferencePerson(HID),
    #[error("HRP assignment failure: {count} occupied households in {area} without a reference person")]
    MissingHrp { area: String, count: usize },
    #[error("Strict mode: shortfall in {stage} for {msoa}: {detail}")]
    Shortfall {
        stage: Stage,
        msoa: MSOA,
        detail: String,
    },
}
