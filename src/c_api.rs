//! C API of the crate.
//!
//! Functions return a [`Status`] instead of panicking across the FFI boundary. Keys cross
//! the boundary in their packed representation.

pub mod covering;
pub mod partition;

use crate::error::Error;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    NullPointer = 1,
    DepthDetermination = 2,
    BadCutArray = 3,
    InvalidKey = 4,
    InvalidInput = 5,
}

impl From<&Error> for Status {
    fn from(error: &Error) -> Self {
        match error {
            Error::DepthDetermination { .. } => Status::DepthDetermination,
            Error::BadCutArray(_) | Error::UnsortedCuts { .. } => Status::BadCutArray,
            _ => Status::InvalidInput,
        }
    }
}
