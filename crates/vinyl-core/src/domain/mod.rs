pub mod errors;

pub use errors::{VinylError, VinylErrorKind, VinylResult};

use std::fmt::{Display, Formatter};

/// Outcome reported by a concrete calculator's `backengine` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackengineStatus {
    Success,
    Failure,
}

impl BackengineStatus {
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl Display for BackengineStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
